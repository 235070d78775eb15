//! Transcode job registry and task lifecycle engine.
//!
//! A job enters through [`TranscodeManager::add`], which performs admission
//! control (capacity ceiling, duplicate detection) and starts a
//! [`TranscodeTask`]. The task writes the VOD playlist, spawns the ffmpeg
//! segmenter and supervises it until termination, at which point the manager
//! reclaims the registry entry.

pub mod identity;
pub mod manager;
pub mod options;
pub mod playlist;
pub mod segmenter;
pub mod task;

pub use identity::TaskId;
pub use manager::{NewTask, TaskSummary, TranscodeManager};
pub use options::{
    AudioCodec, AudioOptions, Preset, TranscodeJob, TranscodingOptions, VideoCodec, VideoOptions,
    VideoProfile,
};
pub use task::{TaskSettings, TaskState, TranscodeTask};
