//! A single transcode task and its process supervision.
//!
//! Lifecycle: Created → Starting → Running → Stopping → Stopped. `start`
//! sets up the output directory, writes the VOD playlist and spawns the
//! segmenter; a supervisor task then owns the child process until it exits
//! on its own or a stop request arrives. Termination is signalled on the
//! event bus exactly once per task.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::state::{EventBus, TranscoderEvent};
use crate::transcode::identity::TaskId;
use crate::transcode::options::TranscodingOptions;
use crate::transcode::playlist::build_vod_playlist;
use crate::transcode::segmenter::{EncoderSettings, SegmenterInvocation};

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Runtime settings shared by every task a manager creates.
#[derive(Debug, Clone)]
pub struct TaskSettings {
    /// Path to the ffmpeg binary.
    pub ffmpeg: PathBuf,
    /// Encoder thread count passed to ffmpeg.
    pub threads: u32,
    /// How long to wait after the graceful termination signal before killing.
    pub stop_grace: Duration,
    /// Public URL prefix under which segment files are served.
    pub public_path: String,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            threads: 1,
            stop_grace: Duration::from_secs(5),
            public_path: "/transcode".to_string(),
        }
    }
}

/// One transcode job's lifecycle, from directory setup to termination.
pub struct TranscodeTask {
    id: TaskId,
    file_path: PathBuf,
    output_root: PathBuf,
    options: TranscodingOptions,
    settings: TaskSettings,
    events: EventBus,
    state_tx: watch::Sender<TaskState>,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    terminated: AtomicBool,
}

impl TranscodeTask {
    pub fn new(
        id: TaskId,
        file_path: PathBuf,
        output_root: PathBuf,
        options: TranscodingOptions,
        settings: TaskSettings,
        events: EventBus,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(TaskState::Created);
        Arc::new(Self {
            id,
            file_path,
            output_root,
            options,
            settings,
            events,
            state_tx,
            stop_tx: Mutex::new(None),
            started_at: Mutex::new(None),
            terminated: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn state(&self) -> TaskState {
        *self.state_tx.borrow()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        *self.started_at.lock()
    }

    /// Set up the output directory, write the playlist, spawn the segmenter
    /// and hand the child to a supervisor. Returns the playlist path.
    ///
    /// Any failure transitions directly to Stopped and propagates; the task
    /// is never left half-started.
    pub async fn start(self: Arc<Self>) -> Result<PathBuf> {
        let mut claimed = false;
        self.state_tx.send_modify(|state| {
            if *state == TaskState::Created {
                *state = TaskState::Starting;
                claimed = true;
            }
        });
        if !claimed {
            return Err(Error::Internal(format!("task {} already started", self.id)));
        }

        // Codec resolution fails fast, before any side effect.
        let video_encoder = match self.options.video.codec.encoder() {
            Ok(encoder) => encoder,
            Err(e) => return Err(self.fail_start(e)),
        };

        let output_dir = self.output_root.join(&self.id.folder_id);
        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            return Err(self.fail_start(e.into()));
        }

        tracing::info!(
            task_id = %self.id,
            file = %self.file_path.display(),
            video_kbps = self.options.video.bitrate,
            audio_kbps = self.options.audio.bitrate,
            "starting transcode task"
        );

        let public_dir = format!("{}/{}", self.settings.public_path, self.id.folder_id);
        let playlist = build_vod_playlist(
            self.options.file_duration,
            self.options.segment_duration,
            &self.id.prepend_file_id,
            &public_dir,
        );
        let playlist_path = output_dir.join(format!("{}.m3u8", self.id.prepend_file_id));
        if let Err(e) = tokio::fs::write(&playlist_path, playlist).await {
            return Err(self.fail_start(e.into()));
        }

        let invocation = SegmenterInvocation {
            input: self.file_path.clone(),
            output_dir,
            file_prefix: self.id.prepend_file_id.clone(),
            start_time: self.options.start_time,
            duration: self.options.file_duration,
            segment_duration: self.options.segment_duration,
            settings: EncoderSettings {
                video_codec: video_encoder,
                video_bitrate: self.options.video.bitrate,
                video_profile: self.options.video.profile.as_str(),
                preset: self.options.preset.as_str(),
                audio_codec: self.options.audio.codec.encoder(),
                audio_bitrate: self.options.audio.bitrate,
                audio_channels: self.options.audio.channels,
                threads: self.settings.threads,
            },
        };

        let child = match Command::new(&self.settings.ffmpeg)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return Err(self.fail_start(Error::process(
                    "ffmpeg",
                    format!("failed to spawn: {e}"),
                )))
            }
        };

        let (stop_tx, stop_rx) = mpsc::channel(1);
        *self.stop_tx.lock() = Some(stop_tx);
        *self.started_at.lock() = Some(Utc::now());
        self.state_tx.send_replace(TaskState::Running);

        let task = Arc::clone(&self);
        tokio::spawn(async move { task.supervise(child, stop_rx).await });

        Ok(playlist_path)
    }

    /// Request termination and wait for it to complete.
    ///
    /// Sends the segmenter a graceful termination signal, escalating to a
    /// forced kill after the configured grace period. Idempotent: concurrent
    /// and repeated calls all resolve once the task reaches Stopped.
    pub async fn stop(&self) {
        let mut state_rx = self.state_tx.subscribe();
        loop {
            let state = *state_rx.borrow_and_update();
            match state {
                TaskState::Stopped => return,
                TaskState::Created => {
                    // Never started; there is no process to signal.
                    let mut claimed = false;
                    self.state_tx.send_modify(|state| {
                        if *state == TaskState::Created {
                            *state = TaskState::Stopped;
                            claimed = true;
                        }
                    });
                    if claimed {
                        self.emit_terminated();
                        return;
                    }
                    // Lost the race against start(); re-read the state.
                }
                TaskState::Starting => {
                    // start() is in flight; wait for it to settle.
                    if state_rx.changed().await.is_err() {
                        return;
                    }
                }
                TaskState::Running | TaskState::Stopping => {
                    if let Some(tx) = self.stop_tx.lock().clone() {
                        // Full or closed both mean a stop is already underway.
                        let _ = tx.try_send(());
                    }
                    loop {
                        if *state_rx.borrow_and_update() == TaskState::Stopped {
                            return;
                        }
                        if state_rx.changed().await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Own the child process until it exits or a stop request arrives.
    async fn supervise(self: Arc<Self>, mut child: Child, mut stop_rx: mpsc::Receiver<()>) {
        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => {
                    tracing::info!(task_id = %self.id, %status, "segmenter exited");
                }
                Err(e) => {
                    tracing::warn!(task_id = %self.id, error = %e, "failed to reap segmenter");
                }
            },
            _ = stop_rx.recv() => {
                self.state_tx.send_replace(TaskState::Stopping);
                self.terminate(&mut child).await;
            }
        }

        *self.stop_tx.lock() = None;
        self.state_tx.send_replace(TaskState::Stopped);
        self.emit_terminated();
    }

    /// Graceful termination signal, bounded wait, forced kill.
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    tracing::warn!(task_id = %self.id, error = %e, "failed to signal segmenter");
                }
            }
        }
        #[cfg(not(unix))]
        if let Err(e) = child.start_kill() {
            tracing::warn!(task_id = %self.id, error = %e, "failed to kill segmenter");
        }

        match tokio::time::timeout(self.settings.stop_grace, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(task_id = %self.id, %status, "segmenter terminated");
            }
            Ok(Err(e)) => {
                tracing::warn!(task_id = %self.id, error = %e, "failed waiting for segmenter");
            }
            Err(_) => {
                tracing::warn!(
                    task_id = %self.id,
                    grace = ?self.settings.stop_grace,
                    "segmenter ignored termination signal, killing"
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!(task_id = %self.id, error = %e, "failed to kill segmenter");
                }
            }
        }
    }

    /// Transition to Stopped after a start failure. No termination event is
    /// emitted: the manager rolls the registry entry back synchronously.
    fn fail_start(&self, error: Error) -> Error {
        self.state_tx.send_replace(TaskState::Stopped);
        error
    }

    fn emit_terminated(&self) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            self.events.emit(TranscoderEvent::TaskTerminated {
                task_id: self.id.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::options::{
        AudioCodec, AudioOptions, Preset, VideoCodec, VideoOptions, VideoProfile,
    };

    fn options(video_codec: VideoCodec) -> TranscodingOptions {
        TranscodingOptions {
            audio: AudioOptions {
                codec: AudioCodec::Aac,
                bitrate: 192,
                channels: 2,
            },
            video: VideoOptions {
                codec: video_codec,
                bitrate: 1000,
                profile: VideoProfile::Main,
            },
            preset: Preset::Ultrafast,
            start_time: 0.0,
            file_duration: 25.0,
            segment_duration: 10.0,
        }
    }

    fn task(
        output_root: &Path,
        video_codec: VideoCodec,
        settings: TaskSettings,
    ) -> Arc<TranscodeTask> {
        let opts = options(video_codec);
        let id = TaskId::derive("/media/movie.mkv", &opts.audio, &opts.video);
        TranscodeTask::new(
            id,
            PathBuf::from("/media/movie.mkv"),
            output_root.to_path_buf(),
            opts,
            settings,
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn unsupported_codec_fails_before_any_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let task = task(dir.path(), VideoCodec::Hevc, TaskSettings::default());
        let folder_id = task.id().folder_id.clone();

        let err = Arc::clone(&task).start().await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(_)));
        assert_eq!(task.state(), TaskState::Stopped);
        assert!(!dir.path().join(folder_id).exists());
    }

    #[tokio::test]
    async fn spawn_failure_transitions_to_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let settings = TaskSettings {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg-xyz-12345"),
            ..TaskSettings::default()
        };
        let task = task(dir.path(), VideoCodec::X264, settings);

        let err = Arc::clone(&task).start().await.unwrap_err();
        assert!(matches!(err, Error::Process { .. }));
        assert_eq!(task.state(), TaskState::Stopped);
    }

    #[tokio::test]
    async fn start_is_not_reentrant() {
        let dir = tempfile::tempdir().unwrap();
        let settings = TaskSettings {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg-xyz-12345"),
            ..TaskSettings::default()
        };
        let task = task(dir.path(), VideoCodec::X264, settings);

        let _ = Arc::clone(&task).start().await;
        let err = Arc::clone(&task).start().await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn stop_before_start_is_terminal_and_emits_once() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(VideoCodec::X264);
        let id = TaskId::derive("/media/movie.mkv", &opts.audio, &opts.video);
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let task = TranscodeTask::new(
            id,
            PathBuf::from("/media/movie.mkv"),
            dir.path().to_path_buf(),
            opts,
            TaskSettings::default(),
            bus,
        );

        task.stop().await;
        task.stop().await;
        assert_eq!(task.state(), TaskState::Stopped);

        assert!(matches!(
            events.try_recv().unwrap(),
            TranscoderEvent::TaskTerminated { .. }
        ));
        assert!(events.try_recv().is_err());
    }
}
