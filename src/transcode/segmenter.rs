//! ffmpeg segmenter invocation builder.
//!
//! Produces the ordered argument list for the external segmenting process.
//! The invocation forces one keyframe per segment boundary, strips source
//! metadata and chapters, normalizes the pixel format for broad playback
//! compatibility, and splits output through the segment muxer into
//! `<prefix>-<N>.ts` files plus a `<prefix>-out.m3u8` index.

use std::path::PathBuf;

/// Resolved encoder settings, with codec enums already mapped to the
/// identifier strings ffmpeg consumes.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub video_codec: &'static str,
    /// Video bitrate in kbps.
    pub video_bitrate: u32,
    pub video_profile: &'static str,
    pub preset: &'static str,
    pub audio_codec: &'static str,
    /// Audio bitrate in kbps.
    pub audio_bitrate: u32,
    pub audio_channels: u32,
    pub threads: u32,
}

/// A fully specified segmenter invocation.
#[derive(Debug, Clone)]
pub struct SegmenterInvocation {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Prefix for segment files and the segment index.
    pub file_prefix: String,
    /// Encode start position in seconds.
    pub start_time: f64,
    /// Total duration in seconds; 0 means unbounded and omits `-t`.
    pub duration: f64,
    /// Target segment length in seconds.
    pub segment_duration: f64,
    pub settings: EncoderSettings,
}

impl SegmenterInvocation {
    /// Path of the segment index the muxer maintains.
    pub fn segment_list_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}-out.m3u8", self.file_prefix))
    }

    /// Output pattern for the per-segment files.
    fn segment_pattern(&self) -> PathBuf {
        self.output_dir.join(format!("{}-%d.ts", self.file_prefix))
    }

    /// The ordered ffmpeg argument list.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-loglevel".into(),
            "error".into(),
            "-ss".into(),
            self.start_time.to_string(),
            "-i".into(),
            self.input.to_string_lossy().into_owned(),
        ];

        if self.duration > 0.0 {
            args.push("-t".into());
            args.push(self.duration.to_string());
        }

        args.extend([
            "-force_key_frames".into(),
            format!("expr:gte(t,n_forced*{})", self.segment_duration),
            "-codec:v".into(),
            self.settings.video_codec.into(),
            "-b:v".into(),
            format!("{}k", self.settings.video_bitrate),
            "-preset".into(),
            self.settings.preset.into(),
            "-profile:v".into(),
            self.settings.video_profile.into(),
            "-codec:a".into(),
            self.settings.audio_codec.into(),
            "-b:a".into(),
            format!("{}k", self.settings.audio_bitrate),
            "-ac".into(),
            self.settings.audio_channels.to_string(),
            "-threads".into(),
            self.settings.threads.to_string(),
            "-vsync".into(),
            "1".into(),
            "-map_metadata".into(),
            "-1".into(),
            "-map_chapters".into(),
            "-1".into(),
            "-bsf:v".into(),
            "h264_mp4toannexb".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            // stamp the start position into the .ts metadata
            "-initial_offset".into(),
            self.start_time.to_string(),
            "-f".into(),
            "segment".into(),
            "-segment_list_type".into(),
            "m3u8".into(),
            "-segment_list_size".into(),
            "0".into(),
            // resumed jobs keep globally consistent sequence numbering
            "-segment_start_number".into(),
            (self.start_time as u64).to_string(),
            "-segment_time".into(),
            self.segment_duration.to_string(),
            "-segment_time_delta".into(),
            "0.001".into(),
            "-segment_list".into(),
            self.segment_list_path().to_string_lossy().into_owned(),
            self.segment_pattern().to_string_lossy().into_owned(),
        ]);

        args
    }
}
