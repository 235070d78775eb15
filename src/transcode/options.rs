//! Transcoding options and codec enumerations.
//!
//! Codec, preset and profile values are closed enums with exhaustive
//! mappings to the identifier strings ffmpeg expects, so an unrecognized
//! value is a deserialization error rather than a string fallthrough.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Audio codecs accepted in transcode requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Ac3,
}

impl AudioCodec {
    /// The ffmpeg encoder identifier for this codec.
    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Ac3 => "ac3",
        }
    }
}

/// Video codecs accepted in transcode requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    X264,
    Hevc,
}

impl VideoCodec {
    /// The ffmpeg encoder identifier for this codec.
    ///
    /// HEVC is accepted in the request schema but has no encoder mapping
    /// yet, so requesting it is a configuration error caught before any
    /// subprocess is spawned.
    pub fn encoder(&self) -> Result<&'static str> {
        match self {
            VideoCodec::X264 => Ok("libx264"),
            VideoCodec::Hevc => Err(Error::UnsupportedCodec("hevc".into())),
        }
    }
}

/// x264 encoder speed/quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }
}

/// H.264 encode profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProfile {
    Baseline,
    Main,
    High10,
    High422,
    High444,
}

impl VideoProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoProfile::Baseline => "baseline",
            VideoProfile::Main => "main",
            VideoProfile::High10 => "high10",
            VideoProfile::High422 => "high422",
            VideoProfile::High444 => "high444",
        }
    }
}

/// Audio quality settings for a transcode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioOptions {
    pub codec: AudioCodec,
    /// Bitrate in kbps.
    pub bitrate: u32,
    pub channels: u32,
}

/// Video quality settings for a transcode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoOptions {
    pub codec: VideoCodec,
    /// Bitrate in kbps.
    pub bitrate: u32,
    pub profile: VideoProfile,
}

/// Immutable per-job transcoding parameters, supplied once at task creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodingOptions {
    pub audio: AudioOptions,
    pub video: VideoOptions,
    pub preset: Preset,
    /// Encode start position in seconds.
    pub start_time: f64,
    /// Total source duration in seconds.
    pub file_duration: f64,
    /// Target segment length in seconds.
    pub segment_duration: f64,
}

/// A fully resolved transcode job, ready for admission.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub file_path: PathBuf,
    pub output_directory: PathBuf,
    pub options: TranscodingOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x264_maps_to_libx264() {
        assert_eq!(VideoCodec::X264.encoder().unwrap(), "libx264");
    }

    #[test]
    fn hevc_has_no_encoder() {
        let err = VideoCodec::Hevc.encoder().unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(_)));
    }

    #[test]
    fn audio_codecs_map() {
        assert_eq!(AudioCodec::Aac.encoder(), "aac");
        assert_eq!(AudioCodec::Ac3.encoder(), "ac3");
    }

    #[test]
    fn enums_deserialize_from_request_strings() {
        let audio: AudioOptions =
            serde_json::from_str(r#"{"codec":"aac","bitrate":192,"channels":2}"#).unwrap();
        assert_eq!(audio.codec, AudioCodec::Aac);

        let video: VideoOptions =
            serde_json::from_str(r#"{"codec":"x264","bitrate":1000,"profile":"main"}"#).unwrap();
        assert_eq!(video.codec, VideoCodec::X264);
        assert_eq!(video.profile, VideoProfile::Main);

        let preset: Preset = serde_json::from_str(r#""ultrafast""#).unwrap();
        assert_eq!(preset, Preset::Ultrafast);
    }

    #[test]
    fn unknown_codec_is_rejected_at_deserialization() {
        let result: std::result::Result<VideoOptions, _> =
            serde_json::from_str(r#"{"codec":"av1","bitrate":1000,"profile":"main"}"#);
        assert!(result.is_err());
    }
}
