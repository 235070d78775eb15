//! Source media inspection.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format` and maps
//! the JSON output into [`MediaTiming`]. Probing is a collaborator of the
//! transcode core, not part of it: the transport glue probes a source once
//! to resolve timing before admission, and the manager never probes.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Container timing reported by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MediaTiming {
    /// Total source duration in seconds.
    pub duration: f64,
    /// Container start offset in seconds.
    pub start_time: f64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

// ffprobe reports numeric fields as strings.
#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    start_time: Option<String>,
}

/// Probe a source file for its duration and start offset.
pub async fn probe_timing(ffprobe: &Path, file: &Path) -> Result<MediaTiming> {
    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(file)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::process("ffprobe", format!("failed to spawn: {e}")))?;

    if !output.status.success() {
        return Err(Error::process(
            "ffprobe",
            format!(
                "exited with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    let duration = parse_seconds(parsed.format.duration.as_deref())
        .ok_or_else(|| Error::Probe(format!("no duration reported for {}", file.display())))?;
    let start_time = parse_seconds(parsed.format.start_time.as_deref()).unwrap_or(0.0);

    Ok(MediaTiming {
        duration,
        start_time,
    })
}

fn parse_seconds(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse().ok()
}

/// Resolve the requested start position against the container start offset.
///
/// The requested position is shifted by the container offset; positions that
/// would land before the container start fall back to the container start.
pub fn resolve_start_time(requested: f64, container_start: f64) -> f64 {
    let adjusted = requested - container_start;
    if adjusted >= container_start {
        adjusted
    } else {
        container_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_format_json() {
        let raw = r#"{
            "format": {
                "filename": "/media/movie.mkv",
                "duration": "5400.123000",
                "start_time": "0.042000",
                "format_name": "matroska,webm"
            }
        }"#;
        let parsed: FfprobeOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parse_seconds(parsed.format.duration.as_deref()), Some(5400.123));
        assert_eq!(parse_seconds(parsed.format.start_time.as_deref()), Some(0.042));
    }

    #[test]
    fn missing_start_time_defaults_to_zero() {
        let raw = r#"{"format": {"duration": "10.0"}}"#;
        let parsed: FfprobeOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parse_seconds(parsed.format.start_time.as_deref()), None);
    }

    #[test]
    fn parse_seconds_rejects_garbage() {
        assert_eq!(parse_seconds(Some("N/A")), None);
        assert_eq!(parse_seconds(None), None);
        assert_eq!(parse_seconds(Some(" 12.5 ")), Some(12.5));
    }

    #[test]
    fn start_time_shifts_by_container_offset() {
        assert_eq!(resolve_start_time(120.0, 0.0), 120.0);
        assert_eq!(resolve_start_time(120.0, 0.5), 119.5);
    }

    #[test]
    fn start_time_clamps_to_container_start() {
        assert_eq!(resolve_start_time(0.0, 0.5), 0.5);
        assert_eq!(resolve_start_time(0.25, 0.5), 0.5);
    }
}
