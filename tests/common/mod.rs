//! Shared fixtures: fake ffmpeg/ffprobe executables backed by shell scripts.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// ffmpeg stand-in that runs until terminated, honoring SIGTERM.
pub fn fake_ffmpeg(dir: &Path) -> PathBuf {
    write_script(dir, "ffmpeg", "trap 'exit 0' TERM\nwhile :; do sleep 0.1; done")
}

/// ffmpeg stand-in that ignores SIGTERM, forcing the kill escalation.
pub fn stubborn_ffmpeg(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg-stubborn",
        "trap '' TERM\nwhile :; do sleep 0.1; done",
    )
}

/// ffmpeg stand-in that exits immediately, simulating a segmenter that
/// terminates on its own.
pub fn oneshot_ffmpeg(dir: &Path) -> PathBuf {
    write_script(dir, "ffmpeg-oneshot", "exit 0")
}

/// ffmpeg stand-in that records its invocation before exiting.
pub fn recording_ffmpeg(dir: &Path, marker: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg-recording",
        &format!("touch '{}'\nexit 0", marker.display()),
    )
}

/// ffprobe stand-in reporting fixed container timing.
pub fn fake_ffprobe(dir: &Path, duration: f64, start_time: f64) -> PathBuf {
    write_script(
        dir,
        "ffprobe",
        &format!(
            "echo '{{\"format\":{{\"duration\":\"{duration}\",\"start_time\":\"{start_time}\"}}}}'"
        ),
    )
}
