//! Deterministic, content-addressable task identities.
//!
//! Two requests for the same source file share a `folder_id` regardless of
//! quality settings, so their outputs land in the same directory; the
//! `prepend_file_id` distinguishes encode profiles within it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::transcode::options::{AudioOptions, VideoOptions};

/// Identity of a transcode job.
///
/// Compared and hashed by field values, which makes it usable directly as a
/// registry key: resubmitting the same file with the same quality options
/// resolves to an equal `TaskId` and is caught as a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    /// SHA-256 digest of the source file path.
    pub folder_id: String,
    /// SHA-256 digest of the audio+video quality options.
    pub prepend_file_id: String,
}

impl TaskId {
    /// Derive the identity for a source path and quality options.
    pub fn derive(file_path: &str, audio: &AudioOptions, video: &VideoOptions) -> Self {
        Self {
            folder_id: derive_folder_id(file_path),
            prepend_file_id: derive_prepend_id(audio, video),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.folder_id, self.prepend_file_id)
    }
}

/// Digest of the source file path as a UTF-8 string.
pub fn derive_folder_id(file_path: &str) -> String {
    sha256_hex(file_path.as_bytes())
}

/// Canonical serialization key for the quality options.
///
/// Field order is fixed by this struct, so identical options always produce
/// identical JSON bytes within and across process runs.
#[derive(Serialize)]
struct QualityKey<'a> {
    audio: &'a AudioOptions,
    video: &'a VideoOptions,
}

/// Digest of the canonical `{audio, video}` quality-option serialization.
pub fn derive_prepend_id(audio: &AudioOptions, video: &VideoOptions) -> String {
    let canonical = serde_json::to_vec(&QualityKey { audio, video })
        .expect("quality options serialize to JSON");
    sha256_hex(&canonical)
}

fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::options::{AudioCodec, VideoCodec, VideoProfile};

    fn audio() -> AudioOptions {
        AudioOptions {
            codec: AudioCodec::Aac,
            bitrate: 192,
            channels: 2,
        }
    }

    fn video() -> VideoOptions {
        VideoOptions {
            codec: VideoCodec::X264,
            bitrate: 1000,
            profile: VideoProfile::Main,
        }
    }

    #[test]
    fn folder_id_is_deterministic() {
        let a = derive_folder_id("/media/movie.mkv");
        let b = derive_folder_id("/media/movie.mkv");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn folder_id_differs_per_path() {
        assert_ne!(
            derive_folder_id("/media/movie.mkv"),
            derive_folder_id("/media/other.mkv")
        );
    }

    #[test]
    fn prepend_id_is_deterministic() {
        let a = derive_prepend_id(&audio(), &video());
        let b = derive_prepend_id(&audio(), &video());
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn prepend_id_changes_with_any_option_field() {
        let base = derive_prepend_id(&audio(), &video());

        let mut loud = audio();
        loud.bitrate = 320;
        assert_ne!(derive_prepend_id(&loud, &video()), base);

        let mut mono = audio();
        mono.channels = 1;
        assert_ne!(derive_prepend_id(&mono, &video()), base);

        let mut high = video();
        high.profile = VideoProfile::High10;
        assert_ne!(derive_prepend_id(&audio(), &high), base);

        let mut fat = video();
        fat.bitrate = 5000;
        assert_ne!(derive_prepend_id(&audio(), &fat), base);
    }

    #[test]
    fn task_id_equality_is_by_value() {
        let a = TaskId::derive("/media/movie.mkv", &audio(), &video());
        let b = TaskId::derive("/media/movie.mkv", &audio(), &video());
        assert_eq!(a, b);

        let mut map = std::collections::HashMap::new();
        map.insert(a, 1);
        assert!(map.contains_key(&b));
    }

    #[test]
    fn same_path_different_profile_shares_folder() {
        let a = TaskId::derive("/media/movie.mkv", &audio(), &video());
        let mut fat = video();
        fat.bitrate = 5000;
        let b = TaskId::derive("/media/movie.mkv", &audio(), &fat);

        assert_eq!(a.folder_id, b.folder_id);
        assert_ne!(a.prepend_file_id, b.prepend_file_id);
    }
}
