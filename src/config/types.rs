use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Maximum number of simultaneously active transcode tasks.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// Root directory for transcode output; each task writes into
    /// `<output_dir>/<folder_id>/`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Public URL prefix under which segment files are served.
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Encoder thread count passed to ffmpeg.
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Seconds to wait after a graceful termination signal before killing
    /// the segmenter.
    #[serde(default = "default_stop_grace")]
    pub stop_grace_secs: u64,
}

fn default_max_tasks() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./transcode")
}
fn default_public_path() -> String {
    "/transcode".to_string()
}
fn default_threads() -> u32 {
    1
}
fn default_stop_grace() -> u64 {
    5
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            max_tasks: default_max_tasks(),
            output_dir: default_output_dir(),
            public_path: default_public_path(),
            threads: default_threads(),
            stop_grace_secs: default_stop_grace(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Custom path to the ffmpeg binary (falls back to PATH lookup).
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Custom path to the ffprobe binary (falls back to PATH lookup).
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}
