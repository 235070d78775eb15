//! Unified error type for the streamforged application.
//!
//! All modules funnel their failures into [`Error`], which carries enough
//! context for API handlers to derive an HTTP status code via
//! [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in streamforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manager is already running its maximum number of tasks.
    #[error("transcode capacity reached ({limit} active tasks)")]
    CapacityExceeded {
        /// The configured concurrency ceiling.
        limit: usize,
    },

    /// A task with the same identity is already running.
    #[error("transcode job is already running: {task_id}")]
    DuplicateTask {
        /// The colliding task identity.
        task_id: String,
    },

    /// The requested codec has no encoder mapping.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file", "task").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external process (ffmpeg, ffprobe) could not be spawned or signalled.
    #[error("Process error [{tool}]: {message}")]
    Process {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::CapacityExceeded { .. } => 503,
            Error::DuplicateTask { .. } => 409,
            Error::UnsupportedCodec(_) => 422,
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Io { .. } => 500,
            Error::Process { .. } => 502,
            Error::Probe(_) => 422,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Process`].
    pub fn process(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Process {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::DuplicateTask`].
    pub fn duplicate(task_id: impl fmt::Display) -> Self {
        Error::DuplicateTask {
            task_id: task_id.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
