//! Registry of active transcode tasks with admission control.
//!
//! The registry map is the single source of truth for what is currently
//! running. Entries are created only through [`TranscodeManager::add`] and
//! removed only through [`TranscodeManager::remove`]; the capacity check,
//! duplicate check and insert in `add` run under one lock acquisition so
//! racing admissions cannot overshoot the concurrency ceiling.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::state::{EventBus, TranscoderEvent};
use crate::transcode::identity::TaskId;
use crate::transcode::options::TranscodeJob;
use crate::transcode::task::{TaskSettings, TaskState, TranscodeTask};

/// Result of a successful admission.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub task_id: TaskId,
    pub playlist_path: PathBuf,
}

/// Snapshot of an active task, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub file_path: PathBuf,
    pub state: TaskState,
    pub started_at: Option<DateTime<Utc>>,
}

/// Registry of active tasks; enforces the concurrency ceiling and
/// deduplication, and reclaims entries when tasks terminate.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct TranscodeManager {
    tasks: Arc<Mutex<HashMap<TaskId, Arc<TranscodeTask>>>>,
    max_tasks: usize,
    settings: TaskSettings,
    events: EventBus,
}

impl TranscodeManager {
    pub fn new(max_tasks: usize, settings: TaskSettings, events: EventBus) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            max_tasks,
            settings,
            events,
        }
    }

    /// Admit and start a transcode job.
    ///
    /// Rejects with [`Error::CapacityExceeded`] when the registry is full and
    /// [`Error::DuplicateTask`] when a value-equal task is already active;
    /// rejections do not mutate the registry. On admission the task is
    /// inserted, a task-added event is emitted and the task is started. A
    /// start failure rolls the entry back and propagates the error.
    pub async fn add(&self, job: TranscodeJob) -> Result<NewTask> {
        let task_id = TaskId::derive(
            job.file_path.to_string_lossy().as_ref(),
            &job.options.audio,
            &job.options.video,
        );

        let task = {
            let mut tasks = self.tasks.lock();
            if tasks.len() >= self.max_tasks {
                return Err(Error::CapacityExceeded {
                    limit: self.max_tasks,
                });
            }
            if tasks.contains_key(&task_id) {
                return Err(Error::duplicate(&task_id));
            }
            let task = TranscodeTask::new(
                task_id.clone(),
                job.file_path,
                job.output_directory,
                job.options,
                self.settings.clone(),
                self.events.clone(),
            );
            tasks.insert(task_id.clone(), Arc::clone(&task));
            task
        };

        self.events.emit(TranscoderEvent::TaskAdded {
            task_id: task_id.clone(),
        });

        // Start on a detached future: a caller dropping `add` mid-start must
        // not strand a registry entry with no corresponding process.
        let manager = self.clone();
        let id = task_id.clone();
        let started = tokio::spawn(async move {
            match task.start().await {
                Ok(playlist_path) => Ok(playlist_path),
                Err(e) => {
                    manager.tasks.lock().remove(&id);
                    tracing::warn!(task_id = %id, error = %e, "task failed to start, rolled back");
                    Err(e)
                }
            }
        });

        let playlist_path = started
            .await
            .map_err(|e| Error::Internal(format!("task start panicked: {e}")))??;

        tracing::info!(task_id = %task_id, running = self.len(), "added transcode task");

        Ok(NewTask {
            task_id,
            playlist_path,
        })
    }

    /// Stop and remove the task whose identity is value-equal to `task_id`.
    ///
    /// A no-op when no such task exists; removal of an unknown or
    /// already-removed identity never raises.
    pub async fn remove(&self, task_id: &TaskId) {
        let task = { self.tasks.lock().get(task_id).cloned() };
        let Some(task) = task else {
            return;
        };

        task.stop().await;

        // The entry stays in the registry while the task drains, so a
        // duplicate submission cannot slip in mid-stop; whichever caller
        // actually removes the entry emits the notification.
        let removed = { self.tasks.lock().remove(task_id) };
        if removed.is_some() {
            self.events.emit(TranscoderEvent::TaskRemoved {
                task_id: task_id.clone(),
            });
            tracing::info!(task_id = %task_id, running = self.len(), "removed transcode task");
        }
    }

    /// Number of active tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Snapshot the active tasks.
    pub fn list(&self) -> Vec<TaskSummary> {
        self.tasks
            .lock()
            .values()
            .map(|task| TaskSummary {
                task_id: task.id().clone(),
                file_path: task.file_path().to_path_buf(),
                state: task.state(),
                started_at: task.started_at(),
            })
            .collect()
    }

    /// React to task-terminated notifications by reclaiming registry entries.
    ///
    /// Covers both requested stops and segmenter processes that exit on
    /// their own; `remove` is idempotent, so a task that was already removed
    /// explicitly is a no-op here.
    pub fn spawn_event_listener(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let mut events = self.events.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(TranscoderEvent::TaskTerminated { task_id }) => {
                        manager.remove(&task_id).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "transcoder event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Drain every active task before process exit.
    pub async fn shutdown(&self) {
        self.events.emit(TranscoderEvent::ShutdownRequested);

        let ids: Vec<TaskId> = { self.tasks.lock().keys().cloned().collect() };
        for id in &ids {
            self.remove(id).await;
        }

        self.events.emit(TranscoderEvent::ShutdownComplete);
        tracing::info!(drained = ids.len(), "transcode manager shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::options::{
        AudioCodec, AudioOptions, Preset, TranscodingOptions, VideoCodec, VideoOptions,
        VideoProfile,
    };
    use std::path::Path;

    fn job(output_root: &Path, file: &str, video_codec: VideoCodec) -> TranscodeJob {
        TranscodeJob {
            file_path: PathBuf::from(file),
            output_directory: output_root.to_path_buf(),
            options: TranscodingOptions {
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
            },
        }
    }

    fn manager_with_broken_ffmpeg(max_tasks: usize) -> TranscodeManager {
        let settings = TaskSettings {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg-xyz-12345"),
            ..TaskSettings::default()
        };
        TranscodeManager::new(max_tasks, settings, EventBus::default())
    }

    #[tokio::test]
    async fn remove_unknown_task_is_noop() {
        let manager = manager_with_broken_ffmpeg(2);
        let ghost = TaskId {
            folder_id: "0".repeat(64),
            prepend_file_id: "1".repeat(64),
        };
        manager.remove(&ghost).await;
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn start_failure_rolls_back_registry() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_broken_ffmpeg(2);

        let err = manager
            .add(job(dir.path(), "/media/movie.mkv", VideoCodec::X264))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Process { .. }));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn unsupported_codec_is_not_retained() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_broken_ffmpeg(2);

        let err = manager
            .add(job(dir.path(), "/media/movie.mkv", VideoCodec::Hevc))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(_)));
        assert!(manager.is_empty());
    }
}
