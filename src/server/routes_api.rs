use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;
use crate::probe;
use crate::server::AppContext;
use crate::tools::ToolInfo;
use crate::transcode::{
    AudioOptions, Preset, TaskId, TaskSummary, TranscodeJob, TranscodingOptions, VideoOptions,
};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/transcode", post(submit_transcode))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:folder_id/:prepend_id", delete(remove_task))
        .route("/tools", get(get_tools))
}

#[derive(Debug, Deserialize)]
pub struct TranscodeRequest {
    pub file_path: PathBuf,

    /// Desired start position in seconds.
    #[serde(default)]
    pub start_time: f64,

    /// Target segment length in seconds.
    pub segment_duration: f64,

    /// Overrides the configured transcode output root.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    pub quality_options: QualityOptions,
}

#[derive(Debug, Deserialize)]
pub struct QualityOptions {
    pub audio: AudioOptions,
    pub video: VideoOptions,
    pub preset: Preset,
}

#[derive(Serialize)]
struct TranscodeResponse {
    task_id: TaskId,
    playlist_path: PathBuf,
}

/// Error wrapper mapping [`Error`] onto HTTP responses.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "msg": self.0.to_string() }))).into_response()
    }
}

async fn submit_transcode(
    State(ctx): State<AppContext>,
    Json(request): Json<TranscodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.segment_duration <= 0.0 {
        return Err(Error::Validation("segment_duration must be positive".to_string()).into());
    }
    if !request.file_path.exists() {
        return Err(Error::not_found("file", request.file_path.display()).into());
    }

    let ffprobe = ctx.tools.require("ffprobe")?;
    let timing = probe::probe_timing(&ffprobe.path, &request.file_path).await?;

    let options = TranscodingOptions {
        audio: request.quality_options.audio,
        video: request.quality_options.video,
        preset: request.quality_options.preset,
        start_time: probe::resolve_start_time(request.start_time, timing.start_time),
        file_duration: timing.duration,
        segment_duration: request.segment_duration,
    };

    let job = TranscodeJob {
        file_path: request.file_path,
        output_directory: request
            .output_directory
            .unwrap_or_else(|| ctx.config.transcode.output_dir.clone()),
        options,
    };

    let new_task = ctx.manager.add(job).await?;

    Ok((
        StatusCode::CREATED,
        Json(TranscodeResponse {
            task_id: new_task.task_id,
            playlist_path: new_task.playlist_path,
        }),
    ))
}

async fn list_tasks(State(ctx): State<AppContext>) -> Json<Vec<TaskSummary>> {
    Json(ctx.manager.list())
}

async fn remove_task(
    State(ctx): State<AppContext>,
    Path((folder_id, prepend_id)): Path<(String, String)>,
) -> StatusCode {
    let task_id = TaskId {
        folder_id,
        prepend_file_id: prepend_id,
    };
    // Removal of an unknown task is a no-op, not an error.
    ctx.manager.remove(&task_id).await;
    StatusCode::NO_CONTENT
}

async fn get_tools(State(ctx): State<AppContext>) -> Json<Vec<ToolInfo>> {
    Json(ctx.tools.check_all())
}
