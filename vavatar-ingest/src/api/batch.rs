//! Batch control handlers
//!
//! GET /batch, POST /batch/select, PATCH|DELETE /batch/entries/:id,
//! POST /batch/cancel, POST /batch/commit

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{BatchPhase, BatchProgress, EntrySummary, SelectionDescriptor, SkippedItem};
use crate::services::{FilePicker, PathPicker, PickError, StagingStats};
use crate::AppState;

/// Inline upload in a selection request
#[derive(Debug, Deserialize)]
pub struct InlineFile {
    pub name: String,
    /// Standard base64 of the file bytes
    pub data_base64: String,
}

/// POST /batch/select request
#[derive(Debug, Default, Deserialize)]
pub struct SelectRequest {
    /// Files on the service host
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Files uploaded in the request body
    #[serde(default)]
    pub files: Vec<InlineFile>,
}

/// POST /batch/select response
#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub batch_id: Uuid,
    pub phase: BatchPhase,
    pub total: usize,
}

/// GET /batch response
#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub progress: BatchProgress,
    pub entries: Vec<EntrySummary>,
    pub skipped: Vec<SkippedItem>,
    pub staging: StagingStats,
}

/// PATCH /batch/entries/:id request
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub display_name: String,
}

/// POST /batch/cancel response
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    pub progress: BatchProgress,
}

/// One stored clip in a commit response
#[derive(Debug, Serialize)]
pub struct StoredClip {
    pub entry_id: Uuid,
    pub display_name: String,
    pub duration_ms: u64,
    pub location: String,
}

/// POST /batch/commit response
#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub count: usize,
    pub clips: Vec<StoredClip>,
}

/// Host paths followed by inline uploads, in request order
struct RequestPicker {
    paths: PathPicker,
    inline: Vec<SelectionDescriptor>,
}

#[async_trait::async_trait]
impl FilePicker for RequestPicker {
    async fn pick(&self) -> Result<Vec<SelectionDescriptor>, PickError> {
        let mut descriptors = self.paths.pick().await?;
        descriptors.extend(self.inline.iter().cloned());
        Ok(descriptors)
    }
}

fn decode_inline(files: Vec<InlineFile>) -> ApiResult<Vec<SelectionDescriptor>> {
    files
        .into_iter()
        .map(|file| {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(file.data_base64.trim())
                .map_err(|e| {
                    ApiError::BadRequest(format!("Invalid base64 for '{}': {}", file.name, e))
                })?;
            Ok(SelectionDescriptor::from_bytes(file.name, bytes))
        })
        .collect()
}

/// GET /batch
pub async fn get_batch(State(state): State<AppState>) -> Json<BatchStatusResponse> {
    Json(BatchStatusResponse {
        progress: state.pipeline.progress().await,
        entries: state.pipeline.entries().await,
        skipped: state.pipeline.skipped().await,
        staging: state.pipeline.staging_stats(),
    })
}

/// POST /batch/select
///
/// Starts a batch and processes it in the background. Returns 202 Accepted.
pub async fn select_files(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<(StatusCode, Json<SelectResponse>)> {
    if request.paths.is_empty() && request.files.is_empty() {
        return Err(ApiError::BadRequest("No files selected".to_string()));
    }

    let inline = decode_inline(request.files)?;
    let total = request.paths.len() + inline.len();
    let picker = RequestPicker {
        paths: PathPicker::new(request.paths),
        inline,
    };

    let ticket = state.pipeline.begin_selection().await?;
    let batch_id = ticket.batch_id();

    let state_clone = state.clone();
    tokio::spawn(async move {
        tracing::info!(batch_id = %batch_id, "Background batch task started");

        match state_clone.pipeline.run(ticket, &picker).await {
            Ok(progress) => tracing::info!(
                batch_id = %batch_id,
                phase = ?progress.phase,
                processed = progress.processed,
                accepted = progress.accepted,
                "Background batch task finished"
            ),
            Err(e) => {
                tracing::error!(batch_id = %batch_id, error = %e, "Background batch task failed");
                state_clone.record_error(e.to_string()).await;
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SelectResponse {
            batch_id,
            phase: BatchPhase::Selecting,
            total,
        }),
    ))
}

/// PATCH /batch/entries/:id
pub async fn rename_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameRequest>,
) -> ApiResult<Json<EntrySummary>> {
    if !state.pipeline.rename(id, &request.display_name).await? {
        return Err(ApiError::NotFound(format!("Entry not found: {}", id)));
    }

    state
        .pipeline
        .entries()
        .await
        .into_iter()
        .find(|e| e.id == id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Entry not found: {}", id)))
}

/// DELETE /batch/entries/:id
pub async fn remove_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.pipeline.remove(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Entry not found: {}", id)))
    }
}

/// POST /batch/cancel
///
/// Always 200; `cancelled` is false when there was nothing to cancel.
pub async fn cancel_batch(State(state): State<AppState>) -> Json<CancelResponse> {
    let cancelled = state.pipeline.cancel().await;
    Json(CancelResponse {
        cancelled,
        progress: state.pipeline.progress().await,
    })
}

/// POST /batch/commit
pub async fn commit_batch(State(state): State<AppState>) -> ApiResult<Json<CommitResponse>> {
    let committed = match state.pipeline.commit().await {
        Ok(committed) => committed,
        Err(e) => {
            let err = ApiError::from(e);
            if matches!(err, ApiError::PersistFailure(_)) {
                state.record_error(err.to_string()).await;
            }
            return Err(err);
        }
    };

    let clips: Vec<StoredClip> = committed
        .into_iter()
        .map(|clip| StoredClip {
            entry_id: clip.entry_id,
            display_name: clip.record.display_name,
            duration_ms: vavatar_common::human_time::duration_ms(clip.record.duration),
            location: clip.location,
        })
        .collect();

    Ok(Json(CommitResponse {
        count: clips.len(),
        clips,
    }))
}

/// Build batch control routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batch", get(get_batch))
        .route("/batch/select", post(select_files))
        .route("/batch/entries/:id", patch(rename_entry).delete(remove_entry))
        .route("/batch/cancel", post(cancel_batch))
        .route("/batch/commit", post(commit_batch))
        .route("/batch/events", get(super::sse::batch_event_stream))
}
