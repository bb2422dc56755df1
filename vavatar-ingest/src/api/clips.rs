//! Clip library listing

use axum::{extract::State, routing::get, Json, Router};

use crate::db::clips::VoiceClip;
use crate::error::ApiResult;
use crate::AppState;

/// GET /clips
pub async fn list_clips(State(state): State<AppState>) -> ApiResult<Json<Vec<VoiceClip>>> {
    Ok(Json(state.library.list().await?))
}

pub fn clip_routes() -> Router<AppState> {
    Router::new().route("/clips", get(list_clips))
}
