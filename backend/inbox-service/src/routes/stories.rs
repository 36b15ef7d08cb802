use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthedUser;
use crate::models::{StoryDto, StoryFrame};
use crate::services::story_service::StoryService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StoryFramePayload {
    pub media_ref: String,
    pub caption: Option<String>,
    pub overlay: Option<String>,
}

impl StoryFramePayload {
    fn into_frame(self) -> Result<StoryFrame, AppError> {
        if self.media_ref.trim().is_empty() {
            return Err(AppError::Validation(
                "story frames require a media reference".into(),
            ));
        }
        Ok(StoryFrame {
            media_ref: self.media_ref,
            caption: self.caption,
            overlay: self.overlay,
        })
    }
}

/// POST /api/v1/stories
/// Publish a story from its first frame; expiry is now + configured TTL.
pub async fn publish_story(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(payload): Json<StoryFramePayload>,
) -> Result<(StatusCode, Json<StoryDto>), AppError> {
    let frame = payload.into_frame()?;
    let story = StoryService::publish(
        state.store.as_ref(),
        user.id,
        frame,
        state.config.story_ttl(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(StoryDto::from_story(&story, 0))))
}

/// POST /api/v1/stories/:id/frames
/// Append a frame to the caller's own, still-live story.
pub async fn add_story_frame(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StoryFramePayload>,
) -> Result<StatusCode, AppError> {
    let frame = payload.into_frame()?;
    StoryService::add_frame(state.store.as_ref(), id, user.id, frame).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct RecordViewResponse {
    pub is_new_view: bool,
}

/// POST /api/v1/stories/:id/views
/// Record that the caller viewed the story. Repeat views are no-ops.
pub async fn record_story_view(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordViewResponse>, AppError> {
    let is_new_view = StoryService::record_view(
        state.store.as_ref(),
        &state.gateway,
        id,
        user.id,
        state.config.dedup_window(),
    )
    .await?;
    Ok(Json(RecordViewResponse { is_new_view }))
}

/// GET /api/v1/stories/:id/viewed
pub async fn is_viewed_by(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let viewed = StoryService::is_viewed_by(state.store.as_ref(), id, user.id).await?;
    Ok(Json(json!({ "viewed": viewed })))
}

/// POST /api/v1/stories/sweep
/// Deactivate expired stories. Safe for an external scheduler to invoke at
/// any cadence, concurrently with the internal sweeper.
pub async fn sweep_stories(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deactivated = StoryService::sweep_expired(state.store.as_ref()).await?;
    Ok(Json(json!({ "deactivated": deactivated })))
}
