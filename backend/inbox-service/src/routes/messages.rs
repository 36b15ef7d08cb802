use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthedUser;
use crate::models::{MessageBody, MessageDto};
use crate::services::message_service::MessageService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub message_type: String,
    pub content: Option<String>,
    pub media_ref: Option<String>,
}

/// POST /api/v1/messages
/// Send a message from the caller to `receiver_id`.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), AppError> {
    let message_body =
        MessageBody::from_parts(&body.message_type, body.content, body.media_ref)?;
    let message = MessageService::send(
        state.store.as_ref(),
        &state.gateway,
        user.id,
        body.receiver_id,
        message_body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub was_already_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// PUT /api/v1/messages/:id/read
/// Receiver-only read transition. Idempotent.
pub async fn mark_message_read(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let outcome = MessageService::mark_read(state.store.as_ref(), id, user.id).await?;
    Ok(Json(MarkReadResponse {
        was_already_read: outcome.was_already_read,
        read_at: outcome.read_at,
    }))
}

/// DELETE /api/v1/messages/:id
/// Sender-only soft delete.
pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    MessageService::delete(state.store.as_ref(), &state.gateway, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
