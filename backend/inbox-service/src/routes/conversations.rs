use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthedUser;
use crate::models::{ConversationDto, MessageDto};
use crate::services::{
    conversation_service::ConversationService, message_service::MessageService,
};
use crate::state::AppState;

use super::PageQuery;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub user_a: Uuid,
    pub user_b: Uuid,
}

/// POST /api/v1/conversations
/// Resolve or create the conversation for an unordered user pair.
/// The caller must be one of the two participants.
pub async fn find_or_create_conversation(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationDto>), AppError> {
    if user.id != body.user_a && user.id != body.user_b {
        return Err(AppError::NotParticipant);
    }
    let conversation =
        ConversationService::find_or_create(state.store.as_ref(), body.user_a, body.user_b)
            .await?;
    Ok((StatusCode::OK, Json(ConversationDto::from(&conversation))))
}

/// GET /api/v1/conversations
/// The caller's conversations, most recent activity first.
pub async fn get_user_conversations(
    State(state): State<AppState>,
    user: AuthedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ConversationDto>>, AppError> {
    let conversations = ConversationService::list_for_user(
        state.store.as_ref(),
        user.id,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(Json(
        conversations.iter().map(ConversationDto::from).collect(),
    ))
}

/// GET /api/v1/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationDto>, AppError> {
    let conversation = ConversationService::get(state.store.as_ref(), id).await?;
    if !conversation.participants.contains(user.id) {
        return Err(AppError::NotParticipant);
    }
    Ok(Json(ConversationDto::from(&conversation)))
}

/// POST /api/v1/conversations/:id/read
/// Reset the caller's unread counter for the conversation. Idempotent.
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ConversationService::mark_read(state.store.as_ref(), id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/conversations/:id/messages
/// Messages of the conversation, newest first. Clients reverse a page for
/// chronological display.
pub async fn get_conversation_messages(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<MessageDto>>, AppError> {
    let messages = MessageService::get_conversation_messages(
        state.store.as_ref(),
        id,
        user.id,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}
