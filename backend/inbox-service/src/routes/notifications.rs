use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthedUser;
use crate::models::{NotificationDto, NotificationKind, SubjectRef};
use crate::services::notification_service::{CreateNotificationRequest, NotificationService};
use crate::state::AppState;

use super::PageQuery;

#[derive(Debug, Deserialize)]
pub struct CreateNotificationPayload {
    pub recipient_id: Uuid,
    pub kind: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<Uuid>,
    pub body: String,
}

/// POST /api/v1/notifications
/// Create a notification from the caller's action. Self-notifications are
/// suppressed (204, nothing stored); duplicates inside the dedup window
/// resolve to the existing record (200).
pub async fn create_notification(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(payload): Json<CreateNotificationPayload>,
) -> Result<Response, AppError> {
    let kind = NotificationKind::parse(&payload.kind)
        .ok_or_else(|| AppError::Validation(format!("unknown notification kind: {}", payload.kind)))?;
    let subject = match (payload.subject_type.as_deref(), payload.subject_id) {
        (Some(t), Some(id)) => Some(
            SubjectRef::from_parts(t, id)
                .ok_or_else(|| AppError::Validation(format!("unknown subject type: {t}")))?,
        ),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "subject_type and subject_id must be supplied together".into(),
            ))
        }
    };

    let created = NotificationService::create(
        state.store.as_ref(),
        &state.gateway,
        CreateNotificationRequest {
            recipient_id: payload.recipient_id,
            actor_id: user.id,
            kind,
            subject,
            body: payload.body,
        },
        state.config.dedup_window(),
    )
    .await?;

    match created {
        Some(notification) => {
            Ok((StatusCode::OK, Json(NotificationDto::from(&notification))).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /api/v1/notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    user: AuthedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let notifications = NotificationService::list(
        state.store.as_ref(),
        user.id,
        page.limit(),
        page.offset(),
    )
    .await?;
    let unread = NotificationService::unread_count(state.store.as_ref(), user.id).await?;
    Ok(Json(json!({
        "notifications": notifications.iter().map(NotificationDto::from).collect::<Vec<_>>(),
        "unread_count": unread,
    })))
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub marked_read: u64,
}

/// PUT /api/v1/notifications/read-all
/// Bulk idempotent read transition; reports how many actually flipped.
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let marked_read =
        NotificationService::mark_all_read(state.store.as_ref(), user.id).await?;
    Ok(Json(MarkAllReadResponse { marked_read }))
}

/// GET /api/v1/notifications/unread-count
pub async fn get_unread_count(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let unread = NotificationService::unread_count(state.store.as_ref(), user.id).await?;
    Ok(Json(json!({ "unread_count": unread })))
}

/// PUT /api/v1/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = NotificationService::mark_read(state.store.as_ref(), id, user.id).await?;
    Ok(Json(json!({
        "was_already_read": outcome.was_already_read,
        "read_at": outcome.read_at,
    })))
}
