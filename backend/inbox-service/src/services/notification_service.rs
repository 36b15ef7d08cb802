use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::gateway::{GatewayEvent, SessionRegistry};
use crate::models::{Notification, NotificationDto, NotificationKind, SubjectRef};
use crate::store::EntityStore;

/// Request to create a notification
#[derive(Debug, Clone)]
pub struct CreateNotificationRequest {
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    pub subject: Option<SubjectRef>,
    pub body: String,
}

/// Outcome of a read transition (same contract as messages).
#[derive(Debug, Clone, Copy)]
pub struct ReadOutcome {
    pub was_already_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

pub struct NotificationService;

impl NotificationService {
    /// Create a notification, collapsing repeats.
    ///
    /// Self-notifications are suppressed silently (`Ok(None)`), never
    /// stored. Within the trailing dedup window an identical
    /// (recipient, kind, actor, subject) tuple resolves to the existing
    /// record unchanged (no timestamp bump) via one indexed fingerprint
    /// lookup. Producers therefore never pre-check before calling.
    pub async fn create(
        store: &dyn EntityStore,
        gateway: &SessionRegistry,
        req: CreateNotificationRequest,
        dedup_window: chrono::Duration,
    ) -> AppResult<Option<Notification>> {
        if req.recipient_id == req.actor_id {
            tracing::debug!(user_id = %req.actor_id, kind = req.kind.as_str(), "self-notification suppressed");
            return Ok(None);
        }

        let dedup_key =
            Notification::fingerprint(req.recipient_id, req.actor_id, req.kind, req.subject);
        let cutoff = Utc::now() - dedup_window;
        if let Some(existing) = store.find_notification_since(&dedup_key, cutoff).await? {
            crate::metrics::record_notification_deduplicated();
            return Ok(Some(existing));
        }

        let notification = Notification::new(
            req.recipient_id,
            req.actor_id,
            req.kind,
            req.subject,
            req.body,
            Utc::now(),
        );
        store.insert_notification(&notification).await?;
        crate::metrics::record_notification_created();

        gateway
            .dispatch(
                notification.recipient_id,
                &GatewayEvent::NotificationCreated {
                    notification: NotificationDto::from(&notification),
                },
            )
            .await;

        Ok(Some(notification))
    }

    /// Recipient-only read transition, idempotent.
    pub async fn mark_read(
        store: &dyn EntityStore,
        notification_id: Uuid,
        requesting_user_id: Uuid,
    ) -> AppResult<ReadOutcome> {
        let notification = store
            .get_notification(notification_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if requesting_user_id != notification.recipient_id {
            return Err(AppError::NotAuthorized);
        }
        if notification.is_read {
            return Ok(ReadOutcome {
                was_already_read: true,
                read_at: notification.read_at,
            });
        }

        let read_at = Utc::now();
        let transitioned = store.mark_notification_read(notification_id, read_at).await?;
        if !transitioned {
            let current = store.get_notification(notification_id).await?;
            return Ok(ReadOutcome {
                was_already_read: true,
                read_at: current.and_then(|n| n.read_at),
            });
        }

        Ok(ReadOutcome {
            was_already_read: false,
            read_at: Some(read_at),
        })
    }

    /// Bulk idempotent read transition; returns how many records actually
    /// flipped (0 is a valid outcome).
    pub async fn mark_all_read(store: &dyn EntityStore, user_id: Uuid) -> AppResult<u64> {
        store
            .mark_all_notifications_read(user_id, Utc::now())
            .await
    }

    pub async fn unread_count(store: &dyn EntityStore, user_id: Uuid) -> AppResult<i64> {
        store.unread_notification_count(user_id).await
    }

    pub async fn list(
        store: &dyn EntityStore,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>> {
        store.list_notifications(user_id, limit, offset).await
    }
}
