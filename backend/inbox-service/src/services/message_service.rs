use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::gateway::{GatewayEvent, SessionRegistry};
use crate::models::{Message, MessageBody, MessageDto};
use crate::store::EntityStore;

use super::conversation_service::ConversationService;

/// Outcome of a read transition.
#[derive(Debug, Clone, Copy)]
pub struct ReadOutcome {
    /// True when the message was already read and nothing changed.
    pub was_already_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

pub struct MessageService;

impl MessageService {
    /// Send a message. Resolves (or creates) the pair conversation, persists
    /// the message, advances the unread counter, then pushes `message.new`
    /// to the receiver's live session.
    ///
    /// The push happens only after both durable writes succeed; if the
    /// counter update cannot be confirmed the send fails as a whole rather
    /// than detaching the message from the counter.
    pub async fn send(
        store: &dyn EntityStore,
        gateway: &SessionRegistry,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: MessageBody,
    ) -> AppResult<Message> {
        let conversation = ConversationService::find_or_create(store, sender_id, receiver_id).await?;

        let message = Message::new(
            conversation.id,
            sender_id,
            receiver_id,
            body,
            Utc::now(),
        );
        store.insert_message(&message).await?;
        ConversationService::record_outgoing_message(
            store,
            &conversation,
            sender_id,
            message.id,
            message.created_at,
        )
        .await?;

        crate::metrics::record_message_sent();
        tracing::debug!(
            message_id = %message.id,
            conversation_id = %conversation.id,
            "message persisted"
        );

        gateway
            .dispatch(
                receiver_id,
                &GatewayEvent::MessageNew {
                    message: MessageDto::from(&message),
                },
            )
            .await;

        Ok(message)
    }

    /// Receiver-only read transition. Idempotent: a second call reports
    /// `was_already_read` and leaves the original timestamp untouched.
    /// A genuine transition also clears the reader's unread counter for the
    /// whole conversation.
    pub async fn mark_read(
        store: &dyn EntityStore,
        message_id: Uuid,
        requesting_user_id: Uuid,
    ) -> AppResult<ReadOutcome> {
        let message = store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if requesting_user_id != message.receiver_id {
            return Err(AppError::NotAuthorized);
        }
        if message.is_read {
            return Ok(ReadOutcome {
                was_already_read: true,
                read_at: message.read_at,
            });
        }

        let read_at = Utc::now();
        let transitioned = store.mark_message_read(message_id, read_at).await?;
        if !transitioned {
            // A concurrent reader won the race; the stored timestamp stands.
            let current = store.get_message(message_id).await?;
            return Ok(ReadOutcome {
                was_already_read: true,
                read_at: current.and_then(|m| m.read_at),
            });
        }

        ConversationService::mark_read(store, message.conversation_id, requesting_user_id)
            .await?;

        Ok(ReadOutcome {
            was_already_read: false,
            read_at: Some(read_at),
        })
    }

    /// Sender-only soft delete. Historical unread counters are left alone:
    /// they reflect message volume at send time, not current existence.
    pub async fn delete(
        store: &dyn EntityStore,
        gateway: &SessionRegistry,
        message_id: Uuid,
        requesting_user_id: Uuid,
    ) -> AppResult<()> {
        let message = store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if requesting_user_id != message.sender_id {
            return Err(AppError::NotAuthorized);
        }

        store.soft_delete_message(message_id, Utc::now()).await?;

        gateway
            .dispatch(
                message.receiver_id,
                &GatewayEvent::MessageDeleted {
                    conversation_id: message.conversation_id,
                    message_id,
                },
            )
            .await;

        Ok(())
    }

    /// Messages of a conversation, newest first. The requester must be a
    /// participant. Ordering is stable across page boundaries.
    pub async fn get_conversation_messages(
        store: &dyn EntityStore,
        conversation_id: Uuid,
        requesting_user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let conversation = ConversationService::get(store, conversation_id).await?;
        if !conversation.participants.contains(requesting_user_id) {
            return Err(AppError::NotParticipant);
        }
        store
            .list_conversation_messages(conversation_id, limit, offset)
            .await
    }
}
