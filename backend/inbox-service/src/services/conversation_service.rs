use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ParticipantPair};
use crate::store::EntityStore;

pub struct ConversationService;

impl ConversationService {
    /// Resolve the conversation for an unordered user pair, creating it on
    /// first contact. Concurrent callers for the same pair converge on one
    /// conversation; the store's atomic upsert guarantees no duplicate.
    pub async fn find_or_create(
        store: &dyn EntityStore,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<Conversation> {
        let pair = ParticipantPair::new(user_a, user_b)?;
        store.find_or_create_conversation(pair).await
    }

    pub async fn get(store: &dyn EntityStore, conversation_id: Uuid) -> AppResult<Conversation> {
        store
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Conversations the user participates in, most recent activity first.
    pub async fn list_for_user(
        store: &dyn EntityStore,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Conversation>> {
        store.list_user_conversations(user_id, limit, offset).await
    }

    /// Advance the thread for an outgoing message: last-message pointer,
    /// last-activity timestamp, and exactly one unread tick for the
    /// receiver. The store applies all three in a single atomic mutation,
    /// so rapid-fire sends are each counted.
    pub async fn record_outgoing_message(
        store: &dyn EntityStore,
        conversation: &Conversation,
        sender_id: Uuid,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let receiver_id = conversation.participants.other(sender_id)?;
        store
            .record_message(conversation.id, message_id, receiver_id, at)
            .await
    }

    /// Reset the user's unread counter for the conversation to zero.
    /// Idempotent: resetting an already-zero counter is a no-op.
    pub async fn mark_read(
        store: &dyn EntityStore,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        store.reset_unread(conversation_id, user_id).await
    }

    /// Pure lookup of the other side of a conversation.
    pub fn get_other_participant(
        conversation: &Conversation,
        user_id: Uuid,
    ) -> AppResult<Uuid> {
        conversation.participants.other(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conversation;

    #[test]
    fn other_participant_requires_membership() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let convo = Conversation::new(ParticipantPair::new(a, b).unwrap(), Utc::now());

        assert_eq!(
            ConversationService::get_other_participant(&convo, a).unwrap(),
            b
        );
        assert!(matches!(
            ConversationService::get_other_participant(&convo, Uuid::new_v4()),
            Err(AppError::NotParticipant)
        ));
    }
}
