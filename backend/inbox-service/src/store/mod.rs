//! Entity store: durable records and the atomic primitives the services
//! build on. CRUD and queries only; business rules live in `services`.
//!
//! Two backends implement the traits: [`postgres::PgStore`] for production
//! and [`memory::MemoryStore`] for the test suite and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Conversation, Message, Notification, ParticipantPair, Story, StoryFrame};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Atomic check-then-insert on the normalized pair: concurrent callers
    /// for the same pair observe the same conversation, never a duplicate.
    /// A soft-deactivated pair is revived rather than duplicated.
    async fn find_or_create_conversation(&self, pair: ParticipantPair)
        -> AppResult<Conversation>;

    async fn get_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>>;

    /// Conversations the user participates in, most recent activity first.
    async fn list_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Conversation>>;

    /// Sets the last-message pointer, bumps last activity, and increments the
    /// receiver's unread counter by exactly one, as a single atomic mutation.
    async fn record_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        receiver_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Resets one participant's unread counter to zero. Idempotent.
    async fn reset_unread(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: &Message) -> AppResult<()>;

    /// Soft-deleted messages do not resolve.
    async fn get_message(&self, id: Uuid) -> AppResult<Option<Message>>;

    /// Conditional read transition: returns true only when this call flipped
    /// the flag, false when the message was already read.
    async fn mark_message_read(&self, id: Uuid, read_at: DateTime<Utc>) -> AppResult<bool>;

    async fn soft_delete_message(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Live messages of a conversation, newest first, ordered by
    /// `(created_at, id)` descending so pages never overlap or skip.
    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()>;

    async fn get_notification(&self, id: Uuid) -> AppResult<Option<Notification>>;

    /// Most recent notification carrying the fingerprint and created at or
    /// after `cutoff`: the single indexed lookup dedup rides on.
    async fn find_notification_since(
        &self,
        dedup_key: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Conditional read transition, same contract as messages.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Bulk read transition; returns the number of rows actually flipped.
    async fn mark_all_notifications_read(
        &self,
        recipient_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> AppResult<u64>;

    async fn unread_notification_count(&self, recipient_id: Uuid) -> AppResult<i64>;

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>>;
}

#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn insert_story(&self, story: &Story) -> AppResult<()>;

    async fn get_story(&self, id: Uuid) -> AppResult<Option<Story>>;

    async fn append_story_frame(&self, story_id: Uuid, frame: StoryFrame) -> AppResult<()>;

    async fn deactivate_story(&self, id: Uuid) -> AppResult<()>;

    /// Deactivates every still-active story past its expiry. Idempotent bulk
    /// transition; returns the number of stories flipped this run.
    async fn deactivate_expired_stories(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Insert-if-absent on (story, viewer): returns true only when this call
    /// created the view record.
    async fn record_story_view(
        &self,
        story_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn is_story_viewed(&self, story_id: Uuid, viewer_id: Uuid) -> AppResult<bool>;

    async fn count_story_views(&self, story_id: Uuid) -> AppResult<i64>;
}

/// The full entity store the services are written against.
pub trait EntityStore:
    ConversationStore + MessageStore + NotificationStore + StoryStore
{
}

impl<T> EntityStore for T where
    T: ConversationStore + MessageStore + NotificationStore + StoryStore
{
}
