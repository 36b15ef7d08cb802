//! In-memory entity store.
//!
//! Backs the test suite and local development. One `RwLock` guards all
//! tables, so every store call is a single critical section and the atomic
//! contracts (find-or-create, unread increment, insert-if-absent view) hold
//! under concurrent callers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message, Notification, ParticipantPair, Story, StoryFrame};

use super::{ConversationStore, MessageStore, NotificationStore, StoryStore};

#[derive(Default)]
struct Tables {
    conversations: HashMap<Uuid, Conversation>,
    pair_index: HashMap<ParticipantPair, Uuid>,
    messages: HashMap<Uuid, Message>,
    // conversation id -> message ids in insertion order
    conversation_messages: HashMap<Uuid, Vec<Uuid>>,
    notifications: HashMap<Uuid, Notification>,
    stories: HashMap<Uuid, Story>,
    // story id -> viewer id -> viewed at
    story_views: HashMap<Uuid, HashMap<Uuid, DateTime<Utc>>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_or_create_conversation(
        &self,
        pair: ParticipantPair,
    ) -> AppResult<Conversation> {
        let mut tables = self.tables.write().await;
        if let Some(id) = tables.pair_index.get(&pair).copied() {
            if let Some(convo) = tables.conversations.get_mut(&id) {
                convo.is_active = true;
                return Ok(convo.clone());
            }
        }
        let convo = Conversation::new(pair, Utc::now());
        tables.pair_index.insert(pair, convo.id);
        tables.conversations.insert(convo.id, convo.clone());
        Ok(convo)
    }

    async fn get_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let tables = self.tables.read().await;
        Ok(tables.conversations.get(&id).cloned())
    }

    async fn list_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Conversation>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.is_active && c.participants.contains(user_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then(b.id.cmp(&a.id))
        });
        Ok(matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn record_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        receiver_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let convo = tables
            .conversations
            .get_mut(&conversation_id)
            .ok_or(AppError::NotFound)?;
        if receiver_id == convo.participants.low() {
            convo.unread_low += 1;
        } else if receiver_id == convo.participants.high() {
            convo.unread_high += 1;
        } else {
            return Err(AppError::NotParticipant);
        }
        convo.last_message_id = Some(message_id);
        convo.last_activity_at = at;
        Ok(())
    }

    async fn reset_unread(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let convo = tables
            .conversations
            .get_mut(&conversation_id)
            .ok_or(AppError::NotFound)?;
        if user_id == convo.participants.low() {
            convo.unread_low = 0;
        } else if user_id == convo.participants.high() {
            convo.unread_high = 0;
        } else {
            return Err(AppError::NotParticipant);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, message: &Message) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .conversation_messages
            .entry(message.conversation_id)
            .or_default()
            .push(message.id);
        tables.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn get_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .get(&id)
            .filter(|m| m.deleted_at.is_none())
            .cloned())
    }

    async fn mark_message_read(&self, id: Uuid, read_at: DateTime<Utc>) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let message = tables.messages.get_mut(&id).ok_or(AppError::NotFound)?;
        if message.is_read {
            return Ok(false);
        }
        message.is_read = true;
        message.read_at = Some(read_at);
        Ok(true)
    }

    async fn soft_delete_message(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let message = tables.messages.get_mut(&id).ok_or(AppError::NotFound)?;
        if message.deleted_at.is_none() {
            message.deleted_at = Some(at);
        }
        Ok(())
    }

    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let tables = self.tables.read().await;
        let ids = match tables.conversation_messages.get(&conversation_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        let mut live: Vec<Message> = ids
            .iter()
            .filter_map(|id| tables.messages.get(id))
            .filter(|m| m.deleted_at.is_none())
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(live
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn get_notification(&self, id: Uuid) -> AppResult<Option<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables.notifications.get(&id).cloned())
    }

    async fn find_notification_since(
        &self,
        dedup_key: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.dedup_key == dedup_key && n.created_at >= cutoff)
            .max_by_key(|n| n.created_at)
            .cloned())
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let notification = tables.notifications.get_mut(&id).ok_or(AppError::NotFound)?;
        if notification.is_read {
            return Ok(false);
        }
        notification.is_read = true;
        notification.read_at = Some(read_at);
        Ok(true)
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut flipped = 0;
        for notification in tables.notifications.values_mut() {
            if notification.recipient_id == recipient_id && !notification.is_read {
                notification.is_read = true;
                notification.read_at = Some(read_at);
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn unread_notification_count(&self, recipient_id: Uuid) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as i64)
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn insert_story(&self, story: &Story) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.stories.insert(story.id, story.clone());
        tables.story_views.entry(story.id).or_default();
        Ok(())
    }

    async fn get_story(&self, id: Uuid) -> AppResult<Option<Story>> {
        let tables = self.tables.read().await;
        Ok(tables.stories.get(&id).cloned())
    }

    async fn append_story_frame(&self, story_id: Uuid, frame: StoryFrame) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let story = tables.stories.get_mut(&story_id).ok_or(AppError::NotFound)?;
        story.frames.push(frame);
        Ok(())
    }

    async fn deactivate_story(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let story = tables.stories.get_mut(&id).ok_or(AppError::NotFound)?;
        story.is_active = false;
        Ok(())
    }

    async fn deactivate_expired_stories(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut flipped = 0;
        for story in tables.stories.values_mut() {
            if story.is_active && story.is_expired(now) {
                story.is_active = false;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn record_story_view(
        &self,
        story_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.stories.contains_key(&story_id) {
            return Err(AppError::NotFound);
        }
        let views = tables.story_views.entry(story_id).or_default();
        if views.contains_key(&viewer_id) {
            return Ok(false);
        }
        views.insert(viewer_id, at);
        Ok(true)
    }

    async fn is_story_viewed(&self, story_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .story_views
            .get(&story_id)
            .map(|views| views.contains_key(&viewer_id))
            .unwrap_or(false))
    }

    async fn count_story_views(&self, story_id: Uuid) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .story_views
            .get(&story_id)
            .map(|views| views.len() as i64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConversationStore;

    #[tokio::test]
    async fn find_or_create_is_stable_for_a_pair() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = store
            .find_or_create_conversation(ParticipantPair::new(a, b).unwrap())
            .await
            .unwrap();
        let second = store
            .find_or_create_conversation(ParticipantPair::new(b, a).unwrap())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn record_message_rejects_stranger_receiver() {
        let store = MemoryStore::new();
        let convo = store
            .find_or_create_conversation(
                ParticipantPair::new(Uuid::new_v4(), Uuid::new_v4()).unwrap(),
            )
            .await
            .unwrap();
        let err = store
            .record_message(convo.id, Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotParticipant));
    }
}
