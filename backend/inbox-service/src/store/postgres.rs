//! PostgreSQL entity store.
//!
//! Plain `sqlx::query` + binds throughout. Every atomic contract is a single
//! SQL statement: the pair upsert rides the unique constraint on
//! `(user_low, user_high)`, counter updates are `CASE WHEN` arms over the
//! participant columns, and view dedup is `ON CONFLICT DO NOTHING` with
//! `rows_affected` as the verdict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Conversation, Message, MessageBody, Notification, NotificationKind, ParticipantPair, Story,
    StoryFrame, SubjectRef,
};

use super::{ConversationStore, MessageStore, NotificationStore, StoryStore};

#[derive(Clone)]
pub struct PgStore {
    db: Pool<Postgres>,
}

impl PgStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    fn decode_error(message: String) -> AppError {
        AppError::Database(sqlx::Error::Decode(message.into()))
    }

    fn row_to_conversation(row: &PgRow) -> AppResult<Conversation> {
        let user_low: Uuid = row.get("user_low");
        let user_high: Uuid = row.get("user_high");
        Ok(Conversation {
            id: row.get("id"),
            participants: ParticipantPair::new(user_low, user_high)?,
            last_message_id: row.get("last_message_id"),
            last_activity_at: row.get("last_activity_at"),
            is_active: row.get("is_active"),
            unread_low: row.get("unread_low"),
            unread_high: row.get("unread_high"),
            created_at: row.get("created_at"),
        })
    }

    fn row_to_message(row: &PgRow) -> AppResult<Message> {
        let message_type: String = row.get("message_type");
        let content: Option<String> = row.get("content");
        let media_ref: Option<String> = row.get("media_ref");
        let body = MessageBody::from_parts(&message_type, content, media_ref)
            .map_err(|e| Self::decode_error(format!("stored message body invalid: {e}")))?;
        Ok(Message {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            sender_id: row.get("sender_id"),
            receiver_id: row.get("receiver_id"),
            body,
            is_read: row.get("is_read"),
            read_at: row.get("read_at"),
            created_at: row.get("created_at"),
            deleted_at: row.get("deleted_at"),
        })
    }

    fn row_to_notification(row: &PgRow) -> AppResult<Notification> {
        let kind_str: String = row.get("kind");
        let kind = NotificationKind::parse(&kind_str)
            .ok_or_else(|| Self::decode_error(format!("unknown notification kind: {kind_str}")))?;
        let subject_type: Option<String> = row.get("subject_type");
        let subject_id: Option<Uuid> = row.get("subject_id");
        let subject = match (subject_type, subject_id) {
            (Some(t), Some(id)) => Some(SubjectRef::from_parts(&t, id).ok_or_else(|| {
                Self::decode_error(format!("unknown notification subject type: {t}"))
            })?),
            _ => None,
        };
        Ok(Notification {
            id: row.get("id"),
            recipient_id: row.get("recipient_id"),
            actor_id: row.get("actor_id"),
            kind,
            subject,
            body: row.get("body"),
            dedup_key: row.get("dedup_key"),
            is_read: row.get("is_read"),
            read_at: row.get("read_at"),
            created_at: row.get("created_at"),
        })
    }

    fn row_to_frame(row: &PgRow) -> StoryFrame {
        StoryFrame {
            media_ref: row.get("media_ref"),
            caption: row.get("caption"),
            overlay: row.get("overlay"),
        }
    }

    async fn load_frames(&self, story_id: Uuid) -> AppResult<Vec<StoryFrame>> {
        let rows = sqlx::query(
            "SELECT media_ref, caption, overlay FROM story_frames \
             WHERE story_id = $1 ORDER BY position ASC",
        )
        .bind(story_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.iter().map(Self::row_to_frame).collect())
    }
}

const CONVERSATION_COLUMNS: &str = "id, user_low, user_high, last_message_id, \
     last_activity_at, is_active, unread_low, unread_high, created_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, receiver_id, \
     message_type, content, media_ref, is_read, read_at, created_at, deleted_at";

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, actor_id, kind, subject_type, \
     subject_id, body, dedup_key, is_read, read_at, created_at";

#[async_trait]
impl ConversationStore for PgStore {
    async fn find_or_create_conversation(
        &self,
        pair: ParticipantPair,
    ) -> AppResult<Conversation> {
        // The unique constraint on the normalized pair makes this safe under
        // concurrent callers: the loser of the insert race lands on DO UPDATE
        // and gets the winner's row back. A deactivated pair is revived.
        let row = sqlx::query(&format!(
            "INSERT INTO conversations (id, user_low, user_high, last_activity_at, created_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (user_low, user_high) DO UPDATE SET is_active = TRUE \
             RETURNING {CONVERSATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(pair.low())
        .bind(pair.high())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;
        Self::row_to_conversation(&row)
    }

    async fn get_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(Self::row_to_conversation).transpose()
    }

    async fn list_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE is_active = TRUE AND (user_low = $1 OR user_high = $1) \
             ORDER BY last_activity_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(Self::row_to_conversation).collect()
    }

    async fn record_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        receiver_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET \
                last_message_id = $2, \
                last_activity_at = $3, \
                unread_low  = unread_low  + CASE WHEN user_low  = $4 THEN 1 ELSE 0 END, \
                unread_high = unread_high + CASE WHEN user_high = $4 THEN 1 ELSE 0 END \
             WHERE id = $1 AND (user_low = $4 OR user_high = $4)",
        )
        .bind(conversation_id)
        .bind(message_id)
        .bind(at)
        .bind(receiver_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_conversation(conversation_id).await? {
                Some(_) => Err(AppError::NotParticipant),
                None => Err(AppError::NotFound),
            };
        }
        Ok(())
    }

    async fn reset_unread(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET \
                unread_low  = CASE WHEN user_low  = $2 THEN 0 ELSE unread_low END, \
                unread_high = CASE WHEN user_high = $2 THEN 0 ELSE unread_high END \
             WHERE id = $1 AND (user_low = $2 OR user_high = $2)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_conversation(conversation_id).await? {
                Some(_) => Err(AppError::NotParticipant),
                None => Err(AppError::NotFound),
            };
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert_message(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, \
                message_type, content, media_ref, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8)",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.body.kind_str())
        .bind(message.body.content())
        .bind(message.body.media_ref())
        .bind(message.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(Self::row_to_message).transpose()
    }

    async fn mark_message_read(&self, id: Uuid, read_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE, read_at = $2 \
             WHERE id = $1 AND is_read = FALSE AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(read_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_message(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE messages SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(Self::row_to_message).collect()
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, recipient_id, actor_id, kind, subject_type, \
                subject_id, body, dedup_key, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9)",
        )
        .bind(notification.id)
        .bind(notification.recipient_id)
        .bind(notification.actor_id)
        .bind(notification.kind.as_str())
        .bind(notification.subject.map(|s| s.subject_type()))
        .bind(notification.subject.map(|s| s.subject_id()))
        .bind(&notification.body)
        .bind(&notification.dedup_key)
        .bind(notification.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_notification(&self, id: Uuid) -> AppResult<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(Self::row_to_notification).transpose()
    }

    async fn find_notification_since(
        &self,
        dedup_key: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE dedup_key = $1 AND created_at >= $2 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(dedup_key)
        .bind(cutoff)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(Self::row_to_notification).transpose()
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 \
             WHERE id = $1 AND is_read = FALSE",
        )
        .bind(id)
        .bind(read_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 \
             WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .bind(read_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unread_notification_count(&self, recipient_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM notifications \
             WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(Self::row_to_notification).collect()
    }
}

#[async_trait]
impl StoryStore for PgStore {
    async fn insert_story(&self, story: &Story) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO stories (id, author_id, expires_at, is_active, created_at) \
             VALUES ($1, $2, $3, TRUE, $4)",
        )
        .bind(story.id)
        .bind(story.author_id)
        .bind(story.expires_at)
        .bind(story.created_at)
        .execute(&mut *tx)
        .await?;
        for (position, frame) in story.frames.iter().enumerate() {
            sqlx::query(
                "INSERT INTO story_frames (story_id, position, media_ref, caption, overlay) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(story.id)
            .bind(position as i32)
            .bind(&frame.media_ref)
            .bind(&frame.caption)
            .bind(&frame.overlay)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_story(&self, id: Uuid) -> AppResult<Option<Story>> {
        let row = sqlx::query(
            "SELECT id, author_id, expires_at, is_active, created_at \
             FROM stories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };
        let frames = self.load_frames(id).await?;
        Ok(Some(Story {
            id: row.get("id"),
            author_id: row.get("author_id"),
            frames,
            expires_at: row.get("expires_at"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }))
    }

    async fn append_story_frame(&self, story_id: Uuid, frame: StoryFrame) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO story_frames (story_id, position, media_ref, caption, overlay) \
             SELECT $1, COALESCE(MAX(position) + 1, 0), $2, $3, $4 \
             FROM story_frames WHERE story_id = $1",
        )
        .bind(story_id)
        .bind(&frame.media_ref)
        .bind(&frame.caption)
        .bind(&frame.overlay)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn deactivate_story(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE stories SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn deactivate_expired_stories(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE stories SET is_active = FALSE \
             WHERE is_active = TRUE AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn record_story_view(
        &self,
        story_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO story_views (story_id, viewer_id, viewed_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (story_id, viewer_id) DO NOTHING",
        )
        .bind(story_id)
        .bind(viewer_id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_story_viewed(&self, story_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        let exists: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM story_views WHERE story_id = $1 AND viewer_id = $2",
        )
        .bind(story_id)
        .bind(viewer_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(exists.is_some())
    }

    async fn count_story_views(&self, story_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM story_views WHERE story_id = $1",
        )
        .bind(story_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }
}
