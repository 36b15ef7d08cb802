use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Media message variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "file" => Some(MediaKind::File),
            _ => None,
        }
    }
}

/// Tagged message payload.
///
/// Text carries content, media carries a storage reference; the constructors
/// reject the missing-field combinations so an invalid payload cannot exist
/// past the request boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text { content: String },
    Media { kind: MediaKind, media_ref: String },
}

impl MessageBody {
    pub fn text(content: impl Into<String>) -> AppResult<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "text messages require non-empty content".into(),
            ));
        }
        Ok(MessageBody::Text { content })
    }

    pub fn media(kind: MediaKind, media_ref: impl Into<String>) -> AppResult<Self> {
        let media_ref = media_ref.into();
        if media_ref.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "{} messages require a media reference",
                kind.as_str()
            )));
        }
        Ok(MessageBody::Media { kind, media_ref })
    }

    /// Builds a body from the loose wire fields of a send request.
    pub fn from_parts(
        message_type: &str,
        content: Option<String>,
        media_ref: Option<String>,
    ) -> AppResult<Self> {
        match message_type {
            "text" => Self::text(content.unwrap_or_default()),
            other => match MediaKind::parse(other) {
                Some(kind) => Self::media(kind, media_ref.unwrap_or_default()),
                None => Err(AppError::Validation(format!(
                    "unknown message type: {other}"
                ))),
            },
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            MessageBody::Text { .. } => "text",
            MessageBody::Media { kind, .. } => kind.as_str(),
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            MessageBody::Text { content } => Some(content),
            MessageBody::Media { .. } => None,
        }
    }

    pub fn media_ref(&self) -> Option<&str> {
        match self {
            MessageBody::Text { .. } => None,
            MessageBody::Media { media_ref, .. } => Some(media_ref),
        }
    }
}

/// A single message inside a conversation.
///
/// Read state only moves forward: `read_at` is set exactly when `is_read`
/// flips to true and never reverts. Content is immutable after creation.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub body: MessageBody,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(
        conversation_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: MessageBody,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            receiver_id,
            body,
            is_read: false,
            read_at: None,
            created_at: now,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            message_type: m.body.kind_str().to_string(),
            content: m.body.content().map(str::to_string),
            media_ref: m.body.media_ref().map(str::to_string),
            is_read: m.is_read,
            read_at: m.read_at,
            created_at: m.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_body_requires_content() {
        assert!(MessageBody::text("hello").is_ok());
        assert!(matches!(
            MessageBody::text(""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            MessageBody::text("   "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn media_body_requires_reference() {
        assert!(MessageBody::media(MediaKind::Image, "media/abc123").is_ok());
        assert!(matches!(
            MessageBody::media(MediaKind::Video, ""),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn from_parts_dispatches_on_type() {
        let text = MessageBody::from_parts("text", Some("hi".into()), None).unwrap();
        assert_eq!(text.kind_str(), "text");
        assert_eq!(text.content(), Some("hi"));

        let audio =
            MessageBody::from_parts("audio", None, Some("media/a1".into())).unwrap();
        assert_eq!(audio.kind_str(), "audio");
        assert_eq!(audio.media_ref(), Some("media/a1"));

        assert!(matches!(
            MessageBody::from_parts("sticker", None, None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            MessageBody::from_parts("image", Some("ignored".into()), None),
            Err(AppError::Validation(_))
        ));
    }
}
