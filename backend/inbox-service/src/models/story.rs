use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One frame of a story: a media reference plus optional caption/overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryFrame {
    pub media_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
}

/// Time-bounded content container. Visible only while active and before
/// `expires_at`; the sweep (or lazy access) deactivates it, never deletes.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: Uuid,
    pub author_id: Uuid,
    pub frames: Vec<StoryFrame>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Story {
    pub fn new(
        author_id: Uuid,
        first_frame: StoryFrame,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            frames: vec![first_frame],
            expires_at: now + ttl,
            is_active: true,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryDto {
    pub id: Uuid,
    pub author_id: Uuid,
    pub frames: Vec<StoryFrame>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub view_count: i64,
}

impl StoryDto {
    pub fn from_story(story: &Story, view_count: i64) -> Self {
        Self {
            id: story.id,
            author_id: story.author_id,
            frames: story.frames.clone(),
            expires_at: story.expires_at,
            is_active: story.is_active,
            created_at: story.created_at,
            view_count,
        }
    }
}
