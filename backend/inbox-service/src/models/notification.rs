use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// User liked a post
    Like,
    /// User commented on a post
    Comment,
    /// User started following
    Follow,
    /// User mentioned in a post/comment
    Mention,
    /// User viewed a story
    StoryView,
    /// User dueted a post
    Duet,
    /// Direct message notification
    Message,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Mention => "mention",
            NotificationKind::StoryView => "story_view",
            NotificationKind::Duet => "duet",
            NotificationKind::Message => "message",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(NotificationKind::Like),
            "comment" => Some(NotificationKind::Comment),
            "follow" => Some(NotificationKind::Follow),
            "mention" => Some(NotificationKind::Mention),
            "story_view" => Some(NotificationKind::StoryView),
            "duet" => Some(NotificationKind::Duet),
            "message" => Some(NotificationKind::Message),
            _ => None,
        }
    }
}

/// Reference to the entity a notification is about. At most one is ever
/// populated, which the tagged representation guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "subject_type", content = "subject_id", rename_all = "snake_case")]
pub enum SubjectRef {
    Post(Uuid),
    Story(Uuid),
    Comment(Uuid),
    Duet(Uuid),
    Message(Uuid),
}

impl SubjectRef {
    pub fn subject_type(&self) -> &'static str {
        match self {
            SubjectRef::Post(_) => "post",
            SubjectRef::Story(_) => "story",
            SubjectRef::Comment(_) => "comment",
            SubjectRef::Duet(_) => "duet",
            SubjectRef::Message(_) => "message",
        }
    }

    pub fn subject_id(&self) -> Uuid {
        match self {
            SubjectRef::Post(id)
            | SubjectRef::Story(id)
            | SubjectRef::Comment(id)
            | SubjectRef::Duet(id)
            | SubjectRef::Message(id) => *id,
        }
    }

    pub fn from_parts(subject_type: &str, subject_id: Uuid) -> Option<Self> {
        match subject_type {
            "post" => Some(SubjectRef::Post(subject_id)),
            "story" => Some(SubjectRef::Story(subject_id)),
            "comment" => Some(SubjectRef::Comment(subject_id)),
            "duet" => Some(SubjectRef::Duet(subject_id)),
            "message" => Some(SubjectRef::Message(subject_id)),
            _ => None,
        }
    }
}

/// Core notification model
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient user ID
    pub recipient_id: Uuid,

    /// User whose action produced the notification
    pub actor_id: Uuid,

    pub kind: NotificationKind,

    /// Entity the notification points at, if any
    pub subject: Option<SubjectRef>,

    /// Display text
    pub body: String,

    /// Fingerprint used for the indexed dedup lookup. Internal, never
    /// serialized to clients.
    pub dedup_key: String,

    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        subject: Option<SubjectRef>,
        body: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            actor_id,
            kind,
            subject,
            body,
            dedup_key: Self::fingerprint(recipient_id, actor_id, kind, subject),
            is_read: false,
            read_at: None,
            created_at: now,
        }
    }

    /// Dedup fingerprint: `kind:recipient:actor:subject_type:subject_id`.
    /// One indexed equality lookup replaces a multi-column range scan.
    pub fn fingerprint(
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        subject: Option<SubjectRef>,
    ) -> String {
        let (subject_type, subject_id) = match subject {
            Some(s) => (s.subject_type(), s.subject_id().to_string()),
            None => ("none", "none".to_string()),
        };
        format!(
            "{}:{}:{}:{}:{}",
            kind.as_str(),
            recipient_id,
            actor_id,
            subject_type,
            subject_id
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationDto {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    #[serde(flatten)]
    pub subject: Option<SubjectRef>,
    pub body: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationDto {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            recipient_id: n.recipient_id,
            actor_id: n.actor_id,
            kind: n.kind,
            subject: n.subject,
            body: n.body.clone(),
            is_read: n.is_read,
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            NotificationKind::Like,
            NotificationKind::Comment,
            NotificationKind::Follow,
            NotificationKind::Mention,
            NotificationKind::StoryView,
            NotificationKind::Duet,
            NotificationKind::Message,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse("poke"), None);
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishes_subjects() {
        let target = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let post = Uuid::new_v4();

        let a = Notification::fingerprint(
            target,
            actor,
            NotificationKind::Like,
            Some(SubjectRef::Post(post)),
        );
        let b = Notification::fingerprint(
            target,
            actor,
            NotificationKind::Like,
            Some(SubjectRef::Post(post)),
        );
        assert_eq!(a, b);

        let other_post = Notification::fingerprint(
            target,
            actor,
            NotificationKind::Like,
            Some(SubjectRef::Post(Uuid::new_v4())),
        );
        assert_ne!(a, other_post);

        let follow =
            Notification::fingerprint(target, actor, NotificationKind::Follow, None);
        assert_ne!(a, follow);
    }

    #[test]
    fn dto_does_not_leak_dedup_key() {
        let n = Notification::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NotificationKind::Comment,
            Some(SubjectRef::Comment(Uuid::new_v4())),
            "commented on your post".into(),
            Utc::now(),
        );
        let json = serde_json::to_value(NotificationDto::from(&n)).unwrap();
        assert!(json.get("dedup_key").is_none());
        assert_eq!(json["kind"], "comment");
        assert_eq!(json["subject_type"], "comment");
    }
}
