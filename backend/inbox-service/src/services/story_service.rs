use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::gateway::SessionRegistry;
use crate::models::{NotificationKind, Story, StoryFrame, SubjectRef};
use crate::store::EntityStore;

use super::notification_service::{CreateNotificationRequest, NotificationService};

pub struct StoryService;

impl StoryService {
    /// Create a story from its first frame. Expiry is fixed at creation
    /// time plus the configured TTL.
    pub async fn publish(
        store: &dyn EntityStore,
        author_id: Uuid,
        frame: StoryFrame,
        ttl: chrono::Duration,
    ) -> AppResult<Story> {
        let story = Story::new(author_id, frame, ttl, Utc::now());
        store.insert_story(&story).await?;
        tracing::debug!(story_id = %story.id, author_id = %author_id, "story published");
        Ok(story)
    }

    /// Append a frame. Author-only; a story that is inactive or past expiry
    /// no longer accepts frames.
    pub async fn add_frame(
        store: &dyn EntityStore,
        story_id: Uuid,
        author_id: Uuid,
        frame: StoryFrame,
    ) -> AppResult<()> {
        let story = Self::get_live(store, story_id).await?;
        if story.author_id != author_id {
            return Err(AppError::NotAuthorized);
        }
        store.append_story_frame(story_id, frame).await
    }

    /// Record a view. Set semantics on the viewer id: the first call
    /// returns `true`, every repeat is a no-op returning `false`, and
    /// concurrent repeats cannot produce duplicate records. A first view by
    /// a non-author feeds the notification deduplicator, so rapid
    /// re-viewers collapse into one story_view notification.
    pub async fn record_view(
        store: &dyn EntityStore,
        gateway: &SessionRegistry,
        story_id: Uuid,
        viewer_id: Uuid,
        dedup_window: chrono::Duration,
    ) -> AppResult<bool> {
        let story = Self::get_live(store, story_id).await?;

        let is_new_view = store
            .record_story_view(story_id, viewer_id, Utc::now())
            .await?;

        if is_new_view && viewer_id != story.author_id {
            NotificationService::create(
                store,
                gateway,
                CreateNotificationRequest {
                    recipient_id: story.author_id,
                    actor_id: viewer_id,
                    kind: NotificationKind::StoryView,
                    subject: Some(SubjectRef::Story(story_id)),
                    body: "viewed your story".into(),
                },
                dedup_window,
            )
            .await?;
        }

        Ok(is_new_view)
    }

    pub async fn is_viewed_by(
        store: &dyn EntityStore,
        story_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<bool> {
        store.is_story_viewed(story_id, viewer_id).await
    }

    /// Deactivate every still-active story past its expiry. Re-entrant and
    /// re-runnable: any number of runs over the same data converges to the
    /// same end state, and nothing is ever deleted.
    pub async fn sweep_expired(store: &dyn EntityStore) -> AppResult<u64> {
        let swept = store.deactivate_expired_stories(Utc::now()).await?;
        if swept > 0 {
            crate::metrics::record_stories_swept(swept);
            tracing::info!(swept, "deactivated expired stories");
        }
        Ok(swept)
    }

    /// Loads a story and enforces visibility: active and before expiry.
    /// A story found expired on access is deactivated on the spot (the
    /// lazy half of the expiry lifecycle; the sweep is the eager half).
    async fn get_live(store: &dyn EntityStore, story_id: Uuid) -> AppResult<Story> {
        let story = store.get_story(story_id).await?.ok_or(AppError::NotFound)?;
        if !story.is_active {
            return Err(AppError::Expired);
        }
        if story.is_expired(Utc::now()) {
            store.deactivate_story(story_id).await?;
            return Err(AppError::Expired);
        }
        Ok(story)
    }
}
