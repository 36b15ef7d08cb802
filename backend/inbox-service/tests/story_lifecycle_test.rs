//! Story flows: idempotent view recording, view notifications through the
//! deduplicator, frame appends, lazy expiry, and the sweep.

mod common;

use std::time::Duration;

use common::{frame, setup};
use inbox_service::error::AppError;
use inbox_service::services::notification_service::NotificationService;
use inbox_service::services::story_service::StoryService;
use inbox_service::store::StoryStore;
use uuid::Uuid;

fn day() -> chrono::Duration {
    chrono::Duration::hours(24)
}

fn hour() -> chrono::Duration {
    chrono::Duration::hours(1)
}

#[tokio::test]
async fn repeat_views_record_exactly_once() {
    let (store, gateway) = setup();
    let author = Uuid::new_v4();
    let viewer = Uuid::new_v4();

    let story = StoryService::publish(store.as_ref(), author, frame("media/f0"), day())
        .await
        .unwrap();

    assert!(
        !StoryService::is_viewed_by(store.as_ref(), story.id, viewer)
            .await
            .unwrap()
    );

    let first = StoryService::record_view(store.as_ref(), &gateway, story.id, viewer, hour())
        .await
        .unwrap();
    assert!(first, "first view is new");

    for _ in 0..3 {
        let repeat =
            StoryService::record_view(store.as_ref(), &gateway, story.id, viewer, hour())
                .await
                .unwrap();
        assert!(!repeat, "repeat views are no-ops");
    }

    assert!(
        StoryService::is_viewed_by(store.as_ref(), story.id, viewer)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn concurrent_views_by_one_viewer_yield_one_record() {
    let (store, gateway) = setup();
    let author = Uuid::new_v4();
    let viewer = Uuid::new_v4();

    let story = StoryService::publish(store.as_ref(), author, frame("media/f0"), day())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            StoryService::record_view(store.as_ref(), &gateway, story.id, viewer, hour())
                .await
                .unwrap()
        }));
    }

    let mut new_views = 0;
    for handle in handles {
        if handle.await.unwrap() {
            new_views += 1;
        }
    }
    assert_eq!(new_views, 1, "exactly one call observes a new view");
}

#[tokio::test]
async fn first_views_notify_the_author_through_the_deduplicator() {
    let (store, gateway) = setup();
    let author = Uuid::new_v4();
    let viewer = Uuid::new_v4();

    let story = StoryService::publish(store.as_ref(), author, frame("media/f0"), day())
        .await
        .unwrap();

    // The author's own view never notifies.
    let own = StoryService::record_view(store.as_ref(), &gateway, story.id, author, hour())
        .await
        .unwrap();
    assert!(own);
    assert_eq!(
        NotificationService::unread_count(store.as_ref(), author)
            .await
            .unwrap(),
        0
    );

    // A viewer's first view notifies once; repeats collapse.
    StoryService::record_view(store.as_ref(), &gateway, story.id, viewer, hour())
        .await
        .unwrap();
    StoryService::record_view(store.as_ref(), &gateway, story.id, viewer, hour())
        .await
        .unwrap();
    assert_eq!(
        NotificationService::unread_count(store.as_ref(), author)
            .await
            .unwrap(),
        1
    );

    let stored = NotificationService::list(store.as_ref(), author, 50, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].actor_id, viewer);
    assert_eq!(stored[0].kind.as_str(), "story_view");

    // A second distinct viewer produces a second notification.
    let other_viewer = Uuid::new_v4();
    StoryService::record_view(store.as_ref(), &gateway, story.id, other_viewer, hour())
        .await
        .unwrap();
    assert_eq!(
        NotificationService::unread_count(store.as_ref(), author)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn frames_append_for_the_author_only() {
    let (store, _gateway) = setup();
    let author = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let story = StoryService::publish(store.as_ref(), author, frame("media/f0"), day())
        .await
        .unwrap();
    assert_eq!(story.frames.len(), 1);

    let err = StoryService::add_frame(store.as_ref(), story.id, stranger, frame("media/f1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotAuthorized));

    StoryService::add_frame(store.as_ref(), story.id, author, frame("media/f1"))
        .await
        .unwrap();

    let reloaded = store
        .get_story(story.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.frames.len(), 2);
    assert_eq!(reloaded.frames[1].media_ref, "media/f1");
}

#[tokio::test]
async fn views_succeed_up_to_expiry_and_fail_after() {
    let (store, gateway) = setup();
    let author = Uuid::new_v4();
    let ttl = chrono::Duration::milliseconds(80);

    let story = StoryService::publish(store.as_ref(), author, frame("media/f0"), ttl)
        .await
        .unwrap();

    // Before expiry a view lands.
    let early_viewer = Uuid::new_v4();
    assert!(
        StoryService::record_view(store.as_ref(), &gateway, story.id, early_viewer, hour())
            .await
            .unwrap()
    );

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Past expiry the view fails and the story is lazily deactivated.
    let late_viewer = Uuid::new_v4();
    let err =
        StoryService::record_view(store.as_ref(), &gateway, story.id, late_viewer, hour())
            .await
            .unwrap_err();
    assert!(matches!(err, AppError::Expired));

    let stored = store
        .get_story(story.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_active, "lazy expiry deactivates on access");

    // Appending frames is equally refused.
    let err = StoryService::add_frame(store.as_ref(), story.id, author, frame("media/f1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Expired));
}

#[tokio::test]
async fn sweep_deactivates_expired_stories_and_converges() {
    let (store, gateway) = setup();
    let author = Uuid::new_v4();

    let short = StoryService::publish(
        store.as_ref(),
        author,
        frame("media/short"),
        chrono::Duration::milliseconds(60),
    )
    .await
    .unwrap();
    let long = StoryService::publish(store.as_ref(), author, frame("media/long"), day())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    // First sweep flips exactly the expired story.
    assert_eq!(StoryService::sweep_expired(store.as_ref()).await.unwrap(), 1);
    // Re-running converges: nothing left to flip.
    assert_eq!(StoryService::sweep_expired(store.as_ref()).await.unwrap(), 0);

    let swept = store
        .get_story(short.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!swept.is_active);
    assert_eq!(swept.frames.len(), 1, "sweep deactivates, never deletes");

    // The live story is untouched and still viewable.
    let viewer = Uuid::new_v4();
    assert!(
        StoryService::record_view(store.as_ref(), &gateway, long.id, viewer, hour())
            .await
            .unwrap()
    );

    // A view on the swept story reports the expiry.
    let err = StoryService::record_view(store.as_ref(), &gateway, short.id, viewer, hour())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Expired));
}
