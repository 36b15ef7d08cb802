//! Notification deduplicator flows: self-suppression, trailing-window
//! collapse, window expiry, read transitions, and unread aggregates.

mod common;

use std::time::Duration;

use common::setup;
use inbox_service::error::AppError;
use inbox_service::models::{NotificationKind, SubjectRef};
use inbox_service::services::notification_service::{
    CreateNotificationRequest, NotificationService,
};
use uuid::Uuid;

fn like_request(recipient: Uuid, actor: Uuid, post: Uuid) -> CreateNotificationRequest {
    CreateNotificationRequest {
        recipient_id: recipient,
        actor_id: actor,
        kind: NotificationKind::Like,
        subject: Some(SubjectRef::Post(post)),
        body: "liked your post".into(),
    }
}

fn hour() -> chrono::Duration {
    chrono::Duration::hours(1)
}

#[tokio::test]
async fn identical_creates_collapse_within_the_window() {
    let (store, gateway) = setup();
    let recipient = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let post = Uuid::new_v4();

    let first = NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(recipient, actor, post),
        hour(),
    )
    .await
    .unwrap()
    .expect("stored");

    let second = NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(recipient, actor, post),
        hour(),
    )
    .await
    .unwrap()
    .expect("resolved to existing record");

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at, "no timestamp bump");

    let stored = NotificationService::list(store.as_ref(), recipient, 50, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn different_subjects_do_not_collapse() {
    let (store, gateway) = setup();
    let recipient = Uuid::new_v4();
    let actor = Uuid::new_v4();

    for _ in 0..2 {
        NotificationService::create(
            store.as_ref(),
            &gateway,
            like_request(recipient, actor, Uuid::new_v4()),
            hour(),
        )
        .await
        .unwrap();
    }

    let stored = NotificationService::list(store.as_ref(), recipient, 50, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn a_new_record_is_stored_once_the_window_elapses() {
    let (store, gateway) = setup();
    let recipient = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let post = Uuid::new_v4();
    let window = chrono::Duration::milliseconds(50);

    let first = NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(recipient, actor, post),
        window,
    )
    .await
    .unwrap()
    .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    let second = NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(recipient, actor, post),
        window,
    )
    .await
    .unwrap()
    .unwrap();

    assert_ne!(first.id, second.id);
    let stored = NotificationService::list(store.as_ref(), recipient, 50, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn self_notifications_are_never_stored() {
    let (store, gateway) = setup();
    let user = Uuid::new_v4();

    let created = NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(user, user, Uuid::new_v4()),
        hour(),
    )
    .await
    .unwrap();
    assert!(created.is_none());

    assert_eq!(
        NotificationService::unread_count(store.as_ref(), user)
            .await
            .unwrap(),
        0
    );
    assert!(NotificationService::list(store.as_ref(), user, 50, 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn read_transition_is_recipient_only_and_idempotent() {
    let (store, gateway) = setup();
    let recipient = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let notification = NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(recipient, actor, Uuid::new_v4()),
        hour(),
    )
    .await
    .unwrap()
    .unwrap();

    let err = NotificationService::mark_read(store.as_ref(), notification.id, actor)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotAuthorized));

    let first = NotificationService::mark_read(store.as_ref(), notification.id, recipient)
        .await
        .unwrap();
    assert!(!first.was_already_read);
    let read_at = first.read_at.unwrap();

    let second = NotificationService::mark_read(store.as_ref(), notification.id, recipient)
        .await
        .unwrap();
    assert!(second.was_already_read);
    assert_eq!(second.read_at, Some(read_at));
}

#[tokio::test]
async fn mark_all_read_reports_actual_transitions() {
    let (store, gateway) = setup();
    let recipient = Uuid::new_v4();
    let actor = Uuid::new_v4();

    for kind in [NotificationKind::Follow, NotificationKind::Mention] {
        NotificationService::create(
            store.as_ref(),
            &gateway,
            CreateNotificationRequest {
                recipient_id: recipient,
                actor_id: actor,
                kind,
                subject: None,
                body: kind.as_str().to_string(),
            },
            hour(),
        )
        .await
        .unwrap();
    }
    assert_eq!(
        NotificationService::unread_count(store.as_ref(), recipient)
            .await
            .unwrap(),
        2
    );

    let flipped = NotificationService::mark_all_read(store.as_ref(), recipient)
        .await
        .unwrap();
    assert_eq!(flipped, 2);
    assert_eq!(
        NotificationService::unread_count(store.as_ref(), recipient)
            .await
            .unwrap(),
        0
    );

    // Re-running is valid and flips nothing.
    let flipped = NotificationService::mark_all_read(store.as_ref(), recipient)
        .await
        .unwrap();
    assert_eq!(flipped, 0);
}

#[tokio::test]
async fn created_notifications_are_pushed_but_duplicates_are_not() {
    let (store, gateway) = setup();
    let recipient = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let post = Uuid::new_v4();

    let (_session, mut rx) = gateway.register(recipient).await;

    let stored = NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(recipient, actor, post),
        hour(),
    )
    .await
    .unwrap()
    .unwrap();

    let payload = rx.recv().await.expect("push for the stored record");
    let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed["type"], "notification.created");
    assert_eq!(parsed["notification"]["id"], stored.id.to_string());
    assert_eq!(parsed["notification"]["kind"], "like");

    // The collapsed repeat produces no second push.
    NotificationService::create(
        store.as_ref(),
        &gateway,
        like_request(recipient, actor, post),
        hour(),
    )
    .await
    .unwrap();
    assert!(rx.try_recv().is_err());
}
