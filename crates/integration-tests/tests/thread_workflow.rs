//! Thread + original post atomicity, including the rollback paths.

use axum::http::StatusCode;
use domains::{
    CreationPhase, NewPost, NewThread, StoreError, ThreadCreationError, ThreadRepository,
};
use integration_tests::{Faults, TestApp};
use serde_json::json;
use services::CreateThread;

fn hello(app: &TestApp) -> serde_json::Value {
    json!({
        "title": "Hello",
        "content": "World",
        "userId": app.user.id,
        "categoryId": app.category.id,
    })
}

#[tokio::test]
async fn committed_thread_has_exactly_one_original_post() {
    let app = TestApp::spawn().await;
    let (status, body) = app.post_json("/api/threads", hello(&app)).await;
    assert_eq!(status, StatusCode::CREATED);

    let thread_id = body["threadId"].as_i64().unwrap();
    let posts = app.store.posts_for(thread_id);
    assert_eq!(posts.len(), 1);
    assert!(posts[0].is_original_post);
    assert_eq!(posts[0].content, "World");
    assert_eq!(posts[0].user_id, app.user.id);
}

#[tokio::test]
async fn post_failure_rolls_back_thread() {
    let app = TestApp::spawn().await;
    Faults::set(&app.threads.faults.fail_post_insert);

    let (status, body) = app.post_json("/api/threads", hello(&app)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to create original post.");
    assert_eq!(body["phase"], "post");
    assert_eq!(body["compensated"], true);

    assert_eq!(app.store.thread_count(), 0);
    assert_eq!(app.store.post_count(), 0);
    let (_, listing) = app.get("/api/threads").await;
    assert_eq!(listing, json!([]));
}

#[tokio::test]
async fn failed_rollback_is_reported_not_hidden() {
    let app = TestApp::spawn().await;
    Faults::set(&app.threads.faults.fail_post_insert);
    Faults::set(&app.threads.faults.fail_thread_delete);

    let (status, body) = app.post_json("/api/threads", hello(&app)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["phase"], "post");
    assert_eq!(body["compensated"], false);

    // The orphan is still there for an operator to remove, but readers
    // never see it.
    assert_eq!(app.store.thread_count(), 1);
    assert_eq!(app.store.post_count(), 0);
    let (status, listing) = app.get("/api/threads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing, json!([]));
}

#[tokio::test]
async fn late_thread_acknowledgement_still_gets_its_post() {
    let app = TestApp::spawn().await;
    Faults::set(&app.threads.faults.slow_thread_ack);

    let created = tokio_test::assert_ok!(
        app.thread_service
            .create_thread(CreateThread {
                title: Some("Hello".into()),
                content: Some("World".into()),
                user_id: Some(app.user.id),
                category_id: Some(app.category.id),
            })
            .await
    );

    assert_eq!(app.store.thread_count(), 1);
    let posts = app.store.posts_for(created.thread_id());
    assert_eq!(posts.len(), 1);
    assert!(posts[0].is_original_post);
}

#[tokio::test]
async fn listing_hides_thread_until_original_post_exists() {
    let app = TestApp::spawn().await;
    let thread = app
        .store
        .insert_thread(NewThread {
            title: "In flight".into(),
            user_id: app.user.id,
            category_id: app.category.id,
        })
        .await
        .unwrap();

    let (_, listing) = app.get("/api/threads").await;
    assert_eq!(listing, json!([]));

    app.store
        .insert_post(NewPost {
            thread_id: thread.id,
            user_id: app.user.id,
            content: "First".into(),
            is_original_post: true,
        })
        .await
        .unwrap();
    let (_, listing) = app.get("/api/threads").await;
    assert_eq!(listing[0]["id"], thread.id);
}

#[tokio::test]
async fn stalled_post_insert_times_out_and_rolls_back() {
    let app = TestApp::spawn().await;
    Faults::set(&app.threads.faults.stall_post_insert);

    let err = app
        .thread_service
        .create_thread(CreateThread {
            title: Some("Hello".into()),
            content: Some("World".into()),
            user_id: Some(app.user.id),
            category_id: Some(app.category.id),
        })
        .await
        .unwrap_err();

    match err {
        ThreadCreationError::PostInsert {
            compensated,
            source,
            ..
        } => {
            assert!(compensated);
            assert_eq!(source, StoreError::Timeout("insert_post"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(app.store.thread_count(), 0);
}

#[tokio::test]
async fn thread_insert_failure_never_attempts_post() {
    let app = TestApp::spawn().await;
    Faults::set(&app.threads.faults.fail_thread_insert);

    let err = app
        .thread_service
        .create_thread(CreateThread {
            title: Some("Hello".into()),
            content: Some("World".into()),
            user_id: Some(app.user.id),
            category_id: Some(app.category.id),
        })
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(CreationPhase::Thread));
    assert_eq!(app.store.post_count(), 0);
}

#[tokio::test]
async fn concurrent_creations_each_get_their_own_post() {
    let app = TestApp::spawn().await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = app.thread_service.clone();
            let (user_id, category_id) = (app.user.id, app.category.id);
            tokio::spawn(async move {
                service
                    .create_thread(CreateThread {
                        title: Some(format!("thread {i}")),
                        content: Some(format!("post {i}")),
                        user_id: Some(user_id),
                        category_id: Some(category_id),
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        let created = tokio_test::assert_ok!(handle.await.unwrap());
        let posts = app.store.posts_for(created.thread_id());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].thread_id, created.thread_id());
    }
    assert_eq!(app.store.thread_count(), 16);
}
