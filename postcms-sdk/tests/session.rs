mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpmock::prelude::*;
use postcms::{CmsEvent, EventKind, FileTokenStore, NewUser, PostCms, TokenStore};
use serde_json::json;

use common::{client, signed_in_client, user_json};

fn record_updates(cms: &PostCms) -> Arc<Mutex<Vec<Option<String>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    cms.on(EventKind::SessionUpdate, move |event| {
        let CmsEvent::SessionUpdate(session) = event;
        sink.lock()
            .unwrap()
            .push(session.as_ref().map(|s| s.user.id.clone()));
    });
    seen
}

#[tokio::test]
async fn login_persists_token_and_sends_it_afterwards() {
    let server = MockServer::start_async().await;
    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/login")
                .body_contains("name=\"id\"")
                .body_contains("alice")
                .body_contains("name=\"password\"");
            then.status(200)
                .json_body(json!({ "token": "tok-1", "user": user_json("u1") }));
        })
        .await;
    let posts = server
        .mock_async(|when, then| {
            when.method(GET).path("/news").header("x-session", "tok-1");
            then.status(200).json_body(json!({ "posts": [] }));
        })
        .await;

    let (cms, store) = client(&server);
    let seen = record_updates(&cms);

    let session = cms.login("alice", "s3cret").await.unwrap();
    assert_eq!(session.user.id, "u1");
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-1"));
    assert_eq!(cms.session(), Some(session));

    let listed = cms.bucket("news").get_posts(None, None).await.unwrap();
    assert!(listed.is_empty());

    login.assert_async().await;
    posts.assert_async().await;
    assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string())]);
}

#[tokio::test]
async fn rejected_login_leaves_session_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/login");
            then.status(200).json_body(json!({
                "error": { "status": 403, "message": "wrong password" }
            }));
        })
        .await;

    let (cms, store) = client(&server);
    let seen = record_updates(&cms);

    let err = cms.login("alice", "nope").await.unwrap_err();
    let api = err.api().expect("api error");
    assert_eq!(api.status, 403);
    assert_eq!(api.message, "wrong password");

    assert!(cms.session().is_none());
    assert_eq!(store.load().unwrap(), None);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_user_signs_in() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/create-user")
                .body_contains("bob@example.org")
                .body_contains(r#"{"nick":"bob"}"#);
            then.status(200)
                .json_body(json!({ "token": "tok-new", "user": user_json("u2") }));
        })
        .await;

    let (cms, store) = client(&server);
    let seen = record_updates(&cms);

    let mut profile = serde_json::Map::new();
    profile.insert("nick".into(), json!("bob"));
    let user = cms
        .create_user(&NewUser {
            password: "s3cret".into(),
            email: Some("bob@example.org".into()),
            profile: Some(profile),
            ..Default::default()
        })
        .await
        .unwrap();

    create.assert_async().await;
    assert_eq!(user.id, "u2");
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-new"));
    assert_eq!(*seen.lock().unwrap(), vec![Some("u2".to_string())]);
}

#[tokio::test]
async fn verify_accepts_and_rotates_token() {
    let server = MockServer::start_async().await;
    let check = server
        .mock_async(|when, then| {
            when.method(GET).path("/session").header("x-session", "tok-old");
            then.status(200)
                .json_body(json!({ "token": "tok-rotated", "user": user_json("u1") }));
        })
        .await;

    let (cms, store) = signed_in_client(&server, "tok-old");
    let seen = record_updates(&cms);

    let session = cms.verify_session().await.unwrap().expect("still signed in");
    check.assert_async().await;
    assert_eq!(session.user.id, "u1");
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-rotated"));
    assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string())]);
}

#[tokio::test]
async fn verify_unauthorized_clears_session() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/session");
            then.status(401).json_body(json!({
                "error": { "status": 401, "message": "session expired" }
            }));
        })
        .await;

    let (cms, store) = signed_in_client(&server, "tok-old");
    let seen = record_updates(&cms);

    assert_eq!(cms.verify_session().await.unwrap(), None);
    assert_eq!(store.load().unwrap(), None);
    assert!(cms.session().is_none());
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn verify_other_failures_keep_session() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/session");
            then.status(500).body("upstream down");
        })
        .await;

    let (cms, store) = signed_in_client(&server, "tok-old");
    let seen = record_updates(&cms);

    let err = cms.verify_session().await.unwrap_err();
    assert!(matches!(
        err,
        postcms::Error::Request(postcms::RequestError::Server { .. })
    ));
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-old"));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn token_survives_restart_with_file_store() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/login");
            then.status(200)
                .json_body(json!({ "token": "tok-disk", "user": user_json("u1") }));
        })
        .await;
    let check = server
        .mock_async(|when, then| {
            when.method(GET).path("/session").header("x-session", "tok-disk");
            then.status(200)
                .json_body(json!({ "token": "tok-disk", "user": user_json("u1") }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let build = || {
        PostCms::builder("acme")
            .base_url(server.base_url())
            .token_store(FileTokenStore::in_dir(dir.path()))
            .build()
            .unwrap()
    };

    build().login("alice", "s3cret").await.unwrap();

    let restarted = build();
    assert!(restarted.session().is_none());
    let session = restarted.verify_session().await.unwrap();
    assert_eq!(session.map(|s| s.user.id), Some("u1".to_string()));
    check.assert_async().await;
}

#[tokio::test]
async fn logout_is_local_and_notifies() {
    let server = MockServer::start_async().await;
    let (cms, store) = signed_in_client(&server, "tok-1");
    let seen = record_updates(&cms);

    cms.logout().unwrap();

    assert_eq!(store.load().unwrap(), None);
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn removed_listeners_are_not_called() {
    let server = MockServer::start_async().await;
    let (cms, _store) = signed_in_client(&server, "tok-1");

    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let id = cms.on(EventKind::SessionUpdate, move |_| {
        *counter.lock().unwrap() += 1;
    });

    cms.logout().unwrap();
    assert!(cms.off(EventKind::SessionUpdate, Some(id)));
    cms.logout().unwrap();

    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn logout_during_verification_wins() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/session");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({ "token": "tok-1", "user": user_json("u1") }));
        })
        .await;

    let (cms, store) = signed_in_client(&server, "tok-1");
    let seen = record_updates(&cms);

    let checking = cms.clone();
    let check = tokio::spawn(async move { checking.verify_session().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    cms.logout().unwrap();

    let verified = check.await.unwrap().unwrap();
    assert_eq!(verified, None);
    assert_eq!(store.load().unwrap(), None);
    assert!(cms.session().is_none());
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn login_during_verification_is_not_cleared_by_stale_401() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/session");
            then.status(401)
                .delay(Duration::from_millis(300))
                .json_body(json!({ "error": { "status": 401, "message": "expired" } }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/login");
            then.status(200)
                .json_body(json!({ "token": "tok-new", "user": user_json("u2") }));
        })
        .await;

    let (cms, store) = signed_in_client(&server, "tok-old");

    let checking = cms.clone();
    let check = tokio::spawn(async move { checking.verify_session().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    cms.login("bob", "s3cret").await.unwrap();

    let verified = check.await.unwrap().unwrap();
    assert_eq!(verified.map(|s| s.user.id), Some("u2".to_string()));
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-new"));
}

#[tokio::test]
async fn bare_http_401_clears_session() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/session");
            then.status(401).body("Unauthorized");
        })
        .await;

    let (cms, store) = signed_in_client(&server, "tok-1");
    let seen = record_updates(&cms);

    assert_eq!(cms.verify_session().await.unwrap(), None);
    assert_eq!(store.load().unwrap(), None);
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}
