mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use httpmock::prelude::*;
use postcms::{FetchController, FileUpload};
use serde_json::json;

use common::signed_in_client;

fn object_json() -> serde_json::Value {
    json!({
        "object": {
            "id": "o1",
            "hashname": "ab12cd",
            "owner": "u1",
            "crtime": 1_700_000_000,
            "meta": { "name": "cover.png", "size": 200_000 }
        }
    })
}

#[tokio::test]
async fn upload_reports_progress_until_complete() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload-file")
                .header("x-session", "tok-1")
                .body_contains("name=\"file\"; filename=\"cover.png\"")
                .body_contains("name=\"path\"\r\n\r\n/covers");
            then.status(200).json_body(object_json());
        })
        .await;

    let (cms, _store) = signed_in_client(&server, "tok-1");
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let fc = FetchController::new().on_progress(move |loaded, total| {
        sink.lock().unwrap().push((loaded, total));
    });

    let file = FileUpload::from_bytes(vec![7u8; 200_000])
        .file_name("cover.png")
        .mime("image/png");
    let object = cms
        .upload_file(file, Some("/covers"), Some(&fc))
        .await
        .unwrap();

    upload.assert_async().await;
    assert_eq!(object.hashname, "ab12cd");

    let reports = reports.lock().unwrap();
    assert!(reports.len() > 1, "expected several chunks, got {reports:?}");
    assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(reports.iter().all(|&(_, total)| total == 200_000));
    assert_eq!(reports.last(), Some(&(200_000, 200_000)));
}

#[tokio::test]
async fn nameless_blob_uploads_as_blob() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload-file")
                .body_contains("filename=\"blob\"");
            then.status(200).json_body(object_json());
        })
        .await;

    let (cms, _store) = signed_in_client(&server, "tok-1");
    cms.upload_file(FileUpload::from_bytes(b"hello".to_vec()), None, None)
        .await
        .unwrap();
    upload.assert_async().await;
}

#[tokio::test]
async fn abort_interrupts_in_flight_request() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/news");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(json!({ "posts": [] }));
        })
        .await;

    let (cms, _store) = signed_in_client(&server, "tok-1");
    let fc = FetchController::new();
    let cancel = fc.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.abort();
    });

    let started = Instant::now();
    let err = cms
        .bucket("news")
        .get_posts(None, Some(&fc))
        .await
        .unwrap_err();

    assert!(err.is_aborted(), "unexpected error: {err}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn aborted_controller_sends_nothing() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/news");
            then.status(200).json_body(json!({ "posts": [] }));
        })
        .await;

    let (cms, _store) = signed_in_client(&server, "tok-1");
    let fc = FetchController::new();
    fc.abort();

    let err = cms
        .bucket("news")
        .get_posts(None, Some(&fc))
        .await
        .unwrap_err();
    assert!(err.is_aborted());
    assert_eq!(list.hits_async().await, 0);
}

#[tokio::test]
async fn non_json_success_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/news");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;

    let (cms, _store) = signed_in_client(&server, "tok-1");
    let err = cms.bucket("news").get_posts(None, None).await.unwrap_err();
    assert!(matches!(
        err,
        postcms::Error::Request(postcms::RequestError::DecodeJson { .. })
    ));
}
