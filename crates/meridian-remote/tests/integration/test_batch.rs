//! Integration tests for batch folder create/delete and folder sharing

use meridian_core::domain::RemotePath;
use meridian_remote::batch::{self, BatchOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn delete_batch_completes_immediately() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/files/delete_batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "complete",
            "entries": [{
                ".tag": "success",
                "kind": "deleted",
                "path": "/Old",
                "name": "Old",
            }],
        })))
        .mount(&server)
        .await;

    let paths = vec![RemotePath::new("/Old".to_string()).unwrap()];
    let results = batch::delete_batch(&session, &paths, 100).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], BatchOutcome::Success(_)));
}

#[tokio::test]
async fn create_folder_batch_completes_immediately() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/files/create_folder_batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "complete",
            "entries": [{
                ".tag": "success",
                "id": "id1",
                "path": "/NewFolder",
                "name": "NewFolder",
            }],
        })))
        .mount(&server)
        .await;

    let paths = vec![RemotePath::new("/NewFolder".to_string()).unwrap()];
    let results = batch::create_folder_batch(&session, &paths, 100, false, false)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    match &results[0] {
        BatchOutcome::Success(meta) => assert_eq!(meta.name, "NewFolder"),
        BatchOutcome::Failure(e) => panic!("expected success, got {e}"),
    }
}

#[tokio::test]
async fn create_folder_batch_polls_an_async_job_to_completion() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/files/create_folder_batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "async_job_id",
            "async_job_id": "job-1",
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/files/create_folder_batch/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "in_progress",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/files/create_folder_batch/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "complete",
            "entries": [{
                ".tag": "success",
                "id": "id1",
                "path": "/NewFolder",
                "name": "NewFolder",
            }],
        })))
        .mount(&server)
        .await;

    let paths = vec![RemotePath::new("/NewFolder".to_string()).unwrap()];
    let results = batch::create_folder_batch(&session, &paths, 100, false, true)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], BatchOutcome::Success(_)));
}

#[tokio::test]
async fn share_folder_completes_immediately() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/sharing/share_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "complete",
            "url": "https://meridiansync.dev/s/abc123",
            "path": "/Shared",
            "visibility": "public",
        })))
        .mount(&server)
        .await;

    let path_arg = RemotePath::new("/Shared".to_string()).unwrap();
    let link = batch::share_folder(&session, &path_arg).await.unwrap();

    assert_eq!(link.url, "https://meridiansync.dev/s/abc123");
}

#[tokio::test]
async fn share_folder_surfaces_job_failure() {
    let server = MockServer::start().await;
    let session = meridian_remote::session::Session::with_base_url(
        "token",
        server.uri(),
        meridian_core::config::RetryConfig { max_attempts: 1 },
    );

    Mock::given(method("POST"))
        .and(path("/sharing/share_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "async_job_id",
            "async_job_id": "job-2",
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sharing/check_job_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "failed",
            "reason": "no write permission",
        })))
        .mount(&server)
        .await;

    let path_arg = RemotePath::new("/Shared".to_string()).unwrap();
    let result = batch::share_folder(&session, &path_arg).await;
    assert!(result.is_err());
}
