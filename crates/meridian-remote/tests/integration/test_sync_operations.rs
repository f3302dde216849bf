//! Integration tests for download and upload against a mocked remote

use meridian_core::config::TransferConfig;
use meridian_core::domain::RemotePath;
use meridian_remote::transfer;
use meridian_remote::types::WriteMode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn download_writes_verified_content_to_disk() {
    let (server, session) = common::mock_session().await;
    let content = b"Hello from the mock remote. This is test content.";
    common::mount_download(&server, "/Documents/hello.txt", content).await;

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let remote_path = RemotePath::new("/Documents/hello.txt".to_string()).unwrap();

    let metadata = transfer::download(&session, &remote_path, tmp.path(), None)
        .await
        .expect("download failed");

    assert_eq!(metadata.name, "hello.txt");
    let written = std::fs::read(tmp.path()).unwrap();
    assert_eq!(written, content);
}

#[tokio::test]
async fn download_reproduces_a_symlink_instead_of_fetching_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(Vec::<u8>::new())
                .append_header(
                    "X-Remote-Result",
                    serde_json::json!({
                        "id": "id1",
                        "path": "/link",
                        "name": "link",
                        "size": 0,
                        "content_hash": "a".repeat(64),
                        "client_modified": "2026-01-14T09:00:00Z",
                        "server_modified": "2026-01-15T10:00:00Z",
                        "rev": "rev1",
                        "symlink_target": "/Documents/original.txt",
                    })
                    .to_string(),
                ),
        )
        .mount(&server)
        .await;

    let session = meridian_remote::session::Session::with_base_url(
        "token",
        server.uri(),
        meridian_core::config::RetryConfig { max_attempts: 1 },
    );

    let dir = tempfile::tempdir().unwrap();
    let link_path = dir.path().join("link");
    let remote_path = RemotePath::new("/link".to_string()).unwrap();

    transfer::download(&session, &remote_path, &link_path, None)
        .await
        .expect("download failed");

    let target = std::fs::read_link(&link_path).unwrap();
    assert_eq!(target.to_str().unwrap(), "/Documents/original.txt");
}

#[tokio::test]
async fn upload_small_file_round_trips_metadata() {
    let (server, session) = common::mock_session().await;
    common::mount_upload_small(&server, "/Documents/test.txt", "rev-001").await;

    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), b"Small file content for upload test").unwrap();

    let remote_path = RemotePath::new("/Documents/test.txt".to_string()).unwrap();
    let config = TransferConfig::default();

    let metadata = transfer::upload(
        &session,
        tmp.path(),
        &remote_path,
        &config,
        WriteMode::Overwrite,
        false,
        None,
    )
    .await
    .expect("upload failed");

    assert_eq!(metadata.rev, "rev-001");
    assert_eq!(metadata.path.as_str(), "/Documents/test.txt");
}

#[tokio::test]
async fn download_returns_error_on_404() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/download"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "not found",
        })))
        .mount(&server)
        .await;

    let session = meridian_remote::session::Session::with_base_url(
        "token",
        server.uri(),
        meridian_core::config::RetryConfig { max_attempts: 1 },
    );

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let remote_path = RemotePath::new("/nonexistent".to_string()).unwrap();

    let result = transfer::download(&session, &remote_path, tmp.path(), None).await;
    assert!(result.is_err());
}
