//! Shared test helpers for remote API integration tests
//!
//! Provides wiremock-based mock server setup for the RPC-style endpoints
//! this crate calls, mirroring the request/response shapes the unit tests
//! in each module already rely on.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meridian_core::config::RetryConfig;
use meridian_remote::session::Session;

/// Starts a mock server and returns a [`Session`] pointed at it with a
/// single-attempt retry policy, so tests fail fast instead of retrying.
pub async fn mock_session() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let session = Session::with_base_url(
        "test-access-token",
        server.uri(),
        RetryConfig { max_attempts: 1 },
    );
    (server, session)
}

/// Mounts `/users/get_current_account` returning a basic personal account.
pub async fn mount_account_info(server: &MockServer, namespace_id: &str) {
    Mock::given(method("POST"))
        .and(path("/users/get_current_account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "account_id": "acct-001",
            "email": "test@example.com",
            "display_name": "Test User",
            "quota_used": 1_073_741_824_u64,
            "quota_total": 5_368_709_120_u64,
            "root_info": {
                ".tag": "user",
                "root_namespace_id": namespace_id,
                "home_namespace_id": namespace_id,
            }
        })))
        .mount(server)
        .await;
}

/// Mounts `/files/list_folder` returning one page with `has_more: false`.
pub async fn mount_list_folder_single_page(server: &MockServer, entries: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": entries,
            "cursor": "cursor-1",
            "has_more": false,
        })))
        .mount(server)
        .await;
}

/// Mounts `/files/list_folder` (first page, `has_more: true`) and
/// `/files/list_folder/continue` (second page, `has_more: false`).
pub async fn mount_list_folder_two_pages(
    server: &MockServer,
    page1: serde_json::Value,
    page2: serde_json::Value,
) {
    Mock::given(method("POST"))
        .and(path("/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": page1,
            "cursor": "cursor-1",
            "has_more": true,
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/files/list_folder/continue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": page2,
            "cursor": "cursor-2",
            "has_more": false,
        })))
        .mount(server)
        .await;
}

/// Mounts `/files/download`, returning `content` with the metadata header
/// computed from its actual two-level content hash.
pub async fn mount_download(server: &MockServer, remote_path: &str, content: &[u8]) {
    use meridian_remote::hash::ContentHasher;

    let hash = ContentHasher::hash(content);
    let metadata = serde_json::json!({
        "id": "id1",
        "path": remote_path,
        "name": remote_path.rsplit('/').next().unwrap_or(remote_path),
        "size": content.len(),
        "content_hash": hash.as_str(),
        "client_modified": "2026-01-14T09:00:00Z",
        "server_modified": "2026-01-15T10:00:00Z",
        "rev": "rev1",
    });

    Mock::given(method("POST"))
        .and(path("/files/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("X-Remote-Result", metadata.to_string()),
        )
        .mount(server)
        .await;
}

/// Mounts `/files/upload`, returning file metadata describing the upload.
pub async fn mount_upload_small(server: &MockServer, remote_path: &str, rev: &str) {
    Mock::given(method("PUT"))
        .and(path("/files/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "id1",
            "path": remote_path,
            "name": remote_path.rsplit('/').next().unwrap_or(remote_path),
            "size": 35,
            "content_hash": "a".repeat(64),
            "client_modified": "2026-01-14T09:00:00Z",
            "server_modified": "2026-01-15T10:00:00Z",
            "rev": rev,
        })))
        .mount(server)
        .await;
}
