//! Integration tests for single-item metadata, revisions, restore, and
//! shared-link operations

use meridian_core::domain::RemotePath;
use meridian_remote::metadata::{self, RevisionsMode};
use meridian_remote::types::Visibility;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn file_json(remote_path: &str, rev: &str) -> serde_json::Value {
    serde_json::json!({
        "kind": "file",
        "id": "id1",
        "path": remote_path,
        "name": remote_path.rsplit('/').next().unwrap_or(remote_path),
        "size": 10,
        "content_hash": "a".repeat(64),
        "client_modified": "2026-01-14T09:00:00Z",
        "server_modified": "2026-01-15T10:00:00Z",
        "rev": rev,
    })
}

#[tokio::test]
async fn get_metadata_returns_item_when_present() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/files/get_metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("/Docs/a.txt", "rev1")))
        .mount(&server)
        .await;

    let remote_path = RemotePath::new("/Docs/a.txt".to_string()).unwrap();
    let found = metadata::get_metadata(&session, &remote_path, false)
        .await
        .expect("get_metadata failed");

    assert!(found.is_some());
    assert_eq!(found.unwrap().name(), "a.txt");
}

#[tokio::test]
async fn get_metadata_returns_none_on_404() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/files/get_metadata"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error_summary": "path/not_found/",
        })))
        .mount(&server)
        .await;

    let remote_path = RemotePath::new("/Docs/missing.txt".to_string()).unwrap();
    let found = metadata::get_metadata(&session, &remote_path, false)
        .await
        .expect("get_metadata failed");

    assert!(found.is_none());
}

#[tokio::test]
async fn list_revisions_clamps_limit_and_returns_entries() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/files/list_revisions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [file_json("/Docs/a.txt", "rev1"), file_json("/Docs/a.txt", "rev2")],
        })))
        .mount(&server)
        .await;

    let entries = metadata::list_revisions(&session, "/Docs/a.txt", RevisionsMode::Path, 100)
        .await
        .expect("list_revisions failed");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].rev, "rev1");
}

#[tokio::test]
async fn restore_returns_restored_metadata() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/files/restore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("/Docs/a.txt", "rev1")))
        .mount(&server)
        .await;

    let remote_path = RemotePath::new("/Docs/a.txt".to_string()).unwrap();
    let restored = metadata::restore(&session, &remote_path, "rev1")
        .await
        .expect("restore failed");

    assert_eq!(restored.rev, "rev1");
}

#[tokio::test]
async fn create_shared_link_rejects_password_visibility_without_password() {
    let (_server, session) = common::mock_session().await;
    let remote_path = RemotePath::new("/Docs/a.txt".to_string()).unwrap();

    let err = metadata::create_shared_link(&session, &remote_path, Visibility::Password, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, meridian_remote::errors::RemoteError::BadInputError(_)));
}

#[tokio::test]
async fn create_shared_link_succeeds_for_public_link() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/sharing/create_shared_link_with_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://meridiansync.dev/s/abc123",
            "path": "/Docs/a.txt",
            "visibility": "public",
        })))
        .mount(&server)
        .await;

    let remote_path = RemotePath::new("/Docs/a.txt".to_string()).unwrap();
    let link = metadata::create_shared_link(&session, &remote_path, Visibility::Public, None, None)
        .await
        .expect("create_shared_link failed");

    assert_eq!(link.url, "https://meridiansync.dev/s/abc123");
}

#[tokio::test]
async fn revoke_shared_link_succeeds() {
    let (server, session) = common::mock_session().await;
    Mock::given(method("POST"))
        .and(path("/sharing/revoke_shared_link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    metadata::revoke_shared_link(&session, "https://meridiansync.dev/s/abc123")
        .await
        .expect("revoke_shared_link failed");
}

#[tokio::test]
async fn list_shared_links_follows_pagination() {
    let (server, session) = common::mock_session().await;

    Mock::given(method("POST"))
        .and(path("/sharing/list_shared_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "links": [{
                "url": "https://meridiansync.dev/s/page1",
                "path": "/Docs/a.txt",
                "visibility": "public",
            }],
            "has_more": true,
            "cursor": "cursor-1",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sharing/list_shared_links"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "links": [{
                "url": "https://meridiansync.dev/s/page2",
                "path": "/Docs/b.txt",
                "visibility": "team_only",
            }],
            "has_more": false,
        })))
        .mount(&server)
        .await;

    let remote_path = RemotePath::new("/Docs".to_string()).unwrap();
    let links = metadata::list_shared_links(&session, Some(&remote_path))
        .await
        .expect("list_shared_links failed");

    assert_eq!(links.len(), 2);
    assert_eq!(links[0].url, "https://meridiansync.dev/s/page1");
    assert_eq!(links[1].url, "https://meridiansync.dev/s/page2");
}
