//! Integration tests for folder listing and pagination

use meridian_core::domain::RemotePath;
use meridian_remote::delta;

use crate::common;

#[tokio::test]
async fn list_folder_flattens_a_single_page() {
    let (server, session) = common::mock_session().await;
    common::mount_list_folder_single_page(
        &server,
        serde_json::json!([{
            "kind": "folder",
            "id": "id1",
            "path": "/Docs",
            "name": "Docs",
        }]),
    )
    .await;

    let path = RemotePath::new("/".to_string()).unwrap();
    let page = delta::list_folder(&session, &path, true).await.unwrap();

    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].name(), "Docs");
    assert!(!page.has_more);
}

#[tokio::test]
async fn list_folder_follows_pagination_and_keeps_last_cursor() {
    let (server, session) = common::mock_session().await;
    common::mount_list_folder_two_pages(
        &server,
        serde_json::json!([{
            "kind": "folder", "id": "id1", "path": "/A", "name": "A",
        }]),
        serde_json::json!([{
            "kind": "folder", "id": "id2", "path": "/B", "name": "B",
        }]),
    )
    .await;

    let path = RemotePath::new("/".to_string()).unwrap();
    let page = delta::list_folder(&session, &path, true).await.unwrap();

    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.cursor.as_str(), "cursor-2");
    assert!(!page.has_more);
}

#[tokio::test]
async fn folder_pages_can_be_consumed_one_at_a_time() {
    let (server, session) = common::mock_session().await;
    common::mount_list_folder_two_pages(
        &server,
        serde_json::json!([{
            "kind": "folder", "id": "id1", "path": "/A", "name": "A",
        }]),
        serde_json::json!([]),
    )
    .await;

    let path = RemotePath::new("/".to_string()).unwrap();
    let mut pages = delta::FolderPages::new(&session, path, true);

    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.entries.len(), 1);
    assert!(first.has_more);

    let second = pages.next_page().await.unwrap().unwrap();
    assert!(second.entries.is_empty());
    assert!(!second.has_more);

    assert!(pages.next_page().await.unwrap().is_none());
}
