//! Single-item metadata, revision history, restore, and link sharing
//!
//! These sit apart from the listing/change-feed endpoints in `delta`: each
//! call here targets one path rather than following a cursor across a
//! folder's whole contents, except `list_shared_links`, which paginates the
//! same `{entries, cursor, has_more}` shape the rest of the crate does.

use chrono::{DateTime, Utc};
use meridian_core::domain::RemotePath;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::validate_shared_link_request;
use crate::errors::RemoteError;
use crate::session::Session;
use crate::types::{FileMetadata, Metadata, SharedLinkMetadata, Visibility};

const GET_METADATA_PATH: &str = "/files/get_metadata";
const LIST_REVISIONS_PATH: &str = "/files/list_revisions";
const RESTORE_PATH: &str = "/files/restore";
const CREATE_SHARED_LINK_PATH: &str = "/sharing/create_shared_link_with_settings";
const REVOKE_SHARED_LINK_PATH: &str = "/sharing/revoke_shared_link";
const LIST_SHARED_LINKS_PATH: &str = "/sharing/list_shared_links";

/// Maximum number of revisions a single `list_revisions` call will request,
/// matching the remote's own documented cap.
const MAX_REVISIONS_LIMIT: u32 = 10;

/// Whether `list_revisions` addresses a file by path or by a stable id that
/// survives moves and renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionsMode {
    Path,
    Id,
}

#[derive(Debug, Serialize)]
struct GetMetadataRequest<'a> {
    path: &'a str,
    include_deleted: bool,
}

#[derive(Debug, Serialize)]
struct ListRevisionsRequest<'a> {
    path: &'a str,
    mode: RevisionsMode,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct ListRevisionsResponse {
    entries: Vec<FileMetadata>,
}

#[derive(Debug, Serialize)]
struct RestoreRequest<'a> {
    path: &'a str,
    rev: &'a str,
}

#[derive(Debug, Serialize)]
struct SharedLinkSettings<'a> {
    requested_visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CreateSharedLinkRequest<'a> {
    path: &'a str,
    settings: SharedLinkSettings<'a>,
}

#[derive(Debug, Serialize)]
struct RevokeSharedLinkRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ListSharedLinksRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ListSharedLinksResponse {
    links: Vec<SharedLinkMetadata>,
    has_more: bool,
    #[serde(default)]
    cursor: Option<String>,
}

/// Fetches metadata for a single path. Returns `None` rather than an error
/// when the path does not exist, matching every other lookup in this crate
/// that treats a missing item as an expected outcome, not a failure.
pub async fn get_metadata(
    session: &Session,
    path: &RemotePath,
    include_deleted: bool,
) -> Result<Option<Metadata>, RemoteError> {
    debug!(path = %path, "files_get_metadata");
    let request = GetMetadataRequest {
        path: path.as_str(),
        include_deleted,
    };
    match session.post_json(GET_METADATA_PATH, &request).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(RemoteError::NotFoundError(_)) | Err(RemoteError::PathError(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Lists revisions for `identifier`, interpreted as a path or a stable file
/// id per `mode`. `limit` is clamped to `[1, 10]`.
pub async fn list_revisions(
    session: &Session,
    identifier: &str,
    mode: RevisionsMode,
    limit: u32,
) -> Result<Vec<FileMetadata>, RemoteError> {
    let limit = limit.clamp(1, MAX_REVISIONS_LIMIT);
    debug!(identifier, ?mode, limit, "files_list_revisions");
    let request = ListRevisionsRequest {
        path: identifier,
        mode,
        limit,
    };
    let response: ListRevisionsResponse = session.post_json(LIST_REVISIONS_PATH, &request).await?;
    Ok(response.entries)
}

/// Restores `path` to the content of revision `rev`.
pub async fn restore(
    session: &Session,
    path: &RemotePath,
    rev: &str,
) -> Result<FileMetadata, RemoteError> {
    debug!(path = %path, rev, "files_restore");
    let request = RestoreRequest {
        path: path.as_str(),
        rev,
    };
    session.post_json(RESTORE_PATH, &request).await
}

/// Creates a shared link for `path`. `password` is required iff `visibility`
/// is [`Visibility::Password`] and is otherwise dropped; `expires` is
/// normalised to UTC before being sent.
pub async fn create_shared_link(
    session: &Session,
    path: &RemotePath,
    visibility: Visibility,
    password: Option<&str>,
    expires: Option<DateTime<Utc>>,
) -> Result<SharedLinkMetadata, RemoteError> {
    validate_shared_link_request(visibility, password)?;
    let link_password = if visibility.is_password() { password } else { None };

    debug!(path = %path, ?visibility, "sharing_create_shared_link_with_settings");
    let request = CreateSharedLinkRequest {
        path: path.as_str(),
        settings: SharedLinkSettings {
            requested_visibility: visibility,
            link_password,
            expires: expires.map(|e| e.with_timezone(&Utc)),
        },
    };
    session.post_json(CREATE_SHARED_LINK_PATH, &request).await
}

/// Revokes the shared link at `url`.
pub async fn revoke_shared_link(session: &Session, url: &str) -> Result<(), RemoteError> {
    debug!(url, "sharing_revoke_shared_link");
    let request = RevokeSharedLinkRequest { url };
    session
        .post_json::<_, serde_json::Value>(REVOKE_SHARED_LINK_PATH, &request)
        .await?;
    Ok(())
}

/// Lists shared links under `path`, or every shared link for the account if
/// `path` is `None`. Pages are concatenated the same way `delta::flatten_pages`
/// concatenates folder-listing pages, but locally: the shared-link cursor is
/// only present while `has_more` is true, which doesn't fit that function's
/// mandatory `Cursor` field.
pub async fn list_shared_links(
    session: &Session,
    path: Option<&RemotePath>,
) -> Result<Vec<SharedLinkMetadata>, RemoteError> {
    debug!(path = ?path.map(RemotePath::as_str), "sharing_list_shared_links");
    let path_str = path.map(RemotePath::as_str);
    let mut links = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let request = ListSharedLinksRequest {
            path: path_str,
            cursor: cursor.as_deref(),
        };
        let response: ListSharedLinksResponse =
            session.post_json(LIST_SHARED_LINKS_PATH, &request).await?;
        links.extend(response.links);
        if !response.has_more {
            break;
        }
        cursor = response.cursor;
        if cursor.is_none() {
            break;
        }
    }

    Ok(links)
}
