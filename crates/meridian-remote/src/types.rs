//! Wire-level DTOs for the remote API
//!
//! These types model the JSON the remote's RPC-style endpoints exchange.
//! They are intentionally separate from the validated domain newtypes in
//! `meridian_core::domain`: a DTO may carry a path or id the server sent
//! us before we've validated it.

use chrono::{DateTime, Utc};
use meridian_core::domain::{ContentHash, Cursor, RemoteId, RemotePath};
use serde::{Deserialize, Serialize};

/// Metadata for a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: RemoteId,
    pub path: RemotePath,
    pub name: String,
    pub size: u64,
    pub content_hash: ContentHash,
    pub client_modified: DateTime<Utc>,
    pub server_modified: DateTime<Utc>,
    pub rev: String,
    /// Present when the remote represents this entry as a symlink recorded
    /// out-of-band; `download` reproduces it locally instead of fetching content.
    #[serde(default)]
    pub symlink_target: Option<String>,
}

/// Metadata for a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub id: RemoteId,
    pub path: RemotePath,
    pub name: String,
}

/// A tombstone for a deleted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedMetadata {
    pub path: RemotePath,
    pub name: String,
}

/// A single remote item, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

impl Metadata {
    pub fn path(&self) -> &RemotePath {
        match self {
            Metadata::File(m) => &m.path,
            Metadata::Folder(m) => &m.path,
            Metadata::Deleted(m) => &m.path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Metadata::File(m) => &m.name,
            Metadata::Folder(m) => &m.name,
            Metadata::Deleted(m) => &m.name,
        }
    }
}

/// A single page of a folder listing or change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub entries: Vec<Metadata>,
    pub cursor: Cursor,
    pub has_more: bool,
}

/// The root namespace an account operates under. Most accounts use
/// `Personal`; shared/team accounts use `Namespace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootInfo {
    Personal,
    Namespace { namespace_id: String },
}

/// A previous revision of a file, as returned by the revision history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub rev: String,
    pub size: u64,
    pub server_modified: DateTime<Utc>,
}

/// Who can use a shared link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    TeamOnly,
    Password,
}

impl Visibility {
    pub fn is_password(self) -> bool {
        matches!(self, Visibility::Password)
    }
}

/// A shared link to a file or folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedLinkMetadata {
    pub url: String,
    pub path: RemotePath,
    pub visibility: Visibility,
}

/// Basic information about the linked account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub account_id: String,
    pub email: String,
    pub display_name: String,
    pub quota_used: u64,
    pub quota_total: u64,
}

/// How to handle a naming conflict on upload.
///
/// `Update` carries the `rev` the caller last observed; the server rejects
/// the write if the file has moved on since, rather than silently clobbering
/// a conflicting change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum WriteMode {
    Add,
    Overwrite,
    Update { rev: String },
}
