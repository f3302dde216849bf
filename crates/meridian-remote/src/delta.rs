//! Folder listing and the long-poll change feed
//!
//! Mirrors the remote's RPC-style pagination: a listing call returns a page
//! of entries plus a cursor and a `has_more` flag; callers either flatten
//! every page into one listing or consume pages one at a time via
//! [`FolderPages`] / [`ChangePages`]. [`ChangeFeed::wait_for_changes`] blocks
//! until the server reports new changes or the poll times out.

use std::time::Duration;

use meridian_core::domain::{Cursor, DomainError, RemotePath};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::RemoteError;
use crate::session::Session;
use crate::types::{ListingPage, Metadata};

const LIST_FOLDER_PATH: &str = "/files/list_folder";
const LIST_FOLDER_CONTINUE_PATH: &str = "/files/list_folder/continue";
const LIST_FOLDER_LONGPOLL_PATH: &str = "/files/list_folder/longpoll";
const GET_LATEST_CURSOR_PATH: &str = "/files/list_folder/get_latest_cursor";

/// Retries for [`continue_page`] on a retryable transport error, per call.
const CONTINUE_MAX_ATTEMPTS: u32 = 3;
const CONTINUE_BACKOFF: Duration = Duration::from_secs(3);

/// Grace period added to a server-requested backoff before the next long poll.
const BACKOFF_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct ListFolderRequest<'a> {
    path: &'a str,
    recursive: bool,
    include_deleted: bool,
    include_mounted_folders: bool,
    include_non_downloadable_files: bool,
}

#[derive(Debug, Serialize)]
struct ListFolderContinueRequest<'a> {
    cursor: &'a str,
}

#[derive(Debug, Serialize)]
struct GetLatestCursorRequest<'a> {
    path: &'a str,
    recursive: bool,
    include_non_downloadable_files: bool,
}

#[derive(Debug, Serialize)]
struct LongPollRequest<'a> {
    cursor: &'a str,
    timeout: u32,
}

#[derive(Debug, Deserialize)]
struct FolderListResponse {
    entries: Vec<Metadata>,
    cursor: Cursor,
    has_more: bool,
}

impl From<FolderListResponse> for ListingPage {
    fn from(r: FolderListResponse) -> Self {
        ListingPage {
            entries: r.entries,
            cursor: r.cursor,
            has_more: r.has_more,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestCursorResponse {
    cursor: Cursor,
}

#[derive(Debug, Deserialize)]
struct LongPollResponse {
    changes: bool,
    backoff: Option<u64>,
}

/// Concatenates a run of pages into one page carrying every entry, the last
/// page's cursor, and `has_more = false`.
pub fn flatten_pages(pages: Vec<ListingPage>) -> Option<ListingPage> {
    let mut iter = pages.into_iter();
    let mut flattened = iter.next()?;
    for page in iter {
        flattened.entries.extend(page.entries);
        flattened.cursor = page.cursor;
    }
    flattened.has_more = false;
    Some(flattened)
}

/// Lists a folder's contents, following every page and returning one
/// flattened [`ListingPage`].
pub async fn list_folder(
    session: &Session,
    path: &RemotePath,
    recursive: bool,
) -> Result<ListingPage, RemoteError> {
    let pages = FolderPages::new(session, path.clone(), recursive)
        .collect_all()
        .await?;
    flatten_pages(pages).ok_or_else(|| {
        RemoteError::RemoteServerError("list_folder returned no pages".to_string())
    })
}

/// Lists changes to the remote since `last_cursor`, flattened into one page.
pub async fn list_remote_changes(
    session: &Session,
    last_cursor: &Cursor,
) -> Result<ListingPage, RemoteError> {
    let pages = ChangePages::new(session, last_cursor.clone())
        .collect_all()
        .await?;
    flatten_pages(pages).ok_or_else(|| {
        RemoteError::RemoteServerError("list_remote_changes returned no pages".to_string())
    })
}

/// Returns the cursor representing the current head of `path`'s subtree,
/// without fetching any entries.
pub async fn get_latest_cursor(session: &Session, path: &RemotePath) -> Result<Cursor, RemoteError> {
    let body = GetLatestCursorRequest {
        path: path.as_str(),
        recursive: true,
        include_non_downloadable_files: false,
    };
    debug!(path = %path, "files_list_folder_get_latest_cursor");
    let response: LatestCursorResponse =
        session.post_json(GET_LATEST_CURSOR_PATH, &body).await?;
    Ok(response.cursor)
}

async fn continue_page(session: &Session, cursor: &Cursor) -> Result<ListingPage, RemoteError> {
    let body = ListFolderContinueRequest {
        cursor: cursor.as_str(),
    };
    let mut attempt = 0;
    loop {
        attempt += 1;
        match session
            .post_json::<_, FolderListResponse>(LIST_FOLDER_CONTINUE_PATH, &body)
            .await
        {
            Ok(page) => return Ok(page.into()),
            Err(err) if err.is_retryable() && attempt < CONTINUE_MAX_ATTEMPTS => {
                warn!(attempt, error = %err, "retrying list_folder/continue");
                tokio::time::sleep(CONTINUE_BACKOFF).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Lazily walks the pages of a `list_folder` call, fetching one page at a
/// time via [`FolderPages::next_page`].
pub struct FolderPages<'a> {
    session: &'a Session,
    path: RemotePath,
    recursive: bool,
    cursor: Option<Cursor>,
    started: bool,
    exhausted: bool,
}

impl<'a> FolderPages<'a> {
    pub fn new(session: &'a Session, path: RemotePath, recursive: bool) -> Self {
        Self {
            session,
            path,
            recursive,
            cursor: None,
            started: false,
            exhausted: false,
        }
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<ListingPage>, RemoteError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = if !self.started {
            self.started = true;
            let body = ListFolderRequest {
                path: self.path.as_str(),
                recursive: self.recursive,
                include_deleted: false,
                include_mounted_folders: true,
                include_non_downloadable_files: false,
            };
            debug!(path = %self.path, "files_list_folder");
            let response: FolderListResponse =
                self.session.post_json(LIST_FOLDER_PATH, &body).await?;
            ListingPage::from(response)
        } else {
            let cursor = self
                .cursor
                .clone()
                .expect("cursor must be set after the first page");
            continue_page(self.session, &cursor).await?
        };

        self.cursor = Some(page.cursor.clone());
        if !page.has_more {
            self.exhausted = true;
        }
        Ok(Some(page))
    }

    /// Eagerly drains every remaining page.
    pub async fn collect_all(mut self) -> Result<Vec<ListingPage>, RemoteError> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }
}

/// Lazily walks the pages of a `list_folder/continue` change listing,
/// started from a previously saved cursor.
pub struct ChangePages<'a> {
    session: &'a Session,
    cursor: Cursor,
    exhausted: bool,
}

impl<'a> ChangePages<'a> {
    pub fn new(session: &'a Session, last_cursor: Cursor) -> Self {
        Self {
            session,
            cursor: last_cursor,
            exhausted: false,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<ListingPage>, RemoteError> {
        if self.exhausted {
            return Ok(None);
        }
        let page = continue_page(self.session, &self.cursor).await?;
        self.cursor = page.cursor.clone();
        if !page.has_more {
            self.exhausted = true;
        }
        Ok(Some(page))
    }

    pub async fn collect_all(mut self) -> Result<Vec<ListingPage>, RemoteError> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }
}

/// Long-poll handle for change notifications. Tracks the server-requested
/// backoff deadline between calls so repeated polling honours it.
pub struct ChangeFeed {
    backoff_deadline: Mutex<Option<Instant>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            backoff_deadline: Mutex::new(None),
        }
    }

    /// Blocks (cooperatively) until changes are available or `timeout_seconds`
    /// elapses. `timeout_seconds` must be in `[30, 480]`.
    pub async fn wait_for_changes(
        &self,
        session: &Session,
        last_cursor: &Cursor,
        timeout_seconds: u32,
    ) -> Result<bool, RemoteError> {
        if !(30..=480).contains(&timeout_seconds) {
            return Err(RemoteError::bad_input(DomainError::ValidationFailed(
                "timeout must be in range [30, 480]".to_string(),
            )));
        }

        let deadline = *self.backoff_deadline.lock().await;
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                tokio::time::sleep(deadline - now).await;
            }
        }

        let body = LongPollRequest {
            cursor: last_cursor.as_str(),
            timeout: timeout_seconds,
        };
        debug!(timeout_seconds, "files_list_folder_longpoll");
        let response: LongPollResponse =
            session.post_json(LIST_FOLDER_LONGPOLL_PATH, &body).await?;

        let mut guard = self.backoff_deadline.lock().await;
        *guard = response
            .backoff
            .map(|secs| Instant::now() + Duration::from_secs(secs) + BACKOFF_GRACE);
        if let Some(secs) = response.backoff {
            warn!(backoff_seconds = secs, "server requested long-poll backoff");
        }

        Ok(response.changes)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
