//! Batch folder creation, batch delete, and folder sharing
//!
//! Both batch endpoints share the same submit-then-poll shape: submit a
//! chunk, get back either a completed result, an async job id to poll, or
//! an immediate failure. Results are returned in input order regardless of
//! how the server chunked or reordered them internally.

use std::time::Duration;

use meridian_core::domain::RemotePath;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::RemoteError;
use crate::session::Session;
use crate::types::{FolderMetadata, Metadata, SharedLinkMetadata, Visibility};

const DELETE_BATCH_PATH: &str = "/files/delete_batch";
const DELETE_BATCH_CHECK_PATH: &str = "/files/delete_batch/check";
const CREATE_FOLDER_BATCH_PATH: &str = "/files/create_folder_batch";
const CREATE_FOLDER_BATCH_CHECK_PATH: &str = "/files/create_folder_batch/check";
const SHARE_FOLDER_PATH: &str = "/sharing/share_folder";
const SHARE_FOLDER_CHECK_PATH: &str = "/sharing/check_job_status";

const MAX_BATCH_SIZE: usize = 1000;
const JOB_SUBMIT_DELAY: Duration = Duration::from_millis(500);
const SHARE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The outcome for a single entry in a batch operation.
#[derive(Debug, Clone)]
pub enum BatchOutcome<T> {
    Success(T),
    Failure(RemoteError),
}

#[derive(Debug, Serialize)]
struct DeleteEntry<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteBatchRequest<'a> {
    entries: Vec<DeleteEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct CreateFolderBatchRequest<'a> {
    paths: Vec<&'a str>,
    autorename: bool,
    force_async: bool,
}

#[derive(Debug, Serialize)]
struct AsyncJobCheckRequest<'a> {
    async_job_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum JobLaunch<T> {
    Complete { entries: Vec<JobEntry<T>> },
    AsyncJobId { async_job_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum JobStatus<T> {
    InProgress,
    Complete { entries: Vec<JobEntry<T>> },
    Failed { reason: JobFailure },
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum JobEntry<T> {
    Success(T),
    Failure { reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum JobFailure {
    TooManyFiles,
    TooManyWriteOperations,
    #[serde(other)]
    Other,
}

fn chunks<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(|c| c.to_vec()).collect()
}

fn entries_to_outcomes<T>(entries: Vec<JobEntry<T>>, paths: &[String]) -> Vec<BatchOutcome<T>> {
    entries
        .into_iter()
        .zip(paths.iter())
        .map(|(entry, path)| match entry {
            JobEntry::Success(v) => BatchOutcome::Success(v),
            JobEntry::Failure { reason } => {
                BatchOutcome::Failure(RemoteError::SyncError(format!("{path}: {reason}")))
            }
        })
        .collect()
}

/// Deletes every path in `paths`, chunked at `batch_size` (clamped to
/// `[1, 1000]`). Results are returned in input order. A `TooManyWriteOperations`
/// failure surfaces as a single transient [`RemoteError::SyncError`] for the
/// whole chunk, matching the asymmetry of the source this crate is modeled
/// on: unlike folder creation, deletion does not retry with a smaller chunk.
pub async fn delete_batch(
    session: &Session,
    paths: &[RemotePath],
    batch_size: usize,
) -> Result<Vec<BatchOutcome<Metadata>>, RemoteError> {
    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let path_strings: Vec<String> = paths.iter().map(|p| p.as_str().to_string()).collect();
    let mut results = Vec::with_capacity(paths.len());

    for chunk in chunks(&path_strings, batch_size) {
        debug!(count = chunk.len(), "files_delete_batch");
        let request = DeleteBatchRequest {
            entries: chunk.iter().map(|p| DeleteEntry { path: p }).collect(),
        };
        let launch: JobLaunch<Metadata> = session.post_json(DELETE_BATCH_PATH, &request).await?;

        match launch {
            JobLaunch::Complete { entries } => {
                results.extend(entries_to_outcomes(entries, &chunk));
            }
            JobLaunch::AsyncJobId { async_job_id } => {
                tokio::time::sleep(JOB_SUBMIT_DELAY).await;
                let check_interval =
                    Duration::from_millis(((chunk.len() as f64 / 100.0) * 1000.0).max(100.0) as u64);

                let status = poll_job::<Metadata>(
                    session,
                    DELETE_BATCH_CHECK_PATH,
                    &async_job_id,
                    check_interval,
                )
                .await?;

                match status {
                    JobStatus::Complete { entries } => {
                        results.extend(entries_to_outcomes(entries, &chunk));
                    }
                    JobStatus::Failed {
                        reason: JobFailure::TooManyWriteOperations,
                    } => {
                        return Err(RemoteError::SyncError(
                            "Could not delete items: too many write operations, try again later"
                                .to_string(),
                        ));
                    }
                    JobStatus::Failed { .. } => {
                        return Err(RemoteError::RemoteServerError(
                            "delete batch job failed".to_string(),
                        ));
                    }
                    JobStatus::InProgress => unreachable!("poll_job resolves past InProgress"),
                }
            }
        }
    }

    Ok(results)
}

/// Creates every folder in `paths`, chunked at `batch_size`. On
/// `TooManyFiles`, halves `batch_size` and retries that chunk recursively
/// rather than failing it outright.
pub async fn create_folder_batch(
    session: &Session,
    paths: &[RemotePath],
    batch_size: usize,
    autorename: bool,
    force_async: bool,
) -> Result<Vec<BatchOutcome<FolderMetadata>>, RemoteError> {
    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let path_strings: Vec<String> = paths.iter().map(|p| p.as_str().to_string()).collect();
    create_folder_batch_inner(session, &path_strings, batch_size, autorename, force_async).await
}

fn create_folder_batch_inner<'a>(
    session: &'a Session,
    paths: &'a [String],
    batch_size: usize,
    autorename: bool,
    force_async: bool,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Vec<BatchOutcome<FolderMetadata>>, RemoteError>> + 'a>,
> {
    Box::pin(async move {
        let mut results = Vec::with_capacity(paths.len());

        for chunk in chunks(paths, batch_size) {
            debug!(count = chunk.len(), "files_create_folder_batch");
            let request = CreateFolderBatchRequest {
                paths: chunk.iter().map(String::as_str).collect(),
                autorename,
                force_async,
            };
            let launch: JobLaunch<FolderMetadata> =
                session.post_json(CREATE_FOLDER_BATCH_PATH, &request).await?;

            match launch {
                JobLaunch::Complete { entries } => {
                    results.extend(entries_to_outcomes(entries, &chunk));
                }
                JobLaunch::AsyncJobId { async_job_id } => {
                    tokio::time::sleep(JOB_SUBMIT_DELAY).await;
                    let check_interval = Duration::from_millis(
                        ((chunk.len() as f64 / 100.0) * 1000.0).max(100.0) as u64,
                    );

                    let status = poll_job::<FolderMetadata>(
                        session,
                        CREATE_FOLDER_BATCH_CHECK_PATH,
                        &async_job_id,
                        check_interval,
                    )
                    .await?;

                    match status {
                        JobStatus::Complete { entries } => {
                            results.extend(entries_to_outcomes(entries, &chunk));
                        }
                        JobStatus::Failed {
                            reason: JobFailure::TooManyFiles,
                        } => {
                            let halved = (batch_size / 2).max(1);
                            warn!(
                                old_batch_size = batch_size,
                                new_batch_size = halved,
                                "too many files in batch, halving and retrying"
                            );
                            let retried = create_folder_batch_inner(
                                session, &chunk, halved, autorename, force_async,
                            )
                            .await?;
                            results.extend(retried);
                        }
                        JobStatus::Failed { .. } => {
                            return Err(RemoteError::RemoteServerError(
                                "create folder batch job failed".to_string(),
                            ));
                        }
                        JobStatus::InProgress => unreachable!("poll_job resolves past InProgress"),
                    }
                }
            }
        }

        Ok(results)
    })
}

async fn poll_job<T>(
    session: &Session,
    check_path: &str,
    async_job_id: &str,
    check_interval: Duration,
) -> Result<JobStatus<T>, RemoteError>
where
    T: for<'de> Deserialize<'de>,
{
    let request = AsyncJobCheckRequest { async_job_id };
    loop {
        let status: JobStatus<T> = session.post_json(check_path, &request).await?;
        if matches!(status, JobStatus::InProgress) {
            tokio::time::sleep(check_interval).await;
            continue;
        }
        return Ok(status);
    }
}

#[derive(Debug, Serialize)]
struct ShareFolderRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum ShareLaunch {
    Complete(SharedLinkMetadata),
    AsyncJobId { async_job_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum ShareJobStatus {
    InProgress,
    Complete(SharedLinkMetadata),
    Failed { reason: String },
}

/// Converts `path` into a shared folder, polling until the server finishes
/// if it processes the request asynchronously.
pub async fn share_folder(
    session: &Session,
    path: &RemotePath,
) -> Result<SharedLinkMetadata, RemoteError> {
    let request = ShareFolderRequest {
        path: if path.as_str() == "/" { "" } else { path.as_str() },
    };
    debug!(path = %path, "sharing_share_folder");
    let launch: ShareLaunch = session.post_json(SHARE_FOLDER_PATH, &request).await?;

    match launch {
        ShareLaunch::Complete(meta) => Ok(meta),
        ShareLaunch::AsyncJobId { async_job_id } => {
            tokio::time::sleep(SHARE_POLL_INTERVAL).await;
            let check_request = AsyncJobCheckRequest {
                async_job_id: &async_job_id,
            };
            loop {
                let status: ShareJobStatus =
                    session.post_json(SHARE_FOLDER_CHECK_PATH, &check_request).await?;
                match status {
                    ShareJobStatus::InProgress => {
                        tokio::time::sleep(SHARE_POLL_INTERVAL).await;
                    }
                    ShareJobStatus::Complete(meta) => return Ok(meta),
                    ShareJobStatus::Failed { reason } => {
                        return Err(RemoteError::RemoteServerError(format!(
                            "share_folder job failed: {reason}"
                        )))
                    }
                }
            }
        }
    }
}

/// Validates a shared-link request before any network I/O: a `Password`
/// visibility with no password is a programmer error, not a server error.
pub fn validate_shared_link_request(
    visibility: Visibility,
    password: Option<&str>,
) -> Result<(), RemoteError> {
    if visibility.is_password() && password.is_none() {
        return Err(RemoteError::BadInputError(
            "password visibility requires a password".to_string(),
        ));
    }
    Ok(())
}
