//! Download and chunked upload with content-hash verification
//!
//! Mirrors the remote's transfer contract: downloads are streamed through a
//! [`StreamHasher`] and rejected on hash mismatch, uploads pick a single-shot
//! or session-based path depending on file size, and both retry on
//! [`RemoteError::DataCorruptionError`] up to a fixed attempt count.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use meridian_core::config::TransferConfig;
use meridian_core::domain::RemotePath;
use meridian_core::ports::{ProgressSink, SyncEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::RemoteError;
use crate::hash::{ContentHasher, StreamHasher};
use crate::session::Session;
use crate::types::{FileMetadata, WriteMode};

/// Attempts made for a download or upload before surfacing a data-corruption error.
const MAX_TRANSFER_RETRIES: u32 = 3;

const DOWNLOAD_PATH: &str = "/files/download";
const UPLOAD_PATH: &str = "/files/upload";
const SESSION_START_PATH: &str = "/files/upload_session/start";
const SESSION_APPEND_PATH: &str = "/files/upload_session/append_v2";
const SESSION_FINISH_PATH: &str = "/files/upload_session/finish";

/// Header carrying the JSON-encoded result alongside a binary body, analogous
/// to Dropbox's `Dropbox-API-Result` header on the download endpoint.
const RESULT_HEADER: &str = "X-Remote-Result";

const READ_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Serialize)]
struct DownloadArg<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: WriteMode,
    autorename: bool,
    client_modified: DateTime<Utc>,
    content_hash: &'a str,
}

#[derive(Debug, Serialize)]
struct SessionStartArg<'a> {
    content_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionStartResult {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct UploadCursor<'a> {
    session_id: &'a str,
    offset: u64,
}

#[derive(Debug, Serialize)]
struct SessionAppendArg<'a> {
    cursor: UploadCursor<'a>,
    content_hash: &'a str,
}

#[derive(Debug, Serialize)]
struct CommitInfo<'a> {
    path: &'a str,
    client_modified: DateTime<Utc>,
    mode: WriteMode,
    autorename: bool,
}

#[derive(Debug, Serialize)]
struct SessionFinishArg<'a> {
    cursor: UploadCursor<'a>,
    commit: CommitInfo<'a>,
    content_hash: &'a str,
}

/// Tag marking a conflict body as an incorrect-offset rejection.
const INCORRECT_OFFSET_TAG: &str = "\"incorrect_offset\"";

/// An offset the server reports as correct after a failed append/finish,
/// shaped like `{".tag":"incorrect_offset","correct_offset":N}`.
#[derive(Debug, Deserialize)]
struct IncorrectOffset {
    correct_offset: u64,
}

/// Downloads `remote_path` to `local_path`, verifying content against the
/// server's advertised hash and retrying on mismatch up to
/// [`MAX_TRANSFER_RETRIES`] times.
pub async fn download(
    session: &Session,
    remote_path: &RemotePath,
    local_path: &Path,
    sync_event: Option<&dyn ProgressSink>,
) -> Result<FileMetadata, RemoteError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match download_once(session, remote_path, local_path, sync_event).await {
            Ok(metadata) => return Ok(metadata),
            Err(err @ RemoteError::DataCorruptionError { .. }) if attempt < MAX_TRANSFER_RETRIES => {
                warn!(attempt, error = %err, path = %remote_path, "retrying corrupted download");
            }
            Err(err) => return Err(err),
        }
    }
}

async fn download_once(
    session: &Session,
    remote_path: &RemotePath,
    local_path: &Path,
    sync_event: Option<&dyn ProgressSink>,
) -> Result<FileMetadata, RemoteError> {
    debug!(path = %remote_path, "files_download");

    let arg = DownloadArg {
        path: remote_path.as_str(),
    };
    let response = session.post_json_raw(DOWNLOAD_PATH, &arg).await?;

    let metadata: FileMetadata = response
        .headers()
        .get(RESULT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| serde_json::from_str(v).ok())
        .ok_or_else(|| RemoteError::RemoteServerError("missing download result header".to_string()))?;

    if let Some(target) = metadata.symlink_target.clone() {
        let _ = fs::remove_file(local_path);
        symlink(&target, local_path)
            .map_err(|e| RemoteError::RemoteServerError(format!("failed to create symlink: {e}")))?;
        return Ok(metadata);
    }

    let file = open_no_symlink(local_path)
        .map_err(|e| RemoteError::RemoteServerError(format!("failed to open {local_path:?}: {e}")))?;
    let mut hasher = StreamHasher::new(file);

    let mut written: u64 = 0;
    let body = response
        .bytes()
        .await
        .map_err(RemoteError::NetworkError)?;
    for chunk in body.chunks(READ_CHUNK_SIZE) {
        hasher
            .write_all(chunk)
            .map_err(|e| RemoteError::RemoteServerError(format!("write to {local_path:?} failed: {e}")))?;
        written += chunk.len() as u64;
        if let Some(sink) = sync_event {
            sink.on_progress(SyncEvent {
                size: Some(metadata.size),
                completed: written,
            });
        }
    }

    let (written_file, digest) = hasher
        .finish()
        .map_err(|e| RemoteError::RemoteServerError(format!("finalize write failed: {e}")))?;

    if digest != metadata.content_hash {
        let _ = fs::remove_file(local_path);
        return Err(RemoteError::DataCorruptionError {
            path: remote_path.as_str().to_string(),
        });
    }

    let client_mod = metadata.client_modified.timestamp();
    let server_mod = metadata.server_modified.timestamp();
    let now = Utc::now().timestamp();
    let mtime = client_mod.min(server_mod).min(now).max(0) as u64;
    set_mtime(&written_file, mtime)
        .map_err(|e| RemoteError::RemoteServerError(format!("failed to set mtime: {e}")))?;

    Ok(metadata)
}

#[cfg(unix)]
fn open_no_symlink(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)
}

#[cfg(not(unix))]
fn open_no_symlink(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).write(true).truncate(true).open(path)
}

#[cfg(unix)]
fn symlink(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &str, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlink reproduction is unix-only",
    ))
}

#[cfg(unix)]
fn set_mtime(file: &File, epoch_seconds: u64) -> std::io::Result<()> {
    use std::time::{Duration, UNIX_EPOCH};
    // Sets mtime via the already-open handle rather than reopening by path,
    // avoiding a second symlink-check race on the just-written file.
    let mtime = UNIX_EPOCH + Duration::from_secs(epoch_seconds);
    let atime_spec = to_timespec(std::time::SystemTime::now());
    let mtime_spec = to_timespec(mtime);
    let times = [atime_spec, mtime_spec];
    let fd = std::os::unix::io::AsRawFd::as_raw_fd(file);
    let rc = unsafe { libc::futimens(fd, times.as_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn to_timespec(t: std::time::SystemTime) -> libc::timespec {
    let duration = t
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    libc::timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as _,
    }
}

#[cfg(not(unix))]
fn set_mtime(_file: &File, _epoch_seconds: u64) -> std::io::Result<()> {
    Ok(())
}

/// Uploads `local_path` to `remote_path`, choosing a single request for files
/// no larger than `config.small_file_threshold_bytes`, or a chunked session
/// otherwise.
pub async fn upload(
    session: &Session,
    local_path: &Path,
    remote_path: &RemotePath,
    config: &TransferConfig,
    mode: WriteMode,
    autorename: bool,
    sync_event: Option<&dyn ProgressSink>,
) -> Result<FileMetadata, RemoteError> {
    let chunk_size = config
        .chunk_size_bytes
        .clamp(config.chunk_size_min_bytes, config.chunk_size_max_bytes);

    let metadata = fs::metadata(local_path)
        .map_err(|e| RemoteError::RemoteServerError(format!("stat {local_path:?} failed: {e}")))?;
    let total = metadata.len();
    let client_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| DateTime::<Utc>::from_timestamp(d.as_secs() as i64, 0).unwrap_or_else(Utc::now))
        .unwrap_or_else(Utc::now);

    if total <= chunk_size {
        upload_small(session, local_path, remote_path, client_modified, mode, autorename, sync_event).await
    } else {
        upload_chunked(
            session,
            local_path,
            remote_path,
            total,
            chunk_size,
            client_modified,
            mode,
            autorename,
            sync_event,
        )
        .await
    }
}

async fn upload_small(
    session: &Session,
    local_path: &Path,
    remote_path: &RemotePath,
    client_modified: DateTime<Utc>,
    mode: WriteMode,
    autorename: bool,
    sync_event: Option<&dyn ProgressSink>,
) -> Result<FileMetadata, RemoteError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let data = fs::read(local_path)
            .map_err(|e| RemoteError::RemoteServerError(format!("read {local_path:?} failed: {e}")))?;
        let hash = ContentHasher::hash(&data);
        let arg = UploadArg {
            path: remote_path.as_str(),
            mode: mode.clone(),
            autorename,
            client_modified,
            content_hash: hash.as_str(),
        };
        debug!(path = %remote_path, size = data.len(), "files_upload");

        let arg_json = serde_json::to_string(&arg).unwrap_or_default();
        let len = data.len() as u64;
        match session
            .put_bytes::<FileMetadata>(UPLOAD_PATH, &arg_json, data)
            .await
        {
            Ok(metadata) => {
                if let Some(sink) = sync_event {
                    sink.on_progress(SyncEvent {
                        size: Some(len),
                        completed: len,
                    });
                }
                return Ok(metadata);
            }
            Err(err) if is_corruption(&err) && attempt < MAX_TRANSFER_RETRIES => {
                warn!(attempt, error = %err, "retrying corrupted small upload");
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_corruption(err: &RemoteError) -> bool {
    matches!(err, RemoteError::DataCorruptionError { .. })
}

#[allow(clippy::too_many_arguments)]
async fn upload_chunked(
    session: &Session,
    local_path: &Path,
    remote_path: &RemotePath,
    total: u64,
    chunk_size: u64,
    client_modified: DateTime<Utc>,
    mode: WriteMode,
    autorename: bool,
    sync_event: Option<&dyn ProgressSink>,
) -> Result<FileMetadata, RemoteError> {
    let mut file = File::open(local_path)
        .map_err(|e| RemoteError::RemoteServerError(format!("open {local_path:?} failed: {e}")))?;

    let session_id = session_start_with_retry(session, &mut file, chunk_size).await?;
    if let Some(sink) = sync_event {
        sink.on_progress(SyncEvent {
            size: Some(total),
            completed: file.stream_position().unwrap_or(0),
        });
    }

    while total - file.stream_position().unwrap_or(0) > chunk_size {
        session_append_with_retry(session, &mut file, &session_id, chunk_size).await?;
        if let Some(sink) = sync_event {
            sink.on_progress(SyncEvent {
                size: Some(total),
                completed: file.stream_position().unwrap_or(0),
            });
        }
    }

    let metadata = session_finish_with_retry(
        session,
        &mut file,
        &session_id,
        chunk_size,
        remote_path,
        client_modified,
        mode,
        autorename,
    )
    .await?;

    if let Some(sink) = sync_event {
        sink.on_progress(SyncEvent {
            size: Some(total),
            completed: total,
        });
    }

    Ok(metadata)
}

async fn session_start_with_retry(
    session: &Session,
    file: &mut File,
    chunk_size: u64,
) -> Result<String, RemoteError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let initial_offset = file.stream_position().unwrap_or(0);
        let data = read_chunk(file, chunk_size)?;
        let hash = ContentHasher::hash(&data);
        let arg = SessionStartArg {
            content_hash: hash.as_str(),
        };
        match session
            .post_json::<_, SessionStartResult>(SESSION_START_PATH, &arg)
            .await
        {
            Ok(result) => return Ok(result.session_id),
            Err(err) if is_corruption(&err) && attempt < MAX_TRANSFER_RETRIES => {
                seek(file, initial_offset)?;
                warn!(attempt, "retrying upload_session/start after data corruption");
            }
            Err(err) => {
                seek(file, initial_offset)?;
                return Err(err);
            }
        }
    }
}

async fn session_append_with_retry(
    session: &Session,
    file: &mut File,
    session_id: &str,
    chunk_size: u64,
) -> Result<(), RemoteError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let initial_offset = file.stream_position().unwrap_or(0);
        let data = read_chunk(file, chunk_size)?;
        let hash = ContentHasher::hash(&data);
        let arg = SessionAppendArg {
            cursor: UploadCursor {
                session_id,
                offset: initial_offset,
            },
            content_hash: hash.as_str(),
        };
        match session
            .post_json::<_, serde_json::Value>(SESSION_APPEND_PATH, &arg)
            .await
        {
            Ok(_) => return Ok(()),
            Err(RemoteError::SyncError(msg)) if msg.contains(INCORRECT_OFFSET_TAG) => {
                if let Ok(offset) = parse_incorrect_offset(&msg) {
                    seek(file, offset)?;
                } else {
                    seek(file, initial_offset)?;
                }
                return Err(RemoteError::SyncError(msg));
            }
            Err(err) if is_corruption(&err) && attempt < MAX_TRANSFER_RETRIES => {
                seek(file, initial_offset)?;
                warn!(attempt, "retrying upload_session/append after data corruption");
            }
            Err(err) => {
                seek(file, initial_offset)?;
                return Err(err);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn session_finish_with_retry(
    session: &Session,
    file: &mut File,
    session_id: &str,
    chunk_size: u64,
    remote_path: &RemotePath,
    client_modified: DateTime<Utc>,
    mode: WriteMode,
    autorename: bool,
) -> Result<FileMetadata, RemoteError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let initial_offset = file.stream_position().unwrap_or(0);
        let data = read_chunk(file, chunk_size)?;
        let hash = ContentHasher::hash(&data);
        let arg = SessionFinishArg {
            cursor: UploadCursor {
                session_id,
                offset: initial_offset,
            },
            commit: CommitInfo {
                path: remote_path.as_str(),
                client_modified,
                mode: mode.clone(),
                autorename,
            },
            content_hash: hash.as_str(),
        };
        match session
            .post_json::<_, FileMetadata>(SESSION_FINISH_PATH, &arg)
            .await
        {
            Ok(metadata) => return Ok(metadata),
            Err(RemoteError::SyncError(msg)) if msg.contains(INCORRECT_OFFSET_TAG) => {
                if let Ok(offset) = parse_incorrect_offset(&msg) {
                    seek(file, offset)?;
                } else {
                    seek(file, initial_offset)?;
                }
                return Err(RemoteError::SyncError(msg));
            }
            Err(err) if is_corruption(&err) && attempt < MAX_TRANSFER_RETRIES => {
                seek(file, initial_offset)?;
                warn!(attempt, "retrying upload_session/finish after data corruption");
            }
            Err(err) => {
                seek(file, initial_offset)?;
                return Err(err);
            }
        }
    }
}

fn parse_incorrect_offset(msg: &str) -> Result<u64, ()> {
    serde_json::from_str::<IncorrectOffset>(msg)
        .map(|v| v.correct_offset)
        .map_err(|_| ())
}

fn read_chunk(file: &mut File, chunk_size: u64) -> Result<Vec<u8>, RemoteError> {
    let mut buf = vec![0u8; chunk_size as usize];
    let mut total_read = 0usize;
    loop {
        let n = file
            .read(&mut buf[total_read..])
            .map_err(|e| RemoteError::RemoteServerError(format!("read failed: {e}")))?;
        if n == 0 {
            break;
        }
        total_read += n;
        if total_read == buf.len() {
            break;
        }
    }
    buf.truncate(total_read);
    Ok(buf)
}

fn seek(file: &mut File, offset: u64) -> Result<(), RemoteError> {
    file.seek(SeekFrom::Start(offset))
        .map(|_| ())
        .map_err(|e| RemoteError::RemoteServerError(format!("seek failed: {e}")))
}
