//! Transfer progress reporting
//!
//! Uploads and downloads report progress through this trait rather than
//! a bare callback closure, so embedders can route progress into a UI,
//! a log, or nowhere at all.

/// A single progress update for an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEvent {
    /// Total size of the transfer in bytes, if known up front.
    pub size: Option<u64>,
    /// Bytes transferred so far.
    pub completed: u64,
}

/// Receives transfer progress updates.
///
/// The default no-op implementation lets callers that don't care about
/// progress pass `()` wherever a `&dyn ProgressSink` is expected.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: SyncEvent);
}

impl ProgressSink for () {
    fn on_progress(&self, _event: SyncEvent) {}
}
