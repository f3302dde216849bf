//! Remote client adapter
//!
//! Implements the file-sync agent's remote side: OAuth2 linking, an
//! authenticated RPC-style HTTP session, folder listing and the long-poll
//! change feed, chunked upload/download with content-hash verification,
//! and batch folder create/delete/share.
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE authentication flow components
//! - [`errors`] - the closed [`errors::RemoteError`] taxonomy
//! - [`retry`] - exponential backoff for transient transport failures
//! - [`hash`] - streaming content hashing used by transfers
//! - [`types`] - wire DTOs shared across modules
//! - [`session`] - authenticated HTTP transport
//! - [`delta`] - folder listing and the long-poll change feed
//! - [`transfer`] - chunked upload and download
//! - [`batch`] - batch folder create/delete and folder sharing
//! - [`metadata`] - single-item metadata, revisions, restore, and link sharing
//! - [`client`] - [`client::RemoteClient`], the session lifecycle aggregate

pub mod auth;
pub mod batch;
pub mod client;
pub mod delta;
pub mod errors;
pub mod hash;
pub mod metadata;
pub mod retry;
pub mod session;
pub mod transfer;
pub mod types;
