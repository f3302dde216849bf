//! Port definitions
//!
//! This module defines the trait boundaries the Remote Client Layer
//! depends on but does not implement itself.
//!
//! ## Ports Overview
//!
//! - [`CredentialStore`] - persists OAuth2 tokens for a linked account
//! - [`StateStore`] - persists small string facts (cursor, path root)
//! - [`ProgressSink`] - receives transfer progress updates

pub mod credential_store;
pub mod state_store;
pub mod sync_event;

pub use credential_store::{Credential, CredentialStore, CredentialStoreError, TokenKind};
pub use state_store::{StateStore, StateStoreError};
pub use sync_event::{ProgressSink, SyncEvent};
