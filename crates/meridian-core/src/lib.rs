//! Meridian Core - domain types and configuration for the Remote Client Layer
//!
//! This crate holds the parts of the remote sync client that have no
//! business talking to the network themselves:
//! - **Domain types** - validated newtypes (`RemotePath`, `RemoteId`,
//!   `ContentHash`, `Cursor`) and the domain error taxonomy
//! - **Port definitions** - `CredentialStore`, `StateStore`, `ProgressSink`,
//!   traits the transport layer depends on without implementing
//! - **Configuration** - `Config`/`ConfigBuilder` for the tunables that
//!   govern retries, chunking, and long-poll timeouts
//!
//! `meridian-remote` depends on this crate for its vocabulary; this crate
//! has no knowledge of HTTP, OAuth, or any particular wire format.

pub mod config;
pub mod domain;
pub mod ports;
