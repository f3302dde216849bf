//! Integration tests for meridian-remote
//!
//! Uses wiremock to simulate the remote API and verifies end-to-end
//! behavior of folder listing, transfers, batch operations, and account
//! bootstrapping.

mod common;

mod test_batch;
mod test_delta;
mod test_metadata;
mod test_sync_operations;
mod test_user_info;
