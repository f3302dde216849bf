//! Integration test for account info / path root bootstrapping

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use meridian_core::config::RetryConfig;
use meridian_core::ports::{Credential, CredentialStore, CredentialStoreError, StateStore, StateStoreError};
use meridian_remote::client::RemoteClient;

use crate::common;

struct MemoryCredentialStore {
    credential: StdMutex<Option<Credential>>,
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, _account_id: &str) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self.credential.lock().unwrap().clone())
    }

    async fn store(&self, _account_id: &str, credential: &Credential) -> Result<(), CredentialStoreError> {
        *self.credential.lock().unwrap() = Some(credential.clone());
        Ok(())
    }

    async fn delete(&self, _account_id: &str) -> Result<(), CredentialStoreError> {
        *self.credential.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStateStore {
    values: StdMutex<HashMap<(String, String), String>>,
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, section: &str, key: &str) -> Result<Option<String>, StateStoreError> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(&(section.to_string(), key.to_string()))
            .cloned())
    }

    async fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StateStoreError> {
        self.values
            .lock()
            .unwrap()
            .insert((section.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn clear(&self, section: &str, key: &str) -> Result<(), StateStoreError> {
        self.values
            .lock()
            .unwrap()
            .remove(&(section.to_string(), key.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn get_user_info_returns_profile_and_quota_and_adopts_home_namespace() {
    let (server, _session) = common::mock_session().await;
    common::mount_account_info(&server, "ns-123").await;

    let credentials = Arc::new(MemoryCredentialStore {
        credential: StdMutex::new(Some(Credential {
            access_token: "test-access-token".to_string(),
            refresh_token: None,
        })),
    });
    let state = Arc::new(MemoryStateStore::default());

    let client = RemoteClient::with_base_url(
        "acct-1",
        server.uri(),
        credentials,
        state.clone(),
        RetryConfig { max_attempts: 1 },
    );

    let info = client.get_user_info().await.expect("get_user_info failed");

    assert_eq!(info.email, "test@example.com");
    assert_eq!(info.display_name, "Test User");
    assert_eq!(info.quota_total, 5_368_709_120);
    assert_eq!(info.quota_used, 1_073_741_824);

    assert_eq!(client.namespace_id().await, Some("ns-123".to_string()));
    assert_eq!(
        state.get("account", "path_root_nsid").await.unwrap(),
        Some("ns-123".to_string())
    );
}

#[tokio::test]
async fn link_stores_credential_and_updates_path_root() {
    let (server, _session) = common::mock_session().await;
    common::mount_account_info(&server, "ns-456").await;

    let credentials = Arc::new(MemoryCredentialStore {
        credential: StdMutex::new(None),
    });
    let state = Arc::new(MemoryStateStore::default());

    let client = RemoteClient::with_base_url(
        "acct-1",
        server.uri(),
        credentials,
        state,
        RetryConfig { max_attempts: 1 },
    );

    client
        .link(Credential {
            access_token: "test-access-token".to_string(),
            refresh_token: Some("refresh".to_string()),
        })
        .await
        .expect("link failed");

    assert_eq!(client.namespace_id().await, Some("ns-456".to_string()));
    assert!(!client.is_team_space().await);
}
