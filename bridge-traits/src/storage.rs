//! Credential Storage Abstraction
//!
//! Persists the login name, long-lived token and device id between runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Credentials persisted between runs.
///
/// The token is handed over in clear; protecting it at rest is the store's job
/// (OS keychain, DPAPI, encrypted settings file).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub login: String,
    /// Long-lived token; `None` once invalidated
    pub token: Option<String>,
    pub device_id: String,
}

impl StoredCredentials {
    pub fn new(
        login: impl Into<String>,
        token: Option<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            token,
            device_id: device_id.into(),
        }
    }

    /// Same record with the token dropped.
    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("login", &self.login)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Credential store trait
///
/// # Platform Support
///
/// - **Desktop**: OS keychain through the `keyring` crate (`bridge-desktop`)
/// - **Service hosts**: encrypted settings file owned by the host
///
/// # Security
///
/// - Tokens must be encrypted at rest
/// - Implementations must not log token values
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist credentials, replacing any previous record
    async fn save(&self, credentials: &StoredCredentials) -> Result<()>;

    /// Load the persisted record, `Ok(None)` if nothing was saved yet
    async fn load(&self) -> Result<Option<StoredCredentials>>;

    /// Drop the stored token while keeping login and device id
    async fn invalidate_token(&self) -> Result<()> {
        if let Some(existing) = self.load().await? {
            self.save(&existing.without_token()).await?;
        }
        Ok(())
    }
}
