//! Credential Storage using OS Keychain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{CredentialStore, StoredCredentials},
};
use keyring::Entry;
use tracing::{debug, error};

const DEFAULT_SERVICE_NAME: &str = "catalog-core";
const CREDENTIALS_KEY: &str = "credentials";

/// Keyring-based credential store
///
/// The whole record is stored as one keychain entry, encrypted at rest by the
/// platform:
/// - macOS: Keychain
/// - Windows: Credential Manager (DPAPI)
/// - Linux: Secret Service (libsecret)
pub struct KeyringCredentialStore {
    service_name: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE_NAME)
    }

    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service_name, CREDENTIALS_KEY).map_err(map_keyring_error)
    }

    /// Remove the record entirely.
    pub async fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service_name, "Cleared stored credentials");
                Ok(())
            }
            Err(e) => Err(map_keyring_error(e)),
        }
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_keyring_error(e: keyring::Error) -> BridgeError {
    BridgeError::OperationFailed(format!("Keyring error: {}", e))
}

fn encode(credentials: &StoredCredentials) -> Result<String> {
    let json = serde_json::to_vec(credentials)?;
    Ok(STANDARD.encode(json))
}

fn decode(encoded: &str) -> Result<StoredCredentials> {
    let bytes = STANDARD.decode(encoded).map_err(|e| {
        BridgeError::OperationFailed(format!("Failed to decode credentials: {}", e))
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        let encoded = encode(credentials)?;
        self.entry()?
            .set_password(&encoded)
            .map_err(map_keyring_error)?;

        debug!(
            service = %self.service_name,
            has_token = credentials.has_token(),
            "Stored credentials in keyring"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredCredentials>> {
        match self.entry()?.get_password() {
            Ok(encoded) => {
                let credentials = decode(&encoded).map_err(|e| {
                    error!(
                        service = %self.service_name,
                        error = %e,
                        "Stored credentials are corrupt"
                    );
                    e
                })?;
                Ok(Some(credentials))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service_name, "No credentials in keyring");
                Ok(None)
            }
            Err(e) => Err(map_keyring_error(e)),
        }
    }
}
