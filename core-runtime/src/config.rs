//! # Core Configuration Module
//!
//! Configuration for the catalog core.
//!
//! ## Overview
//!
//! [`CatalogConfig`] is assembled with a builder that holds the injected bridges
//! and the login/sync timing policy. `build()` validates everything up front so
//! misconfiguration fails at startup rather than inside the background worker.
//!
//! ## Required Dependencies
//!
//! - `RemoteCatalogClient` - always supplied by the host
//!
//! ## Dependencies with desktop defaults
//!
//! - `CredentialStore` - `KeyringCredentialStore`
//! - `ConnectivityProbe` - `HttpConnectivityProbe` against `https://www.google.com/`
//!
//! Without the `desktop-shims` feature both must be injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CatalogConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CatalogConfig::builder()
//!     .remote(Arc::new(MyRemoteClient::new()))
//!     .credential_store(Arc::new(MyEncryptedSettings::open()?))
//!     .connectivity_probe(Arc::new(StaticProbe(true)))
//!     .connectivity_retry_delay(Duration::from_secs(5))
//!     .snapshot_path("/var/lib/catalog/snapshot.json")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, ConnectivityProbe, CredentialStore, RemoteCatalogClient, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Login timing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSettings {
    /// Connectivity probes allowed for a user-initiated login
    pub interactive_attempts: u32,
    /// Connectivity probes allowed for an automatic token re-login
    pub routine_attempts: u32,
    /// Fixed delay between two connectivity probes
    pub retry_delay: Duration,
    /// Hardware-derived device id; a stable one is synthesized when absent
    pub hardware_device_id: Option<String>,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            interactive_attempts: 12,
            routine_attempts: 1,
            retry_delay: Duration::from_secs(10),
            hardware_device_id: None,
        }
    }
}

/// Periodic sync policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Base period of the ticker
    pub tick_period: Duration,
    /// A delta sync runs on every Nth tick
    pub delta_sync_every_ticks: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            delta_sync_every_ticks: 300,
        }
    }
}

impl SyncSettings {
    /// Wall-clock interval between two delta syncs.
    pub fn delta_interval(&self) -> Duration {
        self.tick_period
            .saturating_mul(u32::try_from(self.delta_sync_every_ticks).unwrap_or(u32::MAX))
    }
}

/// Core configuration for the catalog client.
///
/// Use [`CatalogConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Remote music service client (required)
    pub remote: Arc<dyn RemoteCatalogClient>,

    /// Login/token/device id persistence
    pub credential_store: Arc<dyn CredentialStore>,

    /// Internet reachability check
    pub connectivity_probe: Arc<dyn ConnectivityProbe>,

    /// Time source for sync cursors
    pub clock: Arc<dyn Clock>,

    pub login: LoginSettings,

    pub sync: SyncSettings,

    /// Where the catalog snapshot is persisted; `None` keeps it in memory only
    pub snapshot_path: Option<PathBuf>,

    /// Event bus capacity
    pub event_buffer_size: usize,

    /// When `false`, startup does not attempt an automatic login
    pub enabled: bool,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("remote", &"RemoteCatalogClient { ... }")
            .field("credential_store", &"CredentialStore { ... }")
            .field("connectivity_probe", &"ConnectivityProbe { ... }")
            .field("login", &self.login)
            .field("sync", &self.sync)
            .field("snapshot_path", &self.snapshot_path)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl CatalogConfig {
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.sync.tick_period.is_zero() {
            return Err(Error::Config("Tick period must be greater than zero".to_string()));
        }

        if self.sync.delta_sync_every_ticks == 0 {
            return Err(Error::Config(
                "Delta sync interval must be at least one tick".to_string(),
            ));
        }

        if self.login.interactive_attempts == 0 || self.login.routine_attempts == 0 {
            return Err(Error::Config(
                "Login attempt budgets must allow at least one connectivity probe".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if let Some(id) = &self.login.hardware_device_id {
            if id.trim().is_empty() {
                return Err(Error::Config(
                    "Hardware device id cannot be blank; leave it unset to synthesize one"
                        .to_string(),
                ));
            }
        }

        if let Some(path) = &self.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Snapshot path cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_credential_store() -> Result<Arc<dyn CredentialStore>> {
    use bridge_desktop::KeyringCredentialStore;

    let store: Arc<dyn CredentialStore> = Arc::new(KeyringCredentialStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_credential_store() -> Result<Arc<dyn CredentialStore>> {
    Err(Error::CapabilityMissing {
        capability: "CredentialStore".to_string(),
        message: "CredentialStore implementation is required to persist login and token. \
                 Desktop: enable the 'desktop-shims' feature to use KeyringCredentialStore. \
                 Service hosts: inject the host's encrypted settings store."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_probe() -> Result<Arc<dyn ConnectivityProbe>> {
    use bridge_desktop::HttpConnectivityProbe;

    let probe = HttpConnectivityProbe::new().map_err(|e| Error::CapabilityMissing {
        capability: "ConnectivityProbe".to_string(),
        message: format!("Default HTTP connectivity probe unavailable: {}", e),
    })?;
    let probe: Arc<dyn ConnectivityProbe> = Arc::new(probe);
    Ok(probe)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_probe() -> Result<Arc<dyn ConnectivityProbe>> {
    Err(Error::CapabilityMissing {
        capability: "ConnectivityProbe".to_string(),
        message: "ConnectivityProbe implementation is required to gate login and refresh. \
                 Desktop: enable the 'desktop-shims' feature to use HttpConnectivityProbe."
            .to_string(),
    })
}

/// Builder for [`CatalogConfig`].
#[derive(Default)]
pub struct CatalogConfigBuilder {
    remote: Option<Arc<dyn RemoteCatalogClient>>,
    credential_store: Option<Arc<dyn CredentialStore>>,
    connectivity_probe: Option<Arc<dyn ConnectivityProbe>>,
    clock: Option<Arc<dyn Clock>>,
    login: LoginSettings,
    sync: SyncSettings,
    snapshot_path: Option<PathBuf>,
    event_buffer_size: Option<usize>,
    disabled: bool,
}

impl CatalogConfigBuilder {
    /// Sets the remote catalog client (required).
    pub fn remote(mut self, remote: Arc<dyn RemoteCatalogClient>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn connectivity_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.connectivity_probe = Some(probe);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn tick_period(mut self, period: Duration) -> Self {
        self.sync.tick_period = period;
        self
    }

    pub fn delta_sync_every_ticks(mut self, ticks: u64) -> Self {
        self.sync.delta_sync_every_ticks = ticks;
        self
    }

    pub fn interactive_login_attempts(mut self, attempts: u32) -> Self {
        self.login.interactive_attempts = attempts;
        self
    }

    pub fn routine_login_attempts(mut self, attempts: u32) -> Self {
        self.login.routine_attempts = attempts;
        self
    }

    pub fn connectivity_retry_delay(mut self, delay: Duration) -> Self {
        self.login.retry_delay = delay;
        self
    }

    pub fn hardware_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.login.hardware_device_id = Some(device_id.into());
        self
    }

    /// Persist the catalog snapshot at `path`.
    pub fn snapshot_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Disable automatic login at startup.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.disabled = !enabled;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// Fails when the remote client is missing, when a bridge without a desktop
    /// default is missing, or when a timing value is out of range.
    pub fn build(self) -> Result<CatalogConfig> {
        let remote = self.remote.ok_or_else(|| Error::CapabilityMissing {
            capability: "RemoteCatalogClient".to_string(),
            message: "A remote catalog client must be injected with .remote(); \
                     the core does not speak the service's wire protocol itself."
                .to_string(),
        })?;

        let credential_store = match self.credential_store {
            Some(store) => store,
            None => provide_default_credential_store()?,
        };

        let connectivity_probe = match self.connectivity_probe {
            Some(probe) => probe,
            None => provide_default_probe()?,
        };

        let config = CatalogConfig {
            remote,
            credential_store,
            connectivity_probe,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            login: self.login,
            sync: self.sync,
            snapshot_path: self.snapshot_path,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            enabled: !self.disabled,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        LoginRequest, LoginResponse, PlaylistBatch, RemoteDevice, StaticProbe, StoredCredentials,
        TrackBatch,
    };
    use chrono::{DateTime, Utc};

    struct NullRemote;

    #[async_trait]
    impl RemoteCatalogClient for NullRemote {
        async fn login(&self, _request: LoginRequest) -> BridgeResult<LoginResponse> {
            Ok(LoginResponse::rejected())
        }
        async fn logout(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_all_tracks(&self) -> BridgeResult<Option<TrackBatch>> {
            Ok(None)
        }
        async fn get_updated_tracks(
            &self,
            _since: DateTime<Utc>,
        ) -> BridgeResult<Option<TrackBatch>> {
            Ok(None)
        }
        async fn get_all_playlists(&self) -> BridgeResult<Option<PlaylistBatch>> {
            Ok(None)
        }
        async fn get_stream_url(
            &self,
            _track_id: &str,
            _device_id: u64,
        ) -> BridgeResult<Option<String>> {
            Ok(None)
        }
        async fn get_account_devices(&self) -> BridgeResult<Option<Vec<RemoteDevice>>> {
            Ok(None)
        }
    }

    struct NullStore;

    #[async_trait]
    impl CredentialStore for NullStore {
        async fn save(&self, _credentials: &StoredCredentials) -> BridgeResult<()> {
            Ok(())
        }
        async fn load(&self) -> BridgeResult<Option<StoredCredentials>> {
            Ok(None)
        }
    }

    fn builder() -> CatalogConfigBuilder {
        CatalogConfig::builder()
            .remote(Arc::new(NullRemote))
            .credential_store(Arc::new(NullStore))
            .connectivity_probe(Arc::new(StaticProbe(true)))
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.sync.tick_period, Duration::from_secs(1));
        assert_eq!(config.sync.delta_sync_every_ticks, 300);
        assert_eq!(config.sync.delta_interval(), Duration::from_secs(300));
        assert_eq!(config.login.interactive_attempts, 12);
        assert_eq!(config.login.routine_attempts, 1);
        assert_eq!(config.login.retry_delay, Duration::from_secs(10));
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.snapshot_path.is_none());
        assert!(config.enabled);
    }

    #[test]
    fn test_missing_remote_is_capability_error() {
        let result = CatalogConfig::builder()
            .credential_store(Arc::new(NullStore))
            .connectivity_probe(Arc::new(StaticProbe(true)))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "RemoteCatalogClient")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zero_tick_period_rejected() {
        let result = builder().tick_period(Duration::ZERO).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_delta_interval_rejected() {
        let result = builder().delta_sync_every_ticks(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_attempt_budget_rejected() {
        assert!(builder().routine_login_attempts(0).build().is_err());
        assert!(builder().interactive_login_attempts(0).build().is_err());
    }

    #[test]
    fn test_blank_hardware_device_id_rejected() {
        assert!(builder().hardware_device_id("  ").build().is_err());
    }

    #[test]
    fn test_custom_values() {
        let config = builder()
            .tick_period(Duration::from_millis(10))
            .delta_sync_every_ticks(5)
            .connectivity_retry_delay(Duration::from_millis(1))
            .hardware_device_id("3f2a")
            .snapshot_path("/tmp/catalog.json")
            .enabled(false)
            .build()
            .unwrap();

        assert_eq!(config.sync.delta_interval(), Duration::from_millis(50));
        assert_eq!(config.login.hardware_device_id.as_deref(), Some("3f2a"));
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/catalog.json")));
        assert!(!config.enabled);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_store_without_desktop_shims() {
        let result = CatalogConfig::builder()
            .remote(Arc::new(NullRemote))
            .connectivity_probe(Arc::new(StaticProbe(true)))
            .build();
        assert!(matches!(result, Err(Error::CapabilityMissing { .. })));
    }
}
