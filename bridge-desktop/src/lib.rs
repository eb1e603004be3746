//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - [`HttpConnectivityProbe`] probes a well-known endpoint with `reqwest`
//! - [`KeyringCredentialStore`] keeps login, token and device id in the OS keychain
//!
//! The remote catalog client is not provided here: it is supplied by the host,
//! which owns the service's wire protocol.
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HttpConnectivityProbe, KeyringCredentialStore};
//! use bridge_traits::ConnectivityProbe;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let probe = HttpConnectivityProbe::new()?;
//!     let online = probe.probe().await;
//!     let store = KeyringCredentialStore::new();
//!     Ok(())
//! }
//! ```

mod network;

#[cfg(feature = "secure-store")]
mod credential_store;

pub use network::{HttpConnectivityProbe, ProbeConfig, DEFAULT_PROBE_ENDPOINT};

#[cfg(feature = "secure-store")]
pub use credential_store::KeyringCredentialStore;
