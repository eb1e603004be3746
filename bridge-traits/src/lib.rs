//! # Host Bridge Traits
//!
//! Contracts between the catalog core and the collaborators it does not own.
//!
//! ## Overview
//!
//! The core authenticates against a remote music service, mirrors the user's
//! catalog and keeps it fresh. Everything that touches the outside world goes
//! through one of the traits below so hosts can supply their own transport,
//! storage and connectivity checks, and tests can supply fakes.
//!
//! ## Traits
//!
//! ### Remote service
//! - [`RemoteCatalogClient`](catalog::RemoteCatalogClient) - Login, catalog fetches, stream URLs
//!
//! ### Platform Integration
//! - [`ConnectivityProbe`](network::ConnectivityProbe) - "Can we reach the internet right now"
//! - [`CredentialStore`](storage::CredentialStore) - Login, token and device id persistence
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for sync cursors and deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). The core never lets
//! a `BridgeError` from the remote client escape unclassified: it is mapped to
//! a connectivity failure, a credential rejection or "no change this cycle".
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared as
//! `Arc<dyn Trait>` across the login worker and the sync ticker.

pub mod catalog;
pub mod error;
pub mod network;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{
    LoginCredentials, LoginRequest, LoginResponse, PlaylistBatch, RemoteCatalogClient,
    RemoteDevice, RemotePlaylist, RemotePlaylistEntry, RemoteTrack, TrackBatch,
};
pub use network::{ConnectivityProbe, StaticProbe};
pub use storage::{CredentialStore, StoredCredentials};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
