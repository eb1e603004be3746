//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (remote catalog
//! client, credential store, connectivity probe, clock) into the catalog core
//! and exposes the result as a single [`CatalogService`]. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) so the credential store and probe have working defaults.

pub mod error;
pub mod service;

pub use error::{CoreError, Result};
pub use service::CatalogService;

pub use core_library::{Album, AlbumArtist, AlbumKind, Playlist, Track, TrackOrdering};
pub use core_runtime::config::{CatalogConfig, CatalogConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventStream, LoginStatus};
pub use core_runtime::notifier::{LoginStatusSubscriber, SubscriberId};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{HttpConnectivityProbe, KeyringCredentialStore, ProbeConfig};
