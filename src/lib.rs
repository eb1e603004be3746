//! Workspace entry crate.
//!
//! Re-exports the catalog client façade from `core-service` so host
//! applications can depend on `catalog-workspace` alone and pick bridge
//! defaults through its feature flags.

pub use core_service::*;
