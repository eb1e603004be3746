//! # Sync Module
//!
//! Keeps the catalog cache in step with the remote music service.
//!
//! ## Overview
//!
//! This module manages:
//! - The per-login [`SessionContext`] (session, cache, sync lock, ticker shutdown)
//! - Full catalog bootstrap and periodic delta sync via [`SyncEngine`]
//! - Tick coalescing so a single writer ever touches the cache
//! - Stream URL resolution for media-serving collaborators
//!
//! ## Components
//!
//! - **Session Context** (`context`): state scoped to one login, replaced at logout
//! - **Delta Merge** (`delta`): applies changed and deleted tracks to a track list
//! - **Sync Engine** (`engine`): bootstrap, delta sync, ticker and stream URLs

pub mod context;
pub mod delta;
pub mod engine;
pub mod error;

pub use context::SessionContext;
pub use delta::{merge_track_delta, DeltaOutcome};
pub use engine::{SyncEngine, SyncReport, TickOutcome};
pub use error::{Result, SyncError};
