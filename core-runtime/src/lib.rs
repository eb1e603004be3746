//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the catalog core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Login status notification
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its configuration types, its
//! logging conventions and the event channel that carries login and sync
//! progress to observers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod notifier;

pub use config::{CatalogConfig, CatalogConfigBuilder, LoginSettings, SyncSettings};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, LoginStatus};
pub use notifier::{LoginNotifier, LoginStatusSubscriber, SubscriberId};
