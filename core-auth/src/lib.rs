//! # Authentication Module
//!
//! Login session state and the login state machine.
//!
//! ## Overview
//!
//! This module manages:
//! - The per-login [`Session`] and its [`LoginState`]
//! - Master login (user/password) and token re-login via [`AuthManager`]
//! - Connectivity gating with an attempt budget
//! - Device id binding for login and for stream requests

pub mod device;
pub mod error;
pub mod manager;
pub mod types;

pub use device::{resolve_stream_device_id, synthesize_device_id};
pub use error::{AuthError, Result};
pub use manager::{AuthManager, PendingLogin};
pub use types::{LoginSession, LoginState, Session};
