//! # Event Bus System
//!
//! Typed in-process events for the catalog core, carried over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps the auth, sync and library domains
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! Login status transitions travel on this bus as
//! [`AuthEvent::LoginStatusChanged`]; the [`LoginNotifier`](crate::notifier::LoginNotifier)
//! publishes them here and fans them out to out-of-process subscribers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │ Auth Module ├──────────────>│           │     subscribe    ┌────────────┐
//! └─────────────┘               │ EventBus  ├─────────────────>│ Subscriber │
//! ┌─────────────┐     emit      │ (broadcast│                  └────────────┘
//! │ Sync Module ├──────────────>│  channel) │     subscribe    ┌────────────┐
//! └─────────────┘               │           ├─────────────────>│ Subscriber │
//!                               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus, LoginStatus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::LoginStatusChanged {
//!         status: LoginStatus::Busy,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.login_status(), Some(LoginStatus::Busy));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell `n` events behind; it can keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat it as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Login and session events
    Auth(AuthEvent),
    /// Catalog synchronization events
    Sync(SyncEvent),
    /// Catalog cache and index events
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::LoginStatusChanged { status }) if status.is_failure() => {
                EventSeverity::Error
            }
            CoreEvent::Sync(SyncEvent::FetchSkipped { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::LoginStatusChanged {
                status: LoginStatus::Success,
            }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// The login status carried by this event, if it is a status change.
    pub fn login_status(&self) -> Option<LoginStatus> {
        match self {
            CoreEvent::Auth(AuthEvent::LoginStatusChanged { status }) => Some(*status),
            _ => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Login status pushed to every Login Notifier subscriber.
///
/// These four values are the whole cross-process contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginStatus {
    /// A login attempt is running
    Busy,
    /// Credentials accepted, session open
    Success,
    /// Connectivity probes failed for the whole attempt budget
    FailureNoConnection,
    /// The service rejected the credentials
    FailureBadCredentials,
}

impl LoginStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            LoginStatus::FailureNoConnection | LoginStatus::FailureBadCredentials
        )
    }

    /// Whether this status ends a login attempt.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoginStatus::Busy)
    }
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoginStatus::Busy => "BUSY",
            LoginStatus::Success => "SUCCESS",
            LoginStatus::FailureNoConnection => "FAILURE_NO_CONNECTION",
            LoginStatus::FailureBadCredentials => "FAILURE_BAD_CREDENTIALS",
        };
        f.write_str(s)
    }
}

/// Events related to login and the session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Login status transition.
    LoginStatusChanged { status: LoginStatus },
    /// Session closed and replaced with an empty one.
    LoggedOut,
    /// The stored long-lived token was dropped after a rejection.
    TokenInvalidated,
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::LoginStatusChanged { status } => match status {
                LoginStatus::Busy => "Login in progress",
                LoginStatus::Success => "Logged in",
                LoginStatus::FailureNoConnection => "Login failed: no connection",
                LoginStatus::FailureBadCredentials => "Login failed: bad credentials",
            },
            AuthEvent::LoggedOut => "Logged out",
            AuthEvent::TokenInvalidated => "Stored token invalidated",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Kind of synchronization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncKind {
    /// Full fetch of tracks and playlists
    Bootstrap,
    /// Tracks changed since the cursor, plus a playlist re-fetch
    Delta,
}

/// Catalog collection fetched from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogCollection {
    Tracks,
    Playlists,
}

/// Events related to catalog synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Sync pass started.
    Started { kind: SyncKind },
    /// Sync pass finished; counts describe the published catalog.
    Completed {
        kind: SyncKind,
        tracks_changed: bool,
        track_count: usize,
        playlist_count: usize,
    },
    /// A remote fetch returned nothing or failed; the cached collection was kept.
    FetchSkipped {
        kind: SyncKind,
        collection: CatalogCollection,
        reason: String,
    },
    /// A tick fired while another pass was running and was dropped.
    Coalesced,
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Catalog sync started",
            SyncEvent::Completed { .. } => "Catalog sync completed",
            SyncEvent::FetchSkipped { .. } => "Remote fetch skipped",
            SyncEvent::Coalesced => "Sync tick coalesced",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to the catalog cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Album and album-artist indexes were recomputed.
    IndexesRebuilt { albums: usize, artists: usize },
    /// Catalog restored from a persisted snapshot.
    SnapshotLoaded { tracks: usize, playlists: usize },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::IndexesRebuilt { .. } => "Catalog indexes rebuilt",
            LibraryEvent::SnapshotLoaded { .. } => "Catalog snapshot loaded",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for broadcasting events to subscribers.
///
/// Cloning the bus clones the sender; all clones publish to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` bounds how far a subscriber may fall behind before it sees
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let sync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
