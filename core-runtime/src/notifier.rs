//! # Login Notifier
//!
//! Single publish point for login status transitions.
//!
//! A published [`LoginStatus`] goes two ways:
//! - onto the in-process [`EventBus`] as [`AuthEvent::LoginStatusChanged`]
//! - to every registered [`LoginStatusSubscriber`], the seam a host uses to
//!   carry statuses across a process boundary (named pipe, local socket, ...)
//!
//! Delivery is best-effort. `publish` never waits on a subscriber: each remote
//! subscription owns a queue drained by its own task, so a slow or broken
//! subscriber cannot stall the login worker or its peers, and statuses reach
//! each subscriber in publish order.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::events::{AuthEvent, CoreEvent, EventBus, EventStream, LoginStatus};

/// Receiver side of a cross-process status subscription.
///
/// Returning `BridgeError::NotAvailable` tells the notifier the far end is gone
/// and the subscription is dropped; any other error is logged and ignored.
#[async_trait]
pub trait LoginStatusSubscriber: Send + Sync {
    async fn on_login_status(&self, status: LoginStatus) -> std::result::Result<(), BridgeError>;
}

/// Handle returned by [`LoginNotifier::subscribe_remote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct RemoteSubscription {
    id: SubscriberId,
    queue: mpsc::UnboundedSender<LoginStatus>,
}

#[derive(Default)]
struct NotifierState {
    subscriptions: Vec<RemoteSubscription>,
    last_status: Option<LoginStatus>,
}

/// Process-wide login status channel.
///
/// Cheap to clone; clones share subscribers.
#[derive(Clone)]
pub struct LoginNotifier {
    bus: EventBus,
    next_id: Arc<AtomicU64>,
    state: Arc<Mutex<NotifierState>>,
}

impl LoginNotifier {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            next_id: Arc::new(AtomicU64::new(1)),
            state: Arc::new(Mutex::new(NotifierState::default())),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Publish a status to every subscriber without waiting for delivery.
    pub fn publish(&self, status: LoginStatus) {
        match self
            .bus
            .emit(CoreEvent::Auth(AuthEvent::LoginStatusChanged { status }))
        {
            Ok(receivers) => debug!(%status, receivers, "Published login status"),
            Err(_) => debug!(%status, "Published login status with no in-process listeners"),
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last_status = Some(status);
        state.subscriptions.retain(|subscription| {
            let delivered = subscription.queue.send(status).is_ok();
            if !delivered {
                debug!(subscriber = subscription.id.0, "Dropping closed login status subscription");
            }
            delivered
        });
    }

    /// In-process stream of login status events only.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.bus.subscribe())
            .filter(|event| event.login_status().is_some())
    }

    /// Register a cross-process subscriber.
    ///
    /// Must be called from within a tokio runtime: the subscription's delivery
    /// task is spawned on it.
    pub fn subscribe_remote(
        &self,
        subscriber: Arc<dyn LoginStatusSubscriber>,
    ) -> Result<SubscriberId> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::Internal("login status subscriptions require a tokio runtime".to_string())
        })?;

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (queue, mut pending) = mpsc::unbounded_channel::<LoginStatus>();

        handle.spawn(async move {
            while let Some(status) = pending.recv().await {
                match subscriber.on_login_status(status).await {
                    Ok(()) => {}
                    Err(BridgeError::NotAvailable(reason)) => {
                        warn!(subscriber = id.0, %reason, "Login status subscriber went away");
                        break;
                    }
                    Err(e) => {
                        warn!(
                            subscriber = id.0,
                            %status,
                            error = %e,
                            "Login status delivery failed"
                        );
                    }
                }
            }
        });

        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .push(RemoteSubscription { id, queue });

        debug!(subscriber = id.0, "Registered login status subscriber");
        Ok(id)
    }

    /// Remove a cross-process subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.subscriptions.len();
        state.subscriptions.retain(|subscription| subscription.id != id);
        before != state.subscriptions.len()
    }

    pub fn remote_subscriber_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .len()
    }

    /// Most recently published status, for subscribers that attach late.
    pub fn last_status(&self) -> Option<LoginStatus> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_status
    }
}

impl std::fmt::Debug for LoginNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginNotifier")
            .field("remote_subscribers", &self.remote_subscriber_count())
            .field("last_status", &self.last_status())
            .finish()
    }
}
