//! Per-session catalog context.
//!
//! Everything that lives exactly as long as one login: the login session, the
//! catalog cache, the sync lock and the ticker's shutdown token. Created by
//! whoever starts the sync engine, passed by reference to every operation and
//! replaced wholesale at logout.

use core_auth::Session;
use core_library::CatalogCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct SessionContext {
    session: Session,
    cache: Arc<CatalogCache>,
    /// Held by the single writer for the duration of a sync pass
    sync_lock: Mutex<()>,
    ticks: AtomicU64,
    shutdown: CancellationToken,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Retire this context: stops its ticker and makes further sync passes
    /// fail with `SessionRetired`.
    pub fn retire(&self) {
        self.shutdown.cancel();
    }

    pub fn is_retired(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync_lock.try_lock().is_err()
    }

    pub(crate) async fn lock_sync(&self) -> MutexGuard<'_, ()> {
        self.sync_lock.lock().await
    }

    pub(crate) fn try_lock_sync(&self) -> Option<MutexGuard<'_, ()>> {
        self.sync_lock.try_lock().ok()
    }

    /// Count a tick; returns the new tick number (first tick is 1).
    pub(crate) fn next_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}
