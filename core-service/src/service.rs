//! # Catalog Service
//!
//! Control and read surface of the catalog client.
//!
//! ## Overview
//!
//! [`CatalogService`] owns the active [`SessionContext`] and hands it to the
//! auth manager and sync engine on every call. Logins run on a background
//! task: [`CatalogService::login`] moves the session to `LoggingIn`, spawns
//! the attempt and returns. The outcome is observed through the login status
//! stream or through [`CatalogService::is_logged_in`]. A successful login
//! bootstraps the catalog and starts the periodic ticker.
//!
//! Logout retires the active context, which stops its ticker, and swaps in a
//! fresh one. A sync pass still running against the retired context finishes
//! into a cache nobody reads anymore.
//!
//! ## Usage
//!
//! ```ignore
//! let service = CatalogService::new(config)?;
//! service.start().await?;
//!
//! let mut statuses = service.login_statuses();
//! service.login("jane@example.com", "hunter2")?;
//! while let Ok(event) = statuses.recv().await {
//!     if event.login_status().is_some_and(|s| s.is_terminal()) {
//!         break;
//!     }
//! }
//!
//! for album in service.albums().iter() {
//!     println!("{}", album.display_title);
//! }
//! ```

use core_auth::{AuthError, AuthManager, PendingLogin};
use core_library::{Album, AlbumArtist, Collection, Playlist, Track, TrackOrdering};
use core_runtime::config::CatalogConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, EventStream, LoginStatus};
use core_runtime::notifier::{LoginNotifier, LoginStatusSubscriber, SubscriberId};
use core_sync::{SessionContext, SyncEngine, SyncReport};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{CoreError, Result};

struct ServiceInner {
    config: CatalogConfig,
    auth: AuthManager,
    engine: Arc<SyncEngine>,
    notifier: LoginNotifier,
    events: EventBus,
    context: RwLock<Arc<SessionContext>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

/// Primary façade exposed to host applications.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<ServiceInner>,
}

impl CatalogService {
    /// Wire the injected bridges into an auth manager and a sync engine.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let notifier = LoginNotifier::new(events.clone());
        let auth = AuthManager::new(
            config.remote.clone(),
            config.connectivity_probe.clone(),
            config.credential_store.clone(),
            notifier.clone(),
            config.login.clone(),
        );
        let engine = SyncEngine::new(
            config.remote.clone(),
            config.connectivity_probe.clone(),
            config.clock.clone(),
            events.clone(),
            config.sync.clone(),
        )
        .with_snapshot_path(config.snapshot_path.clone());

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                auth,
                engine: Arc::new(engine),
                notifier,
                events,
                context: RwLock::new(Arc::new(SessionContext::new())),
                ticker: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    /// The active session context.
    pub fn context(&self) -> Arc<SessionContext> {
        self.inner
            .context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ---- lifecycle ---------------------------------------------------------

    /// Restore the persisted catalog and, when a token is stored, start an
    /// automatic token login with the routine attempt budget.
    ///
    /// Returns the background login task, if one was started. The session is
    /// already `LoggingIn` when it is returned. A snapshot or credential
    /// store that cannot be read is logged and ignored.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<Option<JoinHandle<()>>> {
        let context = self.context();
        if let Err(e) = self.inner.engine.load_snapshot(&context).await {
            warn!(error = %e, "Ignoring unreadable catalog snapshot");
        }

        if !self.inner.config.enabled {
            info!("Catalog client disabled; skipping automatic login");
            return Ok(None);
        }

        let runtime = current_runtime()?;
        match self.inner.auth.begin_token_login(context.session()).await {
            Ok(pending) => {
                debug!("Stored token found; token login started");
                let attempts = self.inner.config.login.routine_attempts;
                Ok(Some(self.spawn_login(&runtime, context, pending, attempts)))
            }
            Err(AuthError::NoStoredCredentials) => {
                debug!("No stored token; waiting for an interactive login");
                Ok(None)
            }
            Err(AuthError::CredentialStore(e)) => {
                warn!(error = %e, "Failed to read stored credentials");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start an interactive login with the interactive attempt budget.
    ///
    /// The session is `LoggingIn` and `Busy` has been published by the time
    /// this returns; the rest of the attempt runs on the returned task.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidInput` - blank user or secret
    /// - `AuthError::LoginInProgress` / `AuthError::AlreadyLoggedIn`
    /// - `core_runtime::Error::Internal` - called outside a tokio runtime
    pub fn login(&self, user: &str, secret: &str) -> Result<JoinHandle<()>> {
        let runtime = current_runtime()?;
        let context = self.context();
        let pending = self
            .inner
            .auth
            .begin_master_login(context.session(), user, secret)?;

        let attempts = self.inner.config.login.interactive_attempts;
        Ok(self.spawn_login(&runtime, context, pending, attempts))
    }

    pub fn is_logging_in(&self) -> bool {
        self.context().session().is_logging_in()
    }

    pub fn is_logged_in(&self) -> bool {
        self.context().session().is_logged_in()
    }

    /// Run a delta sync now, waiting for any pass already running.
    pub async fn refresh_catalog_now(&self) -> Result<SyncReport> {
        let context = self.context();
        Ok(self.inner.engine.delta_sync(&context).await?)
    }

    /// Stop the ticker, end the session and replace the context with an
    /// empty one. The persisted snapshot is deleted.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let context = self.context();
        if !context.session().is_logged_in() {
            return Err(AuthError::NotLoggedIn.into());
        }

        context.retire();
        if self
            .inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("Ticker stopped");
        }

        self.inner.auth.logout(context.session()).await?;
        if let Err(e) = self.inner.engine.delete_snapshot().await {
            warn!(error = %e, "Failed to delete catalog snapshot");
        }

        *self
            .inner
            .context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(SessionContext::new());

        let _ = self.inner.events.emit(CoreEvent::Auth(AuthEvent::LoggedOut));
        info!("Session replaced");
        Ok(())
    }

    // ---- read surface ------------------------------------------------------

    pub fn get_track(&self, id: &str) -> Option<Arc<Track>> {
        self.context().cache().get_track(id)
    }

    pub fn get_playlist(&self, id: &str) -> Option<Arc<Playlist>> {
        self.context().cache().get_playlist(id)
    }

    /// Album by id; also finds an artist's "All tracks by" album.
    pub fn get_album(&self, id: &str) -> Option<Arc<Album>> {
        self.context().cache().get_album(id)
    }

    pub fn get_album_artist(&self, id: &str) -> Option<Arc<AlbumArtist>> {
        self.context().cache().get_album_artist(id)
    }

    pub fn tracks(&self) -> Arc<Collection<Track>> {
        self.context().cache().tracks()
    }

    pub fn sorted_tracks(&self, ordering: TrackOrdering) -> Vec<Arc<Track>> {
        self.context().cache().sorted_tracks(ordering)
    }

    pub fn playlists(&self) -> Arc<Collection<Playlist>> {
        self.context().cache().playlists()
    }

    /// Resolved tracks of a playlist, in playlist order. Entries whose track
    /// is not in the catalog are skipped.
    pub fn playlist_tracks(&self, id: &str) -> Option<Vec<Arc<Track>>> {
        let context = self.context();
        let cache = context.cache();
        cache
            .get_playlist(id)
            .map(|playlist| playlist.tracks(cache.as_ref()))
    }

    pub fn albums(&self) -> Arc<Collection<Album>> {
        self.context().cache().albums()
    }

    pub fn artists(&self) -> Arc<Collection<AlbumArtist>> {
        self.context().cache().artists()
    }

    /// Playable URL for a track; `None` when it cannot be resolved.
    pub async fn resolve_stream_url(&self, track_id: &str) -> Option<String> {
        let context = self.context();
        self.inner.engine.resolve_stream_url(&context, track_id).await
    }

    /// Playable URL for a track, or `SyncError::TrackUnavailable`.
    pub async fn require_stream_url(&self, track_id: &str) -> Result<String> {
        let context = self.context();
        Ok(self.inner.engine.require_stream_url(&context, track_id).await?)
    }

    // ---- notifications -----------------------------------------------------

    /// Every core event: login, sync and library.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    /// Login status events only.
    pub fn login_statuses(&self) -> EventStream {
        self.inner.notifier.subscribe()
    }

    /// Register a cross-process login status subscriber.
    pub fn subscribe_remote(
        &self,
        subscriber: Arc<dyn LoginStatusSubscriber>,
    ) -> Result<SubscriberId> {
        Ok(self.inner.notifier.subscribe_remote(subscriber)?)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }

    pub fn last_login_status(&self) -> Option<LoginStatus> {
        self.inner.notifier.last_status()
    }

    // ---- internals ---------------------------------------------------------

    fn spawn_login(
        &self,
        runtime: &Handle,
        context: Arc<SessionContext>,
        pending: PendingLogin,
        attempts: u32,
    ) -> JoinHandle<()> {
        let inner = self.inner.clone();
        runtime.spawn(async move { inner.run_login(context, pending, attempts).await })
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|_| {
        CoreError::Runtime(core_runtime::Error::Internal(
            "login requires a tokio runtime".to_string(),
        ))
    })
}

impl ServiceInner {
    async fn run_login(
        &self,
        context: Arc<SessionContext>,
        pending: PendingLogin,
        attempts: u32,
    ) {
        let result = self
            .auth
            .finish_login(context.session(), pending, attempts)
            .await;

        if let Err(e) = result {
            // The status was already published by the auth manager
            warn!(error = %e, "Login did not complete");
            return;
        }

        if context.is_retired() {
            debug!("Session retired during login; skipping bootstrap");
            return;
        }

        match self.engine.bootstrap(&context).await {
            Ok(report) => debug!(?report, "Initial catalog bootstrap finished"),
            Err(e) => warn!(error = %e, "Initial catalog bootstrap skipped"),
        }

        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if !context.is_retired() {
            *ticker = Some(self.engine.clone().spawn_ticker(context.clone()));
        }
    }
}
