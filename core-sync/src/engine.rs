//! # Sync Engine
//!
//! Keeps a [`SessionContext`]'s catalog cache in step with the remote service.
//!
//! ## Overview
//!
//! - **Bootstrap** fetches the whole track and playlist sets and replaces the
//!   cached collections.
//! - **Delta sync** merges tracks updated since the cache cursor and
//!   re-fetches playlists wholesale.
//! - **Tick** is driven by a fixed-period ticker; every Nth tick runs a delta
//!   sync. A tick that fires while another pass holds the sync lock is
//!   coalesced, never queued.
//!
//! Tracks and playlists are updated independently: a collection is replaced
//! only when its fetch returned a set, otherwise the cached one is kept and the
//! skip is logged. Album and artist indexes are rebuilt after every track-list
//! change, albums first.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(SyncEngine::new(remote, probe, clock, events, SyncSettings::default()));
//! let context = Arc::new(SessionContext::new());
//!
//! engine.bootstrap(&context).await?;
//! let ticker = engine.clone().spawn_ticker(context.clone());
//! ```

use bridge_traits::{Clock, ConnectivityProbe, RemoteCatalogClient};
use chrono::{DateTime, Utc};
use core_library::{CatalogSnapshot, IndexStats, Playlist, Track};
use core_runtime::config::SyncSettings;
use core_runtime::events::{
    CatalogCollection, CoreEvent, EventBus, LibraryEvent, SyncEvent, SyncKind,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::context::SessionContext;
use crate::delta::merge_track_delta;
use crate::error::{Result, SyncError};

/// What a sync pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: SyncKind,
    /// A track set (full or delta) was received and applied
    pub tracks_fetched: bool,
    /// The published track list changed
    pub tracks_changed: bool,
    pub playlists_fetched: bool,
    pub track_count: usize,
    pub playlist_count: usize,
}

/// Result of one ticker tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not a sync tick
    Idle,
    /// Another pass was running; nothing was done
    Coalesced,
    Synced(SyncReport),
}

pub struct SyncEngine {
    remote: Arc<dyn RemoteCatalogClient>,
    probe: Arc<dyn ConnectivityProbe>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    settings: SyncSettings,
    snapshot_path: Option<PathBuf>,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteCatalogClient>,
        probe: Arc<dyn ConnectivityProbe>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        settings: SyncSettings,
    ) -> Self {
        Self {
            remote,
            probe,
            clock,
            events,
            settings,
            snapshot_path: None,
        }
    }

    /// Persist the fetched catalog to `path` after every successful pass.
    pub fn with_snapshot_path(mut self, path: Option<PathBuf>) -> Self {
        self.snapshot_path = path;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    // ---- passes ------------------------------------------------------------

    /// Fetch and publish the full catalog. Waits for any running pass.
    ///
    /// # Errors
    ///
    /// `NotLoggedIn`, `Offline` or `SessionRetired` when the pass cannot
    /// start. Failed fetches are not errors; see [`SyncReport`].
    #[instrument(skip(self, context))]
    pub async fn bootstrap(&self, context: &SessionContext) -> Result<SyncReport> {
        let _guard = context.lock_sync().await;
        self.run_bootstrap(context).await
    }

    /// Merge tracks changed since the cursor and refresh playlists. Waits for
    /// any running pass.
    #[instrument(skip(self, context))]
    pub async fn delta_sync(&self, context: &SessionContext) -> Result<SyncReport> {
        let _guard = context.lock_sync().await;
        self.run_delta(context).await
    }

    /// One ticker period. Every `delta_sync_every_ticks`-th call runs a delta
    /// sync unless a pass is already running.
    pub async fn tick(&self, context: &SessionContext) -> Result<TickOutcome> {
        let tick = context.next_tick();
        if tick % self.settings.delta_sync_every_ticks.max(1) != 0 {
            return Ok(TickOutcome::Idle);
        }

        let Some(_guard) = context.try_lock_sync() else {
            debug!(tick, "Sync pass already running; tick coalesced");
            self.emit(CoreEvent::Sync(SyncEvent::Coalesced));
            return Ok(TickOutcome::Coalesced);
        };

        self.run_delta(context).await.map(TickOutcome::Synced)
    }

    /// Start the periodic ticker for `context`. Stops when the context is
    /// retired.
    pub fn spawn_ticker(self: Arc<Self>, context: Arc<SessionContext>) -> JoinHandle<()> {
        let period = self.settings.tick_period;
        let shutdown = context.shutdown_token();

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(?period, every = self.settings.delta_sync_every_ticks, "Ticker started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        match self.tick(&context).await {
                            Ok(TickOutcome::Synced(report)) => {
                                debug!(?report, "Delta sync finished")
                            }
                            Ok(_) => {}
                            Err(e) => debug!(error = %e, "Delta sync skipped"),
                        }
                    }
                }
            }

            debug!("Ticker stopped");
        })
    }

    // ---- stream URLs -------------------------------------------------------

    /// Playable URL for a track, `None` when it cannot be resolved.
    ///
    /// Never fails: remote errors are logged and reported as `None`.
    #[instrument(skip(self, context))]
    pub async fn resolve_stream_url(
        &self,
        context: &SessionContext,
        track_id: &str,
    ) -> Option<String> {
        let session = context.session();
        if !session.is_logged_in() {
            debug!("Not logged in; no stream URL");
            return None;
        }

        match self
            .remote
            .get_stream_url(track_id, session.stream_device_id())
            .await
        {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                debug!("Remote returned no stream URL");
                None
            }
            Err(e) => {
                warn!(error = %e, "Stream URL request failed");
                None
            }
        }
    }

    /// Like [`SyncEngine::resolve_stream_url`], mapping `None` to
    /// `SyncError::TrackUnavailable`.
    pub async fn require_stream_url(
        &self,
        context: &SessionContext,
        track_id: &str,
    ) -> Result<String> {
        self.resolve_stream_url(context, track_id)
            .await
            .ok_or_else(|| SyncError::TrackUnavailable {
                track_id: track_id.to_string(),
            })
    }

    // ---- snapshots ---------------------------------------------------------

    /// Restore the context's cache from the configured snapshot, if any.
    #[instrument(skip(self, context))]
    pub async fn load_snapshot(&self, context: &SessionContext) -> Result<Option<IndexStats>> {
        let Some(path) = &self.snapshot_path else {
            return Ok(None);
        };
        let Some(snapshot) = CatalogSnapshot::load(path).await? else {
            return Ok(None);
        };

        let tracks = snapshot.tracks.len();
        let playlists = snapshot.playlists.len();
        let stats = context.cache().restore(snapshot);

        info!(tracks, playlists, "Restored catalog snapshot");
        self.emit(CoreEvent::Library(LibraryEvent::SnapshotLoaded { tracks, playlists }));
        Ok(Some(stats))
    }

    /// Write the context's cache to the configured snapshot path.
    pub async fn save_snapshot(&self, context: &SessionContext) -> Result<()> {
        match &self.snapshot_path {
            Some(path) => Ok(context.cache().snapshot().save(path).await?),
            None => Ok(()),
        }
    }

    pub async fn delete_snapshot(&self) -> Result<()> {
        match &self.snapshot_path {
            Some(path) => Ok(CatalogSnapshot::remove(path).await?),
            None => Ok(()),
        }
    }

    // ---- internals ---------------------------------------------------------

    async fn ensure_ready(&self, context: &SessionContext) -> Result<()> {
        if context.is_retired() {
            return Err(SyncError::SessionRetired);
        }
        if !context.session().is_logged_in() {
            return Err(SyncError::NotLoggedIn);
        }
        if !self.probe.probe().await {
            return Err(SyncError::Offline);
        }
        Ok(())
    }

    async fn run_bootstrap(&self, context: &SessionContext) -> Result<SyncReport> {
        self.ensure_ready(context).await?;
        let kind = SyncKind::Bootstrap;
        self.emit(CoreEvent::Sync(SyncEvent::Started { kind }));
        info!("Bootstrapping catalog");

        let tracks_fetched = match self.remote.get_all_tracks().await {
            Ok(Some(batch)) => {
                let cursor = batch.updated_at.unwrap_or_else(|| self.clock.now());
                let tracks = batch
                    .tracks
                    .into_iter()
                    .map(|track| Arc::new(Track::from(track)))
                    .collect();
                self.publish_tracks(context, tracks);
                context.cache().set_cursor(cursor);
                true
            }
            Ok(None) => {
                let reason = "remote returned no track set";
                self.fetch_skipped(kind, CatalogCollection::Tracks, reason);
                false
            }
            Err(e) => {
                self.fetch_skipped(kind, CatalogCollection::Tracks, e.to_string());
                false
            }
        };

        let playlists_fetched = self.refresh_playlists(context, kind).await;

        Ok(self
            .finish(context, kind, tracks_fetched, tracks_fetched, playlists_fetched)
            .await)
    }

    async fn run_delta(&self, context: &SessionContext) -> Result<SyncReport> {
        let Some(since) = context.cache().cursor() else {
            debug!("No sync cursor; falling back to a full fetch");
            return self.run_bootstrap(context).await;
        };

        self.ensure_ready(context).await?;
        let kind = SyncKind::Delta;
        self.emit(CoreEvent::Sync(SyncEvent::Started { kind }));

        let mut tracks_fetched = false;
        let mut tracks_changed = false;
        match self.remote.get_updated_tracks(since).await {
            Ok(Some(batch)) => {
                let received = batch.tracks.len();
                let outcome = merge_track_delta(
                    context.cache().tracks().items(),
                    batch.tracks.into_iter().map(Track::from).collect(),
                );
                debug!(
                    %since,
                    received,
                    upserted = outcome.upserted,
                    removed = outcome.removed,
                    "Applied track delta"
                );

                if outcome.changed() {
                    self.publish_tracks(context, outcome.tracks);
                    tracks_changed = true;
                }
                // Only a successful fetch advances the cursor, even when empty
                context.cache().set_cursor(self.clock.now());
                tracks_fetched = true;
            }
            Ok(None) => {
                self.fetch_skipped(kind, CatalogCollection::Tracks, "remote returned no delta")
            }
            Err(e) => self.fetch_skipped(kind, CatalogCollection::Tracks, e.to_string()),
        }

        let playlists_fetched = self.refresh_playlists(context, kind).await;

        Ok(self
            .finish(context, kind, tracks_fetched, tracks_changed, playlists_fetched)
            .await)
    }

    /// Replace the track list and rebuild albums, then artists.
    fn publish_tracks(&self, context: &SessionContext, tracks: Vec<Arc<Track>>) {
        let cache = context.cache();
        cache.replace_tracks(tracks);
        let stats = cache.rebuild_indexes();
        self.emit(CoreEvent::Library(LibraryEvent::IndexesRebuilt {
            albums: stats.albums,
            artists: stats.artists,
        }));
    }

    async fn refresh_playlists(&self, context: &SessionContext, kind: SyncKind) -> bool {
        match self.remote.get_all_playlists().await {
            Ok(Some(batch)) => {
                let refreshed_at = batch.updated_at.unwrap_or_else(|| self.clock.now());
                let playlists: Vec<Playlist> = batch
                    .playlists
                    .into_iter()
                    .map(Playlist::from_remote)
                    .collect();
                context.cache().replace_playlists(playlists, refreshed_at);
                true
            }
            Ok(None) => {
                let reason = "remote returned no playlist set";
                self.fetch_skipped(kind, CatalogCollection::Playlists, reason);
                false
            }
            Err(e) => {
                self.fetch_skipped(kind, CatalogCollection::Playlists, e.to_string());
                false
            }
        }
    }

    async fn finish(
        &self,
        context: &SessionContext,
        kind: SyncKind,
        tracks_fetched: bool,
        tracks_changed: bool,
        playlists_fetched: bool,
    ) -> SyncReport {
        let cache = context.cache();
        let report = SyncReport {
            kind,
            tracks_fetched,
            tracks_changed,
            playlists_fetched,
            track_count: cache.tracks().len(),
            playlist_count: cache.playlists().len(),
        };

        // A retired context must not resurrect a snapshot deleted at logout
        if (tracks_fetched || playlists_fetched) && !context.is_retired() {
            if let Err(e) = self.save_snapshot(context).await {
                warn!(error = %e, "Failed to save catalog snapshot");
            }
        }

        info!(
            ?kind,
            tracks = report.track_count,
            playlists = report.playlist_count,
            tracks_changed,
            "Catalog sync completed"
        );
        self.emit(CoreEvent::Sync(SyncEvent::Completed {
            kind,
            tracks_changed,
            track_count: report.track_count,
            playlist_count: report.playlist_count,
        }));
        report
    }

    fn fetch_skipped(
        &self,
        kind: SyncKind,
        collection: CatalogCollection,
        reason: impl Into<String>,
    ) {
        let reason = reason.into();
        warn!(
            ?kind,
            ?collection,
            %reason,
            "Remote fetch skipped; keeping cached collection"
        );
        self.emit(CoreEvent::Sync(SyncEvent::FetchSkipped {
            kind,
            collection,
            reason,
        }));
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events.emit(event);
    }

    /// Cursor the next delta sync of `context` will use.
    pub fn cursor(&self, context: &SessionContext) -> Option<DateTime<Utc>> {
        context.cache().cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        BridgeError, LoginRequest, LoginResponse, PlaylistBatch, RemoteDevice, RemoteTrack,
        StaticProbe, TrackBatch,
    };
    use chrono::TimeZone;
    use core_auth::{LoginSession, LoginState, Session};
    use mockall::mock;
    use mockall::predicate::eq;
    use std::time::Duration;

    mock! {
        Remote {}

        #[async_trait]
        impl RemoteCatalogClient for Remote {
            async fn login(&self, request: LoginRequest) -> BridgeResult<LoginResponse>;
            async fn logout(&self) -> BridgeResult<()>;
            async fn get_all_tracks(&self) -> BridgeResult<Option<TrackBatch>>;
            async fn get_updated_tracks(
                &self,
                since: DateTime<Utc>,
            ) -> BridgeResult<Option<TrackBatch>>;
            async fn get_all_playlists(&self) -> BridgeResult<Option<PlaylistBatch>>;
            async fn get_stream_url(
                &self,
                track_id: &str,
                device_id: u64,
            ) -> BridgeResult<Option<String>>;
            async fn get_account_devices(&self) -> BridgeResult<Option<Vec<RemoteDevice>>>;
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn remote_track(id: &str, album: &str, artist: &str) -> RemoteTrack {
        RemoteTrack {
            id: id.to_string(),
            title: format!("Song {}", id),
            artist: artist.to_string(),
            album_artist: artist.to_string(),
            album_artist_norm: artist.to_lowercase(),
            album: album.to_string(),
            track_number: 1,
            duration_millis: 1000,
            ..RemoteTrack::default()
        }
    }

    fn engine(remote: MockRemote, online: bool, now: i64) -> SyncEngine {
        SyncEngine::new(
            Arc::new(remote),
            Arc::new(StaticProbe(online)),
            Arc::new(FixedClock(at(now))),
            EventBus::new(64),
            SyncSettings {
                tick_period: Duration::from_millis(10),
                delta_sync_every_ticks: 3,
            },
        )
    }

    fn logged_in_context() -> SessionContext {
        SessionContext::with_session(Session::from_login(LoginSession {
            state: LoginState::LoggedIn,
            ..LoginSession::default()
        }))
    }

    fn seed(context: &SessionContext, tracks: Vec<RemoteTrack>, cursor: i64) {
        context
            .cache()
            .replace_tracks(tracks.into_iter().map(Track::from).map(Arc::new).collect());
        context.cache().rebuild_indexes();
        context.cache().set_cursor(at(cursor));
    }

    #[tokio::test]
    async fn test_bootstrap_requires_login() {
        let engine = engine(MockRemote::new(), true, 0);
        let result = engine.bootstrap(&SessionContext::new()).await;
        assert!(matches!(result, Err(SyncError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_bootstrap_requires_connectivity() {
        let engine = engine(MockRemote::new(), false, 0);
        let result = engine.bootstrap(&logged_in_context()).await;
        assert!(matches!(result, Err(SyncError::Offline)));
    }

    #[tokio::test]
    async fn test_bootstrap_publishes_catalog() {
        let mut remote = MockRemote::new();
        remote.expect_get_all_tracks().times(1).returning(|| {
            Ok(Some(TrackBatch {
                tracks: vec![
                    remote_track("t1", "Help!", "Beatles"),
                    remote_track("t2", "Thriller", "Michael Jackson"),
                ],
                updated_at: Some(at(500)),
            }))
        });
        remote.expect_get_all_playlists().times(1).returning(|| {
            Ok(Some(PlaylistBatch {
                playlists: vec![],
                updated_at: None,
            }))
        });
        let engine = engine(remote, true, 900);
        let context = logged_in_context();

        let report = engine.bootstrap(&context).await.unwrap();

        assert!(report.tracks_fetched && report.playlists_fetched);
        assert_eq!(report.track_count, 2);
        assert_eq!(context.cache().albums().len(), 2);
        assert_eq!(context.cache().artists().len(), 2);
        assert_eq!(context.cache().cursor(), Some(at(500)));
    }

    #[tokio::test]
    async fn test_failed_track_fetch_keeps_cache_and_updates_playlists() {
        let mut remote = MockRemote::new();
        remote.expect_get_all_tracks().returning(|| Ok(None));
        remote.expect_get_all_playlists().returning(|| {
            Ok(Some(PlaylistBatch {
                playlists: vec![bridge_traits::RemotePlaylist {
                    id: "p1".to_string(),
                    name: "Mix".to_string(),
                    entries: vec![],
                }],
                updated_at: None,
            }))
        });
        let engine = engine(remote, true, 900);
        let context = logged_in_context();
        seed(&context, vec![remote_track("t1", "Help!", "Beatles")], 100);
        let albums_before = context.cache().albums();

        let report = engine.bootstrap(&context).await.unwrap();

        assert!(!report.tracks_fetched);
        assert!(report.playlists_fetched);
        assert_eq!(context.cache().tracks().len(), 1);
        assert!(Arc::ptr_eq(&albums_before, &context.cache().albums()));
        assert_eq!(context.cache().playlists().len(), 1);
        assert_eq!(context.cache().cursor(), Some(at(100)));
    }

    #[tokio::test]
    async fn test_empty_delta_advances_cursor_only() {
        let mut remote = MockRemote::new();
        remote
            .expect_get_updated_tracks()
            .with(eq(at(100)))
            .times(1)
            .returning(|_| {
                Ok(Some(TrackBatch {
                    tracks: vec![],
                    updated_at: None,
                }))
            });
        remote.expect_get_all_playlists().returning(|| Ok(None));
        let engine = engine(remote, true, 900);
        let context = logged_in_context();
        seed(&context, vec![remote_track("t1", "Help!", "Beatles")], 100);
        let tracks_before = context.cache().tracks();
        let albums_before = context.cache().albums();
        let artists_before = context.cache().artists();

        let report = engine.delta_sync(&context).await.unwrap();

        assert!(report.tracks_fetched);
        assert!(!report.tracks_changed);
        assert!(Arc::ptr_eq(&tracks_before, &context.cache().tracks()));
        assert!(Arc::ptr_eq(&albums_before, &context.cache().albums()));
        assert!(Arc::ptr_eq(&artists_before, &context.cache().artists()));
        assert_eq!(context.cache().cursor(), Some(at(900)));
    }

    #[tokio::test]
    async fn test_failed_delta_keeps_cursor() {
        let mut remote = MockRemote::new();
        remote
            .expect_get_updated_tracks()
            .returning(|_| Err(BridgeError::Network("timeout".to_string())));
        remote.expect_get_all_playlists().returning(|| Ok(None));
        let engine = engine(remote, true, 900);
        let context = logged_in_context();
        seed(&context, vec![remote_track("t1", "Help!", "Beatles")], 100);

        let report = engine.delta_sync(&context).await.unwrap();

        assert!(!report.tracks_fetched);
        assert_eq!(context.cache().cursor(), Some(at(100)));
    }

    #[tokio::test]
    async fn test_delta_deletion_drops_emptied_album() {
        let mut remote = MockRemote::new();
        remote.expect_get_updated_tracks().returning(|_| {
            Ok(Some(TrackBatch {
                tracks: vec![RemoteTrack {
                    id: "t1".to_string(),
                    deleted: true,
                    ..RemoteTrack::default()
                }],
                updated_at: None,
            }))
        });
        remote.expect_get_all_playlists().returning(|| Ok(None));
        let engine = engine(remote, true, 900);
        let context = logged_in_context();
        seed(
            &context,
            vec![
                remote_track("t1", "Help!", "Beatles"),
                remote_track("t2", "Thriller", "Michael Jackson"),
            ],
            100,
        );

        let report = engine.delta_sync(&context).await.unwrap();

        assert!(report.tracks_changed);
        let cache = context.cache();
        assert!(cache.get_track("t1").is_none());
        assert_eq!(cache.albums().len(), 1);
        assert_eq!(cache.albums().items()[0].title, "Thriller");
        assert_eq!(cache.artists().len(), 1);
    }

    #[tokio::test]
    async fn test_delta_without_cursor_falls_back_to_bootstrap() {
        let mut remote = MockRemote::new();
        remote.expect_get_updated_tracks().never();
        remote.expect_get_all_tracks().times(1).returning(|| {
            Ok(Some(TrackBatch {
                tracks: vec![remote_track("t1", "Help!", "Beatles")],
                updated_at: None,
            }))
        });
        remote.expect_get_all_playlists().returning(|| Ok(None));
        let engine = engine(remote, true, 900);
        let context = logged_in_context();

        let report = engine.delta_sync(&context).await.unwrap();

        assert_eq!(report.kind, SyncKind::Bootstrap);
        assert_eq!(context.cache().cursor(), Some(at(900)));
    }

    #[tokio::test]
    async fn test_only_every_nth_tick_syncs() {
        let mut remote = MockRemote::new();
        remote.expect_get_updated_tracks().times(2).returning(|_| Ok(None));
        remote.expect_get_all_playlists().times(2).returning(|| Ok(None));
        let engine = engine(remote, true, 900);
        let context = logged_in_context();
        seed(&context, vec![], 100);

        let mut synced = 0;
        for _ in 0..6 {
            if let TickOutcome::Synced(_) = engine.tick(&context).await.unwrap() {
                synced += 1;
            }
        }
        assert_eq!(synced, 2);
    }

    #[tokio::test]
    async fn test_tick_coalesces_while_pass_running() {
        let engine = engine(MockRemote::new(), true, 900);
        let context = logged_in_context();
        let _running = context.lock_sync().await;

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(engine.tick(&context).await.unwrap());
        }

        assert_eq!(
            outcomes,
            vec![TickOutcome::Idle, TickOutcome::Idle, TickOutcome::Coalesced]
        );
    }

    #[tokio::test]
    async fn test_resolve_stream_url() {
        let mut remote = MockRemote::new();
        remote
            .expect_get_stream_url()
            .withf(|id, device| id == "t1" && *device == 0)
            .returning(|_, _| Ok(Some("https://stream/t1".to_string())));
        remote
            .expect_get_stream_url()
            .withf(|id, _| id == "gone")
            .returning(|_, _| Ok(None));
        remote
            .expect_get_stream_url()
            .withf(|id, _| id == "broken")
            .returning(|_, _| Err(BridgeError::Network("reset".to_string())));
        let engine = engine(remote, true, 0);
        let context = logged_in_context();

        assert_eq!(
            engine.resolve_stream_url(&context, "t1").await.as_deref(),
            Some("https://stream/t1")
        );
        assert!(engine.resolve_stream_url(&context, "gone").await.is_none());
        assert!(engine.resolve_stream_url(&context, "broken").await.is_none());

        let err = engine.require_stream_url(&context, "gone").await.unwrap_err();
        assert_eq!(err.to_string(), "track is unavailable (song_id: gone)");
    }

    #[tokio::test]
    async fn test_retired_context_refuses_sync() {
        let engine = engine(MockRemote::new(), true, 0);
        let context = logged_in_context();
        context.retire();

        assert!(matches!(
            engine.bootstrap(&context).await,
            Err(SyncError::SessionRetired)
        ));
    }

    #[tokio::test]
    async fn test_ticker_stops_on_retire() {
        let mut remote = MockRemote::new();
        remote.expect_get_updated_tracks().returning(|_| Ok(None));
        remote.expect_get_all_playlists().returning(|| Ok(None));
        let engine = Arc::new(engine(remote, true, 0));
        let context = Arc::new(logged_in_context());
        seed(&context, vec![], 100);

        let handle = engine.spawn_ticker(context.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        context.retire();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("ticker did not stop")
            .unwrap();
        assert!(context.ticks() > 0);
    }
}
