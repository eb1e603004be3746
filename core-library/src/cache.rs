//! # Catalog Cache
//!
//! In-memory holder of the current catalog: tracks, playlists, and the
//! derived album and album-artist indexes.
//!
//! Each collection is published as an immutable snapshot behind an `Arc`.
//! Readers clone the `Arc` and keep a consistent view for as long as they
//! hold it; the single writer (the sync engine) builds a new collection off
//! to the side and swaps it in. A reader therefore never observes a
//! partially rebuilt index.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::grouping;
use crate::identity::EntityTag;
use crate::models::{
    sort_tracks, Album, AlbumArtist, Identified, Playlist, Track, TrackLookup, TrackOrdering,
};
use crate::snapshot::CatalogSnapshot;

/// Immutable, id-indexed list of catalog entities.
#[derive(Debug)]
pub struct Collection<T> {
    items: Vec<Arc<T>>,
    index: HashMap<String, usize>,
}

impl<T: Identified> Collection<T> {
    pub fn new(items: Vec<Arc<T>>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.id().to_string(), position))
            .collect();
        Self { items, index }
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.index.get(id).map(|&position| self.items[position].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn items(&self) -> &[Arc<T>] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl TrackLookup for Collection<Track> {
    fn lookup_track(&self, id: &str) -> Option<Arc<Track>> {
        self.get(id)
    }
}

fn load<T>(slot: &RwLock<Arc<T>>) -> Arc<T> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn store<T>(slot: &RwLock<Arc<T>>, value: T) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(value);
}

/// Sizes of freshly rebuilt indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub albums: usize,
    pub artists: usize,
}

#[derive(Debug, Default)]
pub struct CatalogCache {
    tracks: RwLock<Arc<Collection<Track>>>,
    playlists: RwLock<Arc<Collection<Playlist>>>,
    albums: RwLock<Arc<Collection<Album>>>,
    artists: RwLock<Arc<Collection<AlbumArtist>>>,
    cursor: RwLock<Option<DateTime<Utc>>>,
    playlists_refreshed_at: RwLock<Option<DateTime<Utc>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- reads -------------------------------------------------------------

    pub fn tracks(&self) -> Arc<Collection<Track>> {
        load(&self.tracks)
    }

    pub fn playlists(&self) -> Arc<Collection<Playlist>> {
        load(&self.playlists)
    }

    pub fn albums(&self) -> Arc<Collection<Album>> {
        load(&self.albums)
    }

    pub fn artists(&self) -> Arc<Collection<AlbumArtist>> {
        load(&self.artists)
    }

    pub fn get_track(&self, id: &str) -> Option<Arc<Track>> {
        self.tracks().get(id)
    }

    pub fn get_playlist(&self, id: &str) -> Option<Arc<Playlist>> {
        self.playlists().get(id)
    }

    /// Look up an album by id, including synthesized all-tracks albums.
    pub fn get_album(&self, id: &str) -> Option<Arc<Album>> {
        if EntityTag::of(id) == Some(EntityTag::ArtistTracks) {
            return self
                .artists()
                .iter()
                .filter_map(|artist| artist.all_tracks())
                .find(|album| album.id == id)
                .cloned();
        }
        self.albums().get(id)
    }

    pub fn get_album_artist(&self, id: &str) -> Option<Arc<AlbumArtist>> {
        self.artists().get(id)
    }

    /// Tracks in the requested order; the cached list is in default order.
    pub fn sorted_tracks(&self, ordering: TrackOrdering) -> Vec<Arc<Track>> {
        let mut tracks = self.tracks().items().to_vec();
        if ordering != TrackOrdering::Default {
            sort_tracks(&mut tracks, ordering);
        }
        tracks
    }

    /// Last delta-sync cursor, `None` before the first successful sync.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        *self.cursor.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn playlists_refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self
            .playlists_refreshed_at
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks().is_empty() && self.playlists().is_empty()
    }

    // ---- writes (sync engine only) ----------------------------------------

    /// Replace the track list. Indexes are not touched; call
    /// [`CatalogCache::rebuild_indexes`] afterwards.
    pub fn replace_tracks(&self, mut tracks: Vec<Arc<Track>>) {
        tracks.retain(|track| !track.deleted);
        sort_tracks(&mut tracks, TrackOrdering::Default);
        debug!(count = tracks.len(), "Publishing track list");
        store(&self.tracks, Collection::new(tracks));
    }

    pub fn replace_playlists(&self, mut playlists: Vec<Playlist>, refreshed_at: DateTime<Utc>) {
        playlists.sort_by(Playlist::compare_by_name);
        debug!(count = playlists.len(), "Publishing playlist list");
        store(
            &self.playlists,
            Collection::new(playlists.into_iter().map(Arc::new).collect()),
        );
        *self
            .playlists_refreshed_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(refreshed_at);
    }

    /// Recompute albums from the current track list, then artists from the
    /// new albums, and publish both.
    pub fn rebuild_indexes(&self) -> IndexStats {
        let tracks = self.tracks();
        let albums: Vec<Arc<Album>> = grouping::group_into_albums(tracks.items())
            .into_iter()
            .map(Arc::new)
            .collect();
        let artists: Vec<Arc<AlbumArtist>> = grouping::group_into_artists(&albums)
            .into_iter()
            .map(Arc::new)
            .collect();

        let stats = IndexStats {
            albums: albums.len(),
            artists: artists.len(),
        };
        store(&self.albums, Collection::new(albums));
        store(&self.artists, Collection::new(artists));

        info!(
            tracks = tracks.len(),
            albums = stats.albums,
            artists = stats.artists,
            "Rebuilt catalog indexes"
        );
        stats
    }

    pub fn set_cursor(&self, cursor: DateTime<Utc>) {
        *self.cursor.write().unwrap_or_else(PoisonError::into_inner) = Some(cursor);
    }

    // ---- persistence -------------------------------------------------------

    /// Capture the fetched state (tracks, playlists, cursors).
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot::new(
            self.tracks().iter().map(|track| track.as_ref().clone()).collect(),
            self.playlists()
                .iter()
                .map(|playlist| playlist.as_ref().clone())
                .collect(),
            self.cursor(),
            self.playlists_refreshed_at(),
        )
    }

    /// Load a persisted snapshot and rebuild the derived indexes.
    pub fn restore(&self, snapshot: CatalogSnapshot) -> IndexStats {
        let CatalogSnapshot {
            tracks,
            playlists,
            cursor,
            playlists_refreshed_at,
            ..
        } = snapshot;

        self.replace_tracks(tracks.into_iter().map(Arc::new).collect());
        store(
            &self.playlists,
            Collection::new(playlists.into_iter().map(Arc::new).collect()),
        );
        *self
            .playlists_refreshed_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = playlists_refreshed_at;
        *self.cursor.write().unwrap_or_else(PoisonError::into_inner) = cursor;

        self.rebuild_indexes()
    }
}

impl TrackLookup for CatalogCache {
    fn lookup_track(&self, id: &str) -> Option<Arc<Track>> {
        self.get_track(id)
    }
}
