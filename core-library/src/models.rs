//! Domain models for the catalog
//!
//! Tracks and playlists are fetched from the remote service; albums and
//! album-artists are derived from the track list by [`crate::grouping`].

use bridge_traits::{RemotePlaylist, RemoteTrack};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::identity;

/// Case-folded form used for case-insensitive comparisons.
pub fn fold(s: &str) -> String {
    s.to_lowercase()
}

/// Anything addressable by a string id in the catalog.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Resolves a track id to the full record.
///
/// Implemented by the catalog cache and by published track collections, so a
/// [`TrackRef`] can be resolved against whichever one the caller holds.
pub trait TrackLookup {
    fn lookup_track(&self, id: &str) -> Option<Arc<Track>>;
}

// =============================================================================
// Track
// =============================================================================

/// Track record, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Server-assigned identifier
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_artist: String,
    /// Server-normalized album artist, used as sort and grouping key
    pub album_artist_sort: String,
    pub album: String,
    pub track_number: u32,
    pub duration_secs: u64,
    pub composers: Vec<String>,
    pub genre: Option<String>,
    /// Raw album art reference as delivered by the service
    pub album_art_ref: Option<String>,
    /// Set on delta entries for removed tracks
    pub deleted: bool,
}

impl Track {
    /// Album artist shown to users; falls back to the track artist.
    pub fn album_artist_name(&self) -> &str {
        if self.album_artist.trim().is_empty() {
            &self.artist
        } else {
            &self.album_artist
        }
    }

    /// Key albums and artists are grouped by.
    pub fn album_artist_key(&self) -> String {
        if self.album_artist_sort.trim().is_empty() {
            fold(self.album_artist_name())
        } else {
            self.album_artist_sort.clone()
        }
    }

    /// Album art URL with any trailing size directive removed.
    pub fn album_art_url(&self) -> Option<String> {
        self.album_art_ref
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(identity::album_art_url)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Identified for Track {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

impl From<RemoteTrack> for Track {
    fn from(remote: RemoteTrack) -> Self {
        Self {
            id: remote.id,
            title: remote.title,
            artist: remote.artist,
            album_artist: remote.album_artist,
            album_artist_sort: remote.album_artist_norm,
            album: remote.album,
            track_number: remote.track_number,
            duration_secs: remote.duration_millis / 1000,
            composers: remote.composers,
            genre: remote.genre,
            album_art_ref: remote.album_art_refs.into_iter().next(),
            deleted: remote.deleted,
        }
    }
}

/// Named track orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackOrdering {
    /// Album, then track number
    #[default]
    Default,
    /// Artist, album, track number
    Artist,
    /// Album artist, album, track number
    AlbumArtist,
    /// Album, album artist, track number; keeps each album contiguous
    Album,
}

impl TrackOrdering {
    pub fn compare(&self, a: &Track, b: &Track) -> Ordering {
        let primary = match self {
            TrackOrdering::Default => fold(&a.album)
                .cmp(&fold(&b.album))
                .then(a.track_number.cmp(&b.track_number)),
            TrackOrdering::Artist => fold(&a.artist)
                .cmp(&fold(&b.artist))
                .then_with(|| fold(&a.album).cmp(&fold(&b.album)))
                .then(a.track_number.cmp(&b.track_number)),
            TrackOrdering::AlbumArtist => a
                .album_artist_key()
                .cmp(&b.album_artist_key())
                .then_with(|| fold(&a.album).cmp(&fold(&b.album)))
                .then(a.track_number.cmp(&b.track_number)),
            TrackOrdering::Album => fold(&a.album)
                .cmp(&fold(&b.album))
                .then_with(|| a.album_artist_key().cmp(&b.album_artist_key()))
                .then(a.track_number.cmp(&b.track_number)),
        };
        // Title then id keep the order total and stable across rebuilds
        primary
            .then_with(|| fold(&a.title).cmp(&fold(&b.title)))
            .then_with(|| a.id.cmp(&b.id))
    }
}

pub fn sort_tracks(tracks: &mut [Arc<Track>], ordering: TrackOrdering) {
    tracks.sort_by(|a, b| ordering.compare(a, b));
}

// =============================================================================
// Track reference
// =============================================================================

/// Handle to a track by id.
///
/// Built either resolved (holding a full record) or bare (id only). Both are
/// resolved on demand against an explicit [`TrackLookup`], so edits from later
/// syncs win; the held record is only used when the lookup does not know the
/// id. A bare reference to an unknown id resolves to `None`. Only the id is
/// serialized.
#[derive(Clone, Serialize, Deserialize)]
pub struct TrackRef {
    id: String,
    #[serde(skip)]
    track: Option<Arc<Track>>,
}

impl TrackRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            track: None,
        }
    }

    pub fn resolved(track: Arc<Track>) -> Self {
        Self {
            id: track.id.clone(),
            track: Some(track),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The record held by this reference, if it was built resolved.
    pub fn track(&self) -> Option<&Arc<Track>> {
        self.track.as_ref()
    }

    pub fn resolve(&self, lookup: &dyn TrackLookup) -> Option<Arc<Track>> {
        lookup
            .lookup_track(&self.id)
            .or_else(|| self.track.clone())
    }
}

impl PartialEq for TrackRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TrackRef {}

impl fmt::Debug for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackRef")
            .field("id", &self.id)
            .field("resolved", &self.track.is_some())
            .finish()
    }
}

// =============================================================================
// Playlist
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Absolute position inside the playlist
    pub position: u32,
    pub track: TrackRef,
}

/// Playlist, replaced wholesale on every playlist sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Build from a remote record. Entries carrying an embedded track are
    /// resolved immediately, the rest hold only the id.
    pub fn from_remote(remote: RemotePlaylist) -> Self {
        let mut entries: Vec<PlaylistEntry> = remote
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let position = entry
                    .position
                    .unwrap_or_else(|| u32::try_from(index).unwrap_or(u32::MAX));
                let track = match entry.track {
                    Some(embedded) => TrackRef::resolved(Arc::new(Track::from(embedded))),
                    None => TrackRef::new(entry.track_id),
                };
                PlaylistEntry { position, track }
            })
            .collect();
        entries.sort_by_key(|entry| entry.position);

        Self {
            id: remote.id,
            name: remote.name,
            entries,
        }
    }

    /// Resolve entries in order; ids unknown to `lookup` are skipped.
    pub fn tracks(&self, lookup: &dyn TrackLookup) -> Vec<Arc<Track>> {
        self.entries
            .iter()
            .filter_map(|entry| entry.track.resolve(lookup))
            .collect()
    }

    /// Case-insensitive ordering by display name.
    pub fn compare_by_name(a: &Playlist, b: &Playlist) -> Ordering {
        fold(&a.name)
            .cmp(&fold(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl Identified for Playlist {
    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Album & AlbumArtist
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlbumKind {
    /// Tracks sharing title and album artist
    Regular,
    /// Synthesized "All tracks by {artist}" album
    ArtistTracks,
}

/// Album derived from the track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Content-derived id, see [`identity::album_id`]
    pub id: String,
    pub kind: AlbumKind,
    pub title: String,
    /// Title unique across the album list
    pub display_title: String,
    pub album_artist: String,
    pub album_artist_sort: String,
    /// Taken from the first track
    pub album_art_url: Option<String>,
    pub tracks: Vec<TrackRef>,
}

impl Album {
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_artist_tracks(&self) -> bool {
        self.kind == AlbumKind::ArtistTracks
    }

    /// Album ordering: case-insensitive title, then album artist sort key.
    pub fn compare_by_title(a: &Album, b: &Album) -> Ordering {
        fold(&a.title)
            .cmp(&fold(&b.title))
            .then_with(|| a.album_artist_sort.cmp(&b.album_artist_sort))
    }

    /// Artist ordering: album artist sort key, then case-insensitive title.
    pub fn compare_by_artist(a: &Album, b: &Album) -> Ordering {
        a.album_artist_sort
            .cmp(&b.album_artist_sort)
            .then_with(|| fold(&a.title).cmp(&fold(&b.title)))
    }
}

impl Identified for Album {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Album artist derived from the album index.
///
/// `albums` always ends with the artist's [`AlbumKind::ArtistTracks`] album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumArtist {
    /// Content-derived id, see [`identity::album_artist_id`]
    pub id: String,
    pub name: String,
    pub sort_key: String,
    pub albums: Vec<Arc<Album>>,
}

impl AlbumArtist {
    /// The synthesized album holding every track of this artist.
    pub fn all_tracks(&self) -> Option<&Arc<Album>> {
        self.albums.last().filter(|album| album.is_artist_tracks())
    }

    /// Albums grouped from the track list, without the synthesized one.
    pub fn regular_albums(&self) -> impl Iterator<Item = &Arc<Album>> {
        self.albums.iter().filter(|album| !album.is_artist_tracks())
    }

    pub fn track_count(&self) -> usize {
        self.all_tracks().map_or(0, |album| album.track_count())
    }
}

impl Identified for AlbumArtist {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::RemotePlaylistEntry;
    use std::collections::HashMap;

    fn remote_track(id: &str) -> RemoteTrack {
        RemoteTrack {
            id: id.to_string(),
            title: format!("Song {}", id),
            artist: "Artist".to_string(),
            album_artist: String::new(),
            album_artist_norm: String::new(),
            album: "Album".to_string(),
            track_number: 1,
            duration_millis: 215_400,
            composers: vec![],
            genre: None,
            album_art_refs: vec!["http://art/x=s130".to_string()],
            deleted: false,
        }
    }

    struct MapLookup(HashMap<String, Arc<Track>>);

    impl TrackLookup for MapLookup {
        fn lookup_track(&self, id: &str) -> Option<Arc<Track>> {
            self.0.get(id).cloned()
        }
    }

    #[test]
    fn test_track_from_remote() {
        let track = Track::from(remote_track("t1"));

        assert_eq!(track.duration_secs, 215);
        assert_eq!(track.album_artist_name(), "Artist");
        assert_eq!(track.album_artist_key(), "artist");
        assert_eq!(track.album_art_url().as_deref(), Some("http://art/x"));
        assert!(track.validate().is_ok());
    }

    #[test]
    fn test_default_ordering() {
        let mut a = Track::from(remote_track("a"));
        a.album = "beta".to_string();
        a.track_number = 1;
        let mut b = Track::from(remote_track("b"));
        b.album = "Alpha".to_string();
        b.track_number = 2;
        let mut c = Track::from(remote_track("c"));
        c.album = "alpha".to_string();
        c.track_number = 1;

        let mut tracks = vec![Arc::new(a), Arc::new(b), Arc::new(c)];
        sort_tracks(&mut tracks, TrackOrdering::Default);

        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_artist_ordering() {
        let mut a = Track::from(remote_track("a"));
        a.artist = "Zed".to_string();
        let mut b = Track::from(remote_track("b"));
        b.artist = "abba".to_string();

        assert_eq!(TrackOrdering::Artist.compare(&a, &b), Ordering::Greater);
        assert_eq!(TrackOrdering::Default.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_track_ref_resolution() {
        let track = Arc::new(Track::from(remote_track("t1")));
        let lookup = MapLookup(HashMap::from([("t1".to_string(), track.clone())]));

        assert_eq!(TrackRef::new("t1").resolve(&lookup), Some(track.clone()));
        assert!(TrackRef::new("missing").resolve(&lookup).is_none());

        let empty = MapLookup(HashMap::new());
        assert_eq!(TrackRef::resolved(track.clone()).resolve(&empty), Some(track));
    }

    #[test]
    fn test_resolved_track_ref_prefers_catalog_record() {
        let embedded = Arc::new(Track::from(remote_track("t1")));
        let mut edited = Track::from(remote_track("t1"));
        edited.title = "Renamed".to_string();
        let edited = Arc::new(edited);
        let lookup = MapLookup(HashMap::from([("t1".to_string(), edited.clone())]));

        let reference = TrackRef::resolved(embedded);
        let resolved = reference.resolve(&lookup).unwrap();

        assert!(Arc::ptr_eq(&resolved, &edited));
        assert_eq!(resolved.title, "Renamed");
    }

    #[test]
    fn test_track_ref_serializes_id_only() {
        let track = Arc::new(Track::from(remote_track("t1")));
        let json = serde_json::to_string(&TrackRef::resolved(track)).unwrap();
        assert_eq!(json, r#"{"id":"t1"}"#);

        let back: TrackRef = serde_json::from_str(&json).unwrap();
        assert!(back.track().is_none());
    }

    #[test]
    fn test_playlist_from_remote() {
        let remote = RemotePlaylist {
            id: "p1".to_string(),
            name: "Road Trip".to_string(),
            entries: vec![
                RemotePlaylistEntry {
                    track_id: "t2".to_string(),
                    position: Some(5),
                    track: None,
                },
                RemotePlaylistEntry {
                    track_id: "t1".to_string(),
                    position: Some(2),
                    track: Some(remote_track("t1")),
                },
            ],
        };

        let playlist = Playlist::from_remote(remote);
        assert_eq!(playlist.entries[0].position, 2);
        assert!(playlist.entries[0].track.track().is_some());
        assert_eq!(playlist.entries[1].track.id(), "t2");
        assert!(playlist.entries[1].track.track().is_none());

        // t2 unknown: skipped rather than fabricated
        let resolved = playlist.tracks(&MapLookup(HashMap::new()));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "t1");
    }

    #[test]
    fn test_playlist_ordering_is_case_insensitive() {
        let a = Playlist {
            id: "1".to_string(),
            name: "zebra".to_string(),
            entries: vec![],
        };
        let b = Playlist {
            id: "2".to_string(),
            name: "Apple".to_string(),
            entries: vec![],
        };
        assert_eq!(Playlist::compare_by_name(&a, &b), Ordering::Greater);
    }
}
