//! # Album and Artist Grouping
//!
//! Pure functions deriving the album index from a track list and the
//! album-artist index from an album index. Both are recomputed in full on
//! every track-list change; there is no incremental variant.

use std::collections::HashMap;
use std::sync::Arc;

use crate::identity;
use crate::models::{fold, Album, AlbumArtist, AlbumKind, Track, TrackOrdering, TrackRef};

/// Title prefix of the synthesized per-artist album.
pub const ARTIST_TRACKS_TITLE_PREFIX: &str = "All tracks by ";

fn album_key(track: &Track) -> (String, String) {
    (fold(&track.album), track.album_artist_key())
}

/// Group tracks sharing (title, album artist) into albums.
///
/// Every input track lands in exactly one album. Albums come back in album
/// ordering, tracks inside each album in track-number order. Albums whose
/// case-insensitive title collides with another album get the album artist
/// appended to their display title.
pub fn group_into_albums(tracks: &[Arc<Track>]) -> Vec<Album> {
    let mut sorted: Vec<Arc<Track>> = tracks.to_vec();
    sorted.sort_by(|a, b| TrackOrdering::Album.compare(a, b));

    let mut albums: Vec<Album> = Vec::new();
    let mut current_key: Option<(String, String)> = None;

    for track in sorted {
        let key = album_key(&track);
        if current_key.as_ref() == Some(&key) {
            if let Some(album) = albums.last_mut() {
                album.tracks.push(TrackRef::resolved(track));
                continue;
            }
        }

        let (_, artist_key) = &key;
        albums.push(Album {
            id: identity::album_id(&track.album, artist_key),
            kind: AlbumKind::Regular,
            title: track.album.clone(),
            display_title: track.album.clone(),
            album_artist: track.album_artist_name().to_string(),
            album_artist_sort: artist_key.clone(),
            album_art_url: track.album_art_url(),
            tracks: vec![TrackRef::resolved(track)],
        });
        current_key = Some(key);
    }

    disambiguate_titles(&mut albums);
    albums
}

fn disambiguate_titles(albums: &mut [Album]) {
    let mut title_counts: HashMap<String, usize> = HashMap::new();
    for album in albums.iter() {
        *title_counts.entry(fold(&album.title)).or_default() += 1;
    }

    for album in albums.iter_mut() {
        if title_counts.get(&fold(&album.title)).copied().unwrap_or(0) > 1 {
            album.display_title = format!("{} [{}]", album.title, album.album_artist);
        }
    }
}

/// Group albums by album artist.
///
/// Each artist's album list is in title order and is terminated by one
/// synthesized "All tracks by {artist}" album holding the union of that
/// artist's tracks in default order. Synthesized albums in the input are
/// ignored, so regrouping an artist's albums never nests them.
pub fn group_into_artists(albums: &[Arc<Album>]) -> Vec<AlbumArtist> {
    let mut sorted: Vec<Arc<Album>> = albums
        .iter()
        .filter(|album| !album.is_artist_tracks())
        .cloned()
        .collect();
    sorted.sort_by(|a, b| Album::compare_by_artist(a, b).then_with(|| a.id.cmp(&b.id)));

    let mut artists: Vec<AlbumArtist> = Vec::new();
    for album in sorted {
        match artists.last_mut() {
            Some(artist) if artist.sort_key == album.album_artist_sort => {
                artist.albums.push(album);
            }
            _ => artists.push(AlbumArtist {
                id: identity::album_artist_id(&album.album_artist_sort),
                name: album.album_artist.clone(),
                sort_key: album.album_artist_sort.clone(),
                albums: vec![album],
            }),
        }
    }

    for artist in &mut artists {
        let all_tracks = artist_tracks_album(artist);
        artist.albums.push(Arc::new(all_tracks));
    }

    artists
}

fn artist_tracks_album(artist: &AlbumArtist) -> Album {
    let mut tracks: Vec<TrackRef> = artist
        .albums
        .iter()
        .flat_map(|album| album.tracks.iter().cloned())
        .collect();
    tracks.sort_by(|a, b| match (a.track(), b.track()) {
        (Some(x), Some(y)) => TrackOrdering::Default.compare(x, y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id().cmp(b.id()),
    });

    let title = format!("{}{}", ARTIST_TRACKS_TITLE_PREFIX, artist.name);
    Album {
        id: identity::artist_tracks_id(&artist.sort_key),
        kind: AlbumKind::ArtistTracks,
        display_title: title.clone(),
        title,
        album_artist: artist.name.clone(),
        album_artist_sort: artist.sort_key.clone(),
        album_art_url: artist
            .albums
            .iter()
            .find_map(|album| album.album_art_url.clone()),
        tracks,
    }
}
