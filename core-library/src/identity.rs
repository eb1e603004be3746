//! Content-derived identifiers for albums and album artists.
//!
//! The remote service has no album or artist ids, so they are derived from
//! the grouping key: a one-character type tag followed by the first 32 hex
//! characters of a SHA-256 digest. The same grouping key always yields the
//! same id, across rebuilds and across processes.

use sha2::{Digest, Sha256};

/// Digest hex characters kept in an id.
pub const ID_HEX_LEN: usize = 32;

/// Separator placed between album title and artist key before hashing.
const KEY_SEPARATOR: &str = "___";

/// Type tag prefixed to every derived id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTag {
    AlbumArtist,
    Album,
    ArtistTracks,
}

impl EntityTag {
    pub fn prefix(self) -> char {
        match self {
            EntityTag::AlbumArtist => 'a',
            EntityTag::Album => 'b',
            EntityTag::ArtistTracks => 'c',
        }
    }

    /// Tag of a derived id, `None` for anything else (e.g. server track ids).
    pub fn of(id: &str) -> Option<Self> {
        if id.len() != ID_HEX_LEN + 1 {
            return None;
        }
        let mut chars = id.chars();
        let tag = match chars.next()? {
            'a' => EntityTag::AlbumArtist,
            'b' => EntityTag::Album,
            'c' => EntityTag::ArtistTracks,
            _ => return None,
        };
        chars.all(|c| c.is_ascii_hexdigit()).then_some(tag)
    }
}

fn tagged_id(tag: EntityTag, material: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(material.as_bytes()));
    let mut id = String::with_capacity(ID_HEX_LEN + 1);
    id.push(tag.prefix());
    id.push_str(&digest[..ID_HEX_LEN]);
    id
}

/// Id of the album grouped under (`title`, `artist_key`).
///
/// The title is case-folded; the artist key is used as given since it is
/// already the server-normalized sort key.
pub fn album_id(title: &str, artist_key: &str) -> String {
    tagged_id(
        EntityTag::Album,
        &format!("{}{}{}", title.to_lowercase(), KEY_SEPARATOR, artist_key),
    )
}

pub fn album_artist_id(artist_key: &str) -> String {
    tagged_id(EntityTag::AlbumArtist, artist_key)
}

/// Id of an artist's synthesized all-tracks album.
pub fn artist_tracks_id(artist_key: &str) -> String {
    tagged_id(EntityTag::ArtistTracks, artist_key)
}

/// Strip a trailing `=directive` from an album art reference.
///
/// Everything from the last `=` onward is removed when that `=` is not the
/// first character; otherwise the reference is returned unchanged.
pub fn album_art_url(raw: &str) -> String {
    match raw.rfind('=') {
        Some(index) if index > 0 => raw[..index].to_string(),
        _ => raw.to_string(),
    }
}
