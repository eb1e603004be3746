//! # Catalog Library
//!
//! Data model, album/artist derivation and the in-memory catalog cache.
//!
//! ## Overview
//!
//! This module manages:
//! - Track, playlist, album and album-artist models
//! - Content-derived album and artist ids
//! - Grouping tracks into albums and albums into artists
//! - The snapshot-published [`CatalogCache`] read by UI collaborators
//! - Optional JSON snapshots of the fetched catalog
//!
//! ## Example
//!
//! ```ignore
//! use core_library::CatalogCache;
//!
//! let cache = CatalogCache::new();
//! cache.replace_tracks(tracks);
//! cache.rebuild_indexes();
//!
//! for album in cache.albums().iter() {
//!     println!("{} ({} tracks)", album.display_title, album.track_count());
//! }
//! ```

pub mod cache;
pub mod error;
pub mod grouping;
pub mod identity;
pub mod models;
pub mod snapshot;

pub use cache::{CatalogCache, Collection, IndexStats};
pub use error::{LibraryError, Result};
pub use grouping::{group_into_albums, group_into_artists};
pub use identity::{album_art_url, EntityTag};
pub use models::{
    sort_tracks, Album, AlbumArtist, AlbumKind, Identified, Playlist, PlaylistEntry, Track,
    TrackLookup, TrackOrdering, TrackRef,
};
pub use snapshot::CatalogSnapshot;
