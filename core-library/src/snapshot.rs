//! On-disk catalog snapshots.
//!
//! Only fetched state is persisted; albums and artists are rebuilt on load.
//! Writes go to a sibling temp file that is then renamed over the target, so
//! a crash mid-write leaves the previous snapshot intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{LibraryError, Result};
use crate::models::{Playlist, Track};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub version: u32,
    pub tracks: Vec<Track>,
    pub playlists: Vec<Playlist>,
    pub cursor: Option<DateTime<Utc>>,
    #[serde(default)]
    pub playlists_refreshed_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    pub fn new(
        tracks: Vec<Track>,
        playlists: Vec<Playlist>,
        cursor: Option<DateTime<Utc>>,
        playlists_refreshed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            tracks,
            playlists,
            cursor,
            playlists_refreshed_at,
        }
    }

    #[instrument(skip(self), fields(tracks = self.tracks.len(), playlists = self.playlists.len()))]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec(self)?;
        let temp = temp_path(path);
        tokio::fs::write(&temp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(bytes = bytes.len(), "Saved catalog snapshot");
        Ok(())
    }

    /// Read a snapshot; `Ok(None)` when none has been written yet.
    #[instrument]
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: CatalogSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LibraryError::UnsupportedSnapshot {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        debug!(tracks = snapshot.tracks.len(), "Loaded catalog snapshot");
        Ok(Some(snapshot))
    }

    /// Delete a snapshot. Missing files are not an error.
    #[instrument]
    pub async fn remove(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "catalog".into());
    name.push(".tmp");
    path.with_file_name(name)
}
