//! Remote Catalog Client Abstraction
//!
//! The remote music service is consumed as an opaque capability. Implementations
//! own the wire protocol, HTTP transport and session cookies; the core only sees
//! the records defined here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Track record as returned by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteTrack {
    /// Server-assigned identifier
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album_artist: String,
    /// Server-normalized album artist, used as sort key
    #[serde(default)]
    pub album_artist_norm: String,
    pub album: String,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub duration_millis: u64,
    #[serde(default)]
    pub composers: Vec<String>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Album art references, most relevant first
    #[serde(default)]
    pub album_art_refs: Vec<String>,
    /// Set on delta responses for tracks removed from the library
    #[serde(default)]
    pub deleted: bool,
}

/// A batch of tracks together with the server-side update marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackBatch {
    pub tracks: Vec<RemoteTrack>,
    /// Server timestamp of the batch, if the service reports one
    pub updated_at: Option<DateTime<Utc>>,
}

/// Playlist entry as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlaylistEntry {
    pub track_id: String,
    /// Absolute position inside the playlist, when reported
    pub position: Option<u32>,
    /// Some services embed the full track record in playlist entries
    pub track: Option<RemoteTrack>,
}

/// Playlist record as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlaylist {
    pub id: String,
    pub name: String,
    pub entries: Vec<RemotePlaylistEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistBatch {
    pub playlists: Vec<RemotePlaylist>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Device registered on the user's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDevice {
    /// Device identifier, usually hex with an optional `0x` prefix
    pub id: String,
    /// Device type, e.g. `"PHONE"` or `"DESKTOP_APP"`
    pub device_type: String,
    /// Last use, in milliseconds since the epoch
    pub last_used_millis: i64,
}

/// Credentials presented to the remote service.
#[derive(Clone, PartialEq, Eq)]
pub enum LoginCredentials {
    /// Human credential pair exchanged for a long-lived token
    Password { user: String, password: String },
    /// Previously issued long-lived token
    Token { user: String, token: String },
}

impl LoginCredentials {
    pub fn user(&self) -> &str {
        match self {
            Self::Password { user, .. } | Self::Token { user, .. } => user,
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Self::Token { .. })
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_token() { "Token" } else { "Password" };
        f.debug_struct(kind)
            .field("user", &self.user())
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub credentials: LoginCredentials,
    /// Device identifier bound to the session
    pub device_id: String,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginResponse {
    /// Whether the service accepted the credentials
    pub accepted: bool,
    /// Long-lived token issued (or re-issued) by the service
    pub token: Option<String>,
}

impl LoginResponse {
    pub fn accepted(token: impl Into<String>) -> Self {
        Self {
            accepted: true,
            token: Some(token.into()),
        }
    }

    pub fn rejected() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("accepted", &self.accepted)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Remote catalog client trait
///
/// Every fetch returns `Ok(None)` when the service answered with nothing usable;
/// transport faults are reported as `Err`. Callers treat both as "no change this
/// cycle" and never wipe cached data because of them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::RemoteCatalogClient;
///
/// async fn count_tracks(client: &dyn RemoteCatalogClient) -> usize {
///     match client.get_all_tracks().await {
///         Ok(Some(batch)) => batch.tracks.len(),
///         _ => 0,
///     }
/// }
/// ```
#[async_trait]
pub trait RemoteCatalogClient: Send + Sync {
    /// Authenticate and open a remote session
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse>;

    /// Invalidate the remote session
    async fn logout(&self) -> Result<()>;

    /// Fetch the entire track library
    async fn get_all_tracks(&self) -> Result<Option<TrackBatch>>;

    /// Fetch tracks changed since `since`, including deletions
    async fn get_updated_tracks(&self, since: DateTime<Utc>) -> Result<Option<TrackBatch>>;

    /// Fetch every playlist with its entries
    async fn get_all_playlists(&self) -> Result<Option<PlaylistBatch>>;

    /// Resolve a playable URL; `device_id` 0 selects the non-device stream path
    async fn get_stream_url(&self, track_id: &str, device_id: u64) -> Result<Option<String>>;

    /// List devices registered on the account
    async fn get_account_devices(&self) -> Result<Option<Vec<RemoteDevice>>>;
}
