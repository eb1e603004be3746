use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Remote service unreachable")]
    Offline,

    #[error("Session context has been retired")]
    SessionRetired,

    #[error("track is unavailable (song_id: {track_id})")]
    TrackUnavailable { track_id: String },

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
