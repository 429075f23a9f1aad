//! Errors surfaced by the tracker and its collaborators.
//!
//! Navigation problems (a current track missing from the playlist, an empty
//! playlist) never show up here: the engine recovers from those locally.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The playlist store could not be read or written.
    #[error("playlist store unavailable at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record exists but cannot be decoded.
    #[error("malformed record in {}: {source}", path.display())]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The playback device refused to load a track.
    #[error("playback device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
