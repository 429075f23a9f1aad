use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_PLAYLIST_NAME: &str = "New playlist";
pub const DEFAULT_LIBRARY_NAME: &str = "Default";
pub const DEFAULT_PLAYLIST_FILE: &str = "library.mplib";
pub const LIBRARY_VERSION: u32 = 1;

/// What happens when the current track finishes on its own.
///
/// Persisted as `0` (off), `1` (repeat one) or `2` (repeat all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    One,
    All,
}

impl LoopMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::One,
            Self::One => Self::All,
            Self::All => Self::Off,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::One => 1,
            Self::All => 2,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::One,
            _ => Self::All,
        }
    }
}

impl Serialize for LoopMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for LoopMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LoopModeVisitor)
    }
}

struct LoopModeVisitor;

impl<'de> Visitor<'de> for LoopModeVisitor {
    type Value = LoopMode;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a loop mode code (0, 1, 2), a boolean or null")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<LoopMode, E> {
        Ok(LoopMode::from_code(i64::try_from(value).unwrap_or(i64::MAX)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<LoopMode, E> {
        Ok(LoopMode::from_code(value))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<LoopMode, E> {
        Ok(if value { LoopMode::One } else { LoopMode::Off })
    }

    fn visit_unit<E: de::Error>(self) -> Result<LoopMode, E> {
        Ok(LoopMode::Off)
    }

    fn visit_none<E: de::Error>(self) -> Result<LoopMode, E> {
        Ok(LoopMode::Off)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<LoopMode, D::Error>
    where
        D: Deserializer<'de>,
    {
        LoopMode::deserialize(deserializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A named, ordered list of tracks plus the preferences that travel with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default = "default_playlist_name")]
    pub name: String,
    #[serde(default)]
    pub songs: Vec<PathBuf>,
    #[serde(default, rename = "last", alias = "lastTrack")]
    pub last_track: Option<PathBuf>,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default = "default_loop_mode", rename = "loop", alias = "loopMode")]
    pub loop_mode: LoopMode,
}

fn default_playlist_name() -> String {
    String::from(DEFAULT_PLAYLIST_NAME)
}

fn default_shuffle() -> bool {
    true
}

fn default_loop_mode() -> LoopMode {
    LoopMode::All
}

impl Default for Playlist {
    fn default() -> Self {
        Self {
            name: default_playlist_name(),
            songs: Vec::new(),
            last_track: None,
            shuffle: default_shuffle(),
            loop_mode: default_loop_mode(),
        }
    }
}

/// The library file: which playlists exist and which one was used last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryIndex {
    #[serde(default = "default_library_name")]
    pub name: String,
    #[serde(default = "default_library_version")]
    pub ver: u32,
    #[serde(default = "default_ui")]
    pub ui: serde_json::Value,
    #[serde(default)]
    pub playlists: Vec<PathBuf>,
    #[serde(default = "default_playlist_file")]
    pub last: PathBuf,
}

fn default_library_name() -> String {
    String::from(DEFAULT_LIBRARY_NAME)
}

fn default_library_version() -> u32 {
    LIBRARY_VERSION
}

fn default_ui() -> serde_json::Value {
    serde_json::json!({ "x": 0, "y": 0 })
}

fn default_playlist_file() -> PathBuf {
    PathBuf::from(DEFAULT_PLAYLIST_FILE)
}

impl Default for LibraryIndex {
    fn default() -> Self {
        Self {
            name: default_library_name(),
            ver: default_library_version(),
            ui: default_ui(),
            playlists: vec![default_playlist_file()],
            last: default_playlist_file(),
        }
    }
}

impl LibraryIndex {
    /// Marks `file` as the most recently used playlist, registering it if new.
    pub fn touch(&mut self, file: PathBuf) {
        if !self.playlists.iter().any(|known| known == &file) {
            self.playlists.push(file.clone());
        }
        self.last = file;
        self.ver = LIBRARY_VERSION;
    }
}
