//! Durable playlist storage.
//!
//! [`JsonStore`] keeps a library index file next to one JSON file per
//! playlist. The index remembers which playlist was used last so a session
//! can pick up where it stopped.

use crate::error::{Result, TrackerError};
use crate::model::{LibraryIndex, Playlist};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub trait PlaylistStore {
    /// Returns the most recently used playlist, or a fresh default one.
    fn load_last(&mut self) -> Result<Playlist>;

    fn save(&mut self, playlist: &Playlist) -> Result<()>;
}

impl<S: PlaylistStore + ?Sized> PlaylistStore for Box<S> {
    fn load_last(&mut self) -> Result<Playlist> {
        (**self).load_last()
    }

    fn save(&mut self, playlist: &Playlist) -> Result<()> {
        (**self).save(playlist)
    }
}

#[derive(Debug)]
pub struct JsonStore {
    library_path: PathBuf,
    index: LibraryIndex,
    /// Set after a load hit a file that does not parse. The next save moves
    /// the files it would replace to `*.bak` first.
    keep_originals: bool,
}

impl JsonStore {
    pub fn new(library_path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: library_path.into(),
            index: LibraryIndex::default(),
            keep_originals: false,
        }
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    pub fn index(&self) -> &LibraryIndex {
        &self.index
    }

    /// Location of the last-used playlist file. Relative names in the index
    /// are resolved against the directory holding the index.
    pub fn playlist_path(&self) -> PathBuf {
        if self.index.last.is_absolute() {
            return self.index.last.clone();
        }
        self.library_path
            .parent()
            .map(|dir| dir.join(&self.index.last))
            .unwrap_or_else(|| self.index.last.clone())
    }

    fn refresh_index(&mut self) -> Result<()> {
        if let Some(index) = read_json::<LibraryIndex>(&self.library_path)? {
            self.index = index;
        } else {
            debug!(path = %self.library_path.display(), "no library index yet, using defaults");
        }
        Ok(())
    }

    fn read_last(&mut self) -> Result<Playlist> {
        self.refresh_index()?;
        let path = self.playlist_path();
        match read_json::<Playlist>(&path)? {
            Some(playlist) => {
                info!(path = %path.display(), songs = playlist.songs.len(), "loaded playlist");
                Ok(playlist)
            }
            None => {
                debug!(path = %path.display(), "no playlist file yet, starting a new one");
                Ok(Playlist::default())
            }
        }
    }
}

impl PlaylistStore for JsonStore {
    fn load_last(&mut self) -> Result<Playlist> {
        let loaded = self.read_last();
        if matches!(loaded, Err(TrackerError::MalformedRecord { .. })) {
            self.keep_originals = true;
        }
        loaded
    }

    fn save(&mut self, playlist: &Playlist) -> Result<()> {
        let path = self.playlist_path();
        if self.keep_originals {
            back_up(&path)?;
            back_up(&self.library_path)?;
            self.keep_originals = false;
        }
        write_json(&path, playlist)?;
        let file = self.index.last.clone();
        self.index.touch(file);
        write_json(&self.library_path, &self.index)?;
        info!(path = %path.display(), "saved playlist");
        Ok(())
    }
}

/// Keeps the playlist in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub playlist: Option<Playlist>,
    pub saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playlist(playlist: Playlist) -> Self {
        Self {
            playlist: Some(playlist),
            saves: 0,
        }
    }
}

impl PlaylistStore for MemoryStore {
    fn load_last(&mut self) -> Result<Playlist> {
        Ok(self.playlist.clone().unwrap_or_default())
    }

    fn save(&mut self, playlist: &Playlist) -> Result<()> {
        self.playlist = Some(playlist.clone());
        self.saves += 1;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(TrackerError::StoreUnavailable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| TrackerError::MalformedRecord {
            path: path.to_path_buf(),
            source,
        })
}

/// Renames `path` to `path.bak` if it exists.
fn back_up(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".bak");
    let backup = path.with_file_name(name);
    fs::rename(path, &backup).map_err(|source| TrackerError::StoreUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    warn!(
        path = %path.display(),
        backup = %backup.display(),
        "moved unreadable file aside before saving"
    );
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let unavailable = |source| TrackerError::StoreUnavailable {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(unavailable)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| {
        TrackerError::MalformedRecord {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, json).map_err(unavailable)
}
