use crate::audio::PlaybackDevice;
use crate::error::{Result, TrackerError};
use crate::model::{LoopMode, PlaybackState, Playlist};
use crate::store::PlaylistStore;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Decides which track plays next and keeps the transport in step with the
/// playback device.
///
/// The host calls [`Tracker::monitor`] on a fixed cadence so a track that
/// ends on its own is handled according to the playlist's loop mode.
#[derive(Debug)]
pub struct Tracker<D, S> {
    playlist: Playlist,
    state: PlaybackState,
    previous: Option<PathBuf>,
    rng: SmallRng,
    device: D,
    store: S,
}

impl<D: PlaybackDevice, S: PlaylistStore> Tracker<D, S> {
    pub fn new(device: D, store: S) -> Self {
        Self::with_rng(device, store, SmallRng::from_os_rng())
    }

    /// Same as [`Tracker::new`] with a deterministic shuffle sequence.
    pub fn with_seed(device: D, store: S, seed: u64) -> Self {
        Self::with_rng(device, store, SmallRng::seed_from_u64(seed))
    }

    /// Like [`Tracker::new`], but a store that cannot be read is an error
    /// instead of an empty playlist.
    pub fn open(device: D, mut store: S) -> Result<Self> {
        let playlist = store.load_last()?;
        Ok(Self::from_parts(device, store, playlist, SmallRng::from_os_rng()))
    }

    fn with_rng(device: D, mut store: S, rng: SmallRng) -> Self {
        let playlist = match store.load_last() {
            Ok(playlist) => playlist,
            Err(err) => {
                warn!(error = %err, "could not load the last playlist, starting a new one");
                Playlist::default()
            }
        };
        Self::from_parts(device, store, playlist, rng)
    }

    fn from_parts(device: D, store: S, playlist: Playlist, rng: SmallRng) -> Self {
        info!(
            playlist = %playlist.name,
            songs = playlist.songs.len(),
            shuffle = playlist.shuffle,
            loop_mode = ?playlist.loop_mode,
            "tracker ready"
        );

        Self {
            playlist,
            state: PlaybackState::Stopped,
            previous: None,
            rng,
            device,
            store,
        }
    }

    pub fn album_name(&self) -> &str {
        &self.playlist.name
    }

    pub fn current_track_path(&self) -> Option<&Path> {
        self.playlist.last_track.as_deref()
    }

    pub fn current_track_name(&self) -> Option<String> {
        let path = self.current_track_path()?;
        Some(
            path.file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
        )
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    pub fn shuffle(&self) -> bool {
        self.playlist.shuffle
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.playlist.loop_mode
    }

    pub fn previous_track(&self) -> Option<&Path> {
        self.previous.as_deref()
    }

    pub fn songs(&self) -> &[PathBuf] {
        &self.playlist.songs
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.device.elapsed_millis()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn toggle_shuffle(&mut self) -> Result<()> {
        self.playlist.shuffle = !self.playlist.shuffle;
        debug!(shuffle = self.playlist.shuffle, "toggled shuffle");
        self.save()
    }

    pub fn cycle_loop_mode(&mut self) -> Result<()> {
        self.playlist.loop_mode = self.playlist.loop_mode.next();
        debug!(loop_mode = ?self.playlist.loop_mode, "cycled loop mode");
        self.save()
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.playlist.name = name.to_string();
        self.save()
    }

    /// Appends tracks to the playlist and persists it. The first added track
    /// becomes current when nothing was selected yet.
    pub fn add_tracks<I>(&mut self, tracks: I) -> Result<usize>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let before = self.playlist.songs.len();
        self.playlist.songs.extend(tracks);
        let added = self.playlist.songs.len() - before;
        if added == 0 {
            return Ok(0);
        }

        if self.playlist.last_track.is_none() {
            self.playlist.last_track = self.playlist.songs.get(before).cloned();
        }
        info!(added, total = self.playlist.songs.len(), "added tracks");
        self.save()?;
        Ok(added)
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.save(&self.playlist).inspect_err(|err| {
            warn!(error = %err, "failed to save playlist");
        })
    }

    /// User skip forward. Playback only continues if audio was playing.
    pub fn next(&mut self) {
        let Some(current) = self.playlist.last_track.clone() else {
            return;
        };
        self.previous = Some(current);
        let auto_play = self.device.is_busy();
        self.advance(Direction::Forward, auto_play);
    }

    /// User skip back. Returns to the track left by the last `next` once;
    /// after that it steps backwards, or picks at random while shuffling.
    pub fn previous(&mut self) {
        if self.playlist.last_track.is_none() {
            return;
        }

        if let Some(track) = self.previous.take() {
            debug!(track = %track.display(), "returning to remembered track");
            self.select_track(Some(track), true);
            return;
        }

        let auto_play = self.device.is_busy();
        if self.playlist.shuffle {
            self.advance(Direction::Forward, auto_play);
        } else {
            self.advance(Direction::Backward, auto_play);
        }
    }

    /// Moves the selection one step. Shuffle ignores `direction`.
    pub fn advance(&mut self, direction: Direction, auto_play: bool) {
        let current = self.current_index();

        if self.playlist.shuffle {
            let Some(idx) = self.random_index(current) else {
                debug!(
                    songs = self.playlist.songs.len(),
                    "shuffle has no other track to pick"
                );
                return;
            };
            let track = self.playlist.songs[idx].clone();
            self.select_track(Some(track), auto_play);
            return;
        }

        let Some(idx) = current else {
            warn!(
                track = ?self.playlist.last_track,
                "current track is not part of the playlist, clearing selection"
            );
            self.select_track(None, auto_play);
            return;
        };

        let len = self.playlist.songs.len();
        let next = match direction {
            Direction::Forward if idx + 1 >= len => 0,
            Direction::Forward => idx + 1,
            Direction::Backward if idx == 0 => len - 1,
            Direction::Backward => idx - 1,
        };
        let track = self.playlist.songs[next].clone();
        self.select_track(Some(track), auto_play);
    }

    /// Handles a track that ended on its own. Call once per polling tick.
    pub fn monitor(&mut self) {
        if self.device.is_busy()
            || self.playlist.last_track.is_none()
            || self.state != PlaybackState::Playing
        {
            return;
        }

        match self.playlist.loop_mode {
            LoopMode::One => {
                debug!("track ended, repeating it");
                self.autoplay();
            }
            LoopMode::Off => {
                debug!("track ended, stopping");
                self.state = PlaybackState::Stopped;
            }
            LoopMode::All => {
                debug!("track ended, advancing");
                self.advance(Direction::Forward, true);
                // a one-song shuffle has nowhere to go, so replay it
                if self.state == PlaybackState::Playing && !self.device.is_busy() {
                    self.autoplay();
                }
            }
        }
    }

    pub fn play(&mut self) -> Result<()> {
        if self.state == PlaybackState::Paused {
            self.device.unpause();
            self.state = PlaybackState::Playing;
            return Ok(());
        }

        if self.device.is_busy() {
            return Ok(());
        }

        let Some(track) = self.playlist.last_track.clone() else {
            return Ok(());
        };

        match self.device.load(&track) {
            Ok(()) => {
                self.device.play();
                self.state = PlaybackState::Playing;
                debug!(track = %track.display(), "playing");
                Ok(())
            }
            Err(err) => {
                self.state = PlaybackState::Stopped;
                Err(TrackerError::Device(format!("{err:#}")))
            }
        }
    }

    /// Pauses, or resumes when already paused.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Paused {
            self.device.unpause();
            self.state = PlaybackState::Playing;
            return;
        }

        if self.device.is_busy() && self.playlist.last_track.is_some() {
            self.device.pause();
            self.state = PlaybackState::Paused;
        }
    }

    pub fn stop(&mut self) {
        let sounding = self.device.is_busy() && self.playlist.last_track.is_some();
        if sounding || self.state == PlaybackState::Paused {
            self.device.stop();
            self.state = PlaybackState::Stopped;
        }
    }

    fn select_track(&mut self, track: Option<PathBuf>, auto_play: bool) {
        self.device.stop();
        self.state = PlaybackState::Stopped;

        let Some(track) = track else {
            self.playlist.last_track = None;
            return;
        };

        debug!(track = %track.display(), auto_play, "selected track");
        self.playlist.last_track = Some(track);
        if auto_play {
            self.autoplay();
        }
    }

    fn autoplay(&mut self) {
        if let Err(err) = self.play() {
            warn!(error = %err, "could not start playback");
        }
    }

    fn current_index(&self) -> Option<usize> {
        let current = self.playlist.last_track.as_ref()?;
        self.playlist.songs.iter().position(|song| song == current)
    }

    /// Uniform pick among every position except `current`. `None` when
    /// there is no alternative to the current track.
    fn random_index(&mut self, current: Option<usize>) -> Option<usize> {
        let len = self.playlist.songs.len();
        if len < 2 {
            return None;
        }

        match current {
            Some(current) => {
                let pick = self.rng.random_range(0..len - 1);
                Some(if pick >= current { pick + 1 } else { pick })
            }
            None => Some(self.rng.random_range(0..len)),
        }
    }
}
