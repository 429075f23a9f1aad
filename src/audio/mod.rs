use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The audio output the tracker drives.
///
/// Calls return immediately; completion is observed by polling
/// [`PlaybackDevice::is_busy`].
pub trait PlaybackDevice {
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn unpause(&mut self);
    fn stop(&mut self);
    /// True while audio is actually being produced. A paused device is not busy.
    fn is_busy(&self) -> bool;
    fn elapsed_millis(&self) -> u64;
}

impl<D: PlaybackDevice + ?Sized> PlaybackDevice for Box<D> {
    fn load(&mut self, path: &Path) -> Result<()> {
        (**self).load(path)
    }

    fn play(&mut self) {
        (**self).play();
    }

    fn pause(&mut self) {
        (**self).pause();
    }

    fn unpause(&mut self) {
        (**self).unpause();
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn elapsed_millis(&self) -> u64 {
        (**self).elapsed_millis()
    }
}

pub struct RodioDevice {
    stream: OutputStream,
    sink: Sink,
}

impl RodioDevice {
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")
            .and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
                    .context("failed to start default output stream")
            })?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        Ok(Self { stream, sink })
    }
}

impl PlaybackDevice for RodioDevice {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();

        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.sink.append(source);
        Ok(())
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn unpause(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn is_busy(&self) -> bool {
        !self.sink.empty() && !self.sink.is_paused()
    }

    fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.sink.get_pos().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A device that plays nothing but keeps time as if it did.
///
/// A loaded track stays busy after `play` until it is stopped, paused,
/// [`NullDevice::finish_track`] is called, or the optional simulated track
/// length runs out.
#[derive(Debug, Default)]
pub struct NullDevice {
    loaded: Option<PathBuf>,
    started_at: Option<Instant>,
    position_offset: Duration,
    paused: bool,
    track_length: Option<Duration>,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track_length(track_length: Duration) -> Self {
        Self {
            track_length: Some(track_length),
            ..Self::default()
        }
    }

    pub fn loaded_track(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ends the current track as if it had played to the end.
    pub fn finish_track(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = false;
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if let Some(started_at) = self.started_at {
            position = position.saturating_add(started_at.elapsed());
        }
        match self.track_length {
            Some(length) => position.min(length),
            None => position,
        }
    }

    fn length_elapsed(&self) -> bool {
        self.track_length
            .is_some_and(|length| self.current_position() >= length)
    }
}

impl PlaybackDevice for NullDevice {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.loaded = Some(path.to_path_buf());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.paused = false;
        Ok(())
    }

    fn play(&mut self) {
        if self.loaded.is_none() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.position_offset = Duration::ZERO;
        self.paused = false;
    }

    fn pause(&mut self) {
        if self.started_at.is_none() {
            return;
        }
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn unpause(&mut self) {
        if !self.paused || self.loaded.is_none() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.paused = false;
    }

    fn stop(&mut self) {
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.paused = false;
    }

    fn is_busy(&self) -> bool {
        self.started_at.is_some() && !self.length_elapsed()
    }

    fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.current_position().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::{NullDevice, PlaybackDevice};
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn null_device_is_busy_only_while_playing() {
        let mut device = NullDevice::new();
        assert!(!device.is_busy());

        device.play();
        assert!(!device.is_busy(), "nothing loaded yet");

        device.load(Path::new("a.mp3")).expect("load");
        assert!(!device.is_busy(), "load alone does not start playback");

        device.play();
        assert!(device.is_busy());

        device.pause();
        assert!(!device.is_busy());
        assert!(device.is_paused());

        device.unpause();
        assert!(device.is_busy());

        device.stop();
        assert!(!device.is_busy());
        assert_eq!(device.loaded_track(), Some(Path::new("a.mp3")));
    }

    #[test]
    fn finish_track_ends_playback() {
        let mut device = NullDevice::new();
        device.load(Path::new("a.mp3")).expect("load");
        device.play();
        device.finish_track();
        assert!(!device.is_busy());
    }

    #[test]
    fn simulated_track_length_runs_out() {
        let mut device = NullDevice::with_track_length(Duration::from_millis(20));
        device.load(Path::new("a.mp3")).expect("load");
        device.play();
        thread::sleep(Duration::from_millis(40));
        assert!(!device.is_busy());
        assert_eq!(device.elapsed_millis(), 20);
    }

    #[test]
    fn elapsed_time_freezes_while_paused() {
        let mut device = NullDevice::new();
        device.load(Path::new("a.mp3")).expect("load");
        device.play();
        thread::sleep(Duration::from_millis(15));
        device.pause();
        let frozen = device.elapsed_millis();
        thread::sleep(Duration::from_millis(15));
        assert_eq!(device.elapsed_millis(), frozen);
        assert!(frozen >= 15);
    }
}
