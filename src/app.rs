use crate::audio::{NullDevice, PlaybackDevice, RodioDevice};
use crate::core::Tracker;
use crate::display;
use crate::library;
use crate::store::{JsonStore, PlaylistStore};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute};
use std::io::{self, Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{info, warn};

pub type HostTracker = Tracker<Box<dyn PlaybackDevice>, JsonStore>;

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub library: PathBuf,
    pub poll_interval: Duration,
    pub headless: bool,
    /// Simulated track length when playing without a sound device.
    pub track_length: Option<Duration>,
    pub log: SessionLog,
}

/// Log sink for the interactive session. While held, log lines are kept in
/// memory so they do not tear the status line; releasing writes them out.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    held: Arc<Mutex<Option<Vec<u8>>>>,
}

impl SessionLog {
    pub fn hold(&self) {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = Some(Vec::new());
    }

    pub fn release(&self) -> io::Result<()> {
        self.release_to(&mut io::stderr())
    }

    pub fn release_to(&self, out: &mut impl Write) -> io::Result<()> {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(lines) = held {
            out.write_all(&lines)?;
            out.flush()?;
        }
        Ok(())
    }
}

impl Write for SessionLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        match held.as_mut() {
            Some(lines) => {
                lines.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    ToggleShuffle,
    CycleLoop,
    Quit,
}

pub fn run(options: AppOptions) -> Result<()> {
    let mut tracker: HostTracker =
        Tracker::new(open_device(&options), JsonStore::new(&options.library));
    info!(library = %options.library.display(), "session started");

    terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
    options.log.hold();
    let result = event_loop(&mut tracker, options.poll_interval);
    let restored = terminal::disable_raw_mode().context("failed to restore terminal");
    println!();

    let finished = finish_session(&mut tracker, result, restored);
    options.log.release().context("failed to write session log")?;
    finished
}

/// Stops playback and saves before reporting the first error of the session.
fn finish_session<D: PlaybackDevice, S: PlaylistStore>(
    tracker: &mut Tracker<D, S>,
    result: Result<()>,
    restored: Result<()>,
) -> Result<()> {
    tracker.stop();
    let saved = tracker.save();
    info!("session ended");

    result?;
    restored?;
    saved?;
    Ok(())
}

fn event_loop<D: PlaybackDevice, S: PlaylistStore>(
    tracker: &mut Tracker<D, S>,
    poll_interval: Duration,
) -> Result<()> {
    let mut out = stdout();
    loop {
        tracker.monitor();
        draw(&mut out, &display::status_line(tracker))?;

        if !event::poll(poll_interval)? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(command) = command_for_key(key)
            && !apply(tracker, command)
        {
            return Ok(());
        }
    }
}

fn draw(out: &mut impl Write, line: &str) -> Result<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(line)
    )?;
    Ok(())
}

fn open_device(options: &AppOptions) -> Box<dyn PlaybackDevice> {
    let silent = || -> Box<dyn PlaybackDevice> {
        match options.track_length {
            Some(length) => Box::new(NullDevice::with_track_length(length)),
            None => Box::new(NullDevice::new()),
        }
    };

    if options.headless {
        return silent();
    }

    match RodioDevice::new() {
        Ok(device) => Box::new(device),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "no audio output available, playing silently");
            silent()
        }
    }
}

pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    let command = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char('p') | KeyCode::Enter => Command::Play,
        KeyCode::Char(' ') => Command::Pause,
        KeyCode::Char('s') => Command::Stop,
        KeyCode::Char('n') | KeyCode::Right => Command::Next,
        KeyCode::Char('b') | KeyCode::Left => Command::Previous,
        KeyCode::Char('r') => Command::ToggleShuffle,
        KeyCode::Char('l') => Command::CycleLoop,
        _ => return None,
    };
    Some(command)
}

/// Runs one command against the tracker. Returns `false` once the session
/// should end.
pub fn apply<D: PlaybackDevice, S: PlaylistStore>(
    tracker: &mut Tracker<D, S>,
    command: Command,
) -> bool {
    match command {
        Command::Play => {
            if let Err(err) = tracker.play() {
                warn!(error = %err, "could not start playback");
            }
        }
        Command::Pause => tracker.pause(),
        Command::Stop => tracker.stop(),
        Command::Next => tracker.next(),
        Command::Previous => tracker.previous(),
        // save failures are logged by the tracker and must not end the session
        Command::ToggleShuffle => {
            let _ = tracker.toggle_shuffle();
        }
        Command::CycleLoop => {
            let _ = tracker.cycle_loop_mode();
        }
        Command::Quit => return false,
    }
    true
}

/// Imports tracks into the last used playlist. Returns how many were added.
pub fn add_tracks(library_path: &Path, inputs: &[PathBuf]) -> Result<usize> {
    let tracks = library::collect_tracks(inputs);
    if tracks.is_empty() {
        anyhow::bail!("no audio files found in the given paths");
    }

    let mut tracker = Tracker::open(NullDevice::new(), JsonStore::new(library_path))
        .with_context(|| format!("failed to open library {}", library_path.display()))?;
    let added = tracker.add_tracks(tracks)?;
    Ok(added)
}

pub fn rename(library_path: &Path, name: &str) -> Result<()> {
    let mut tracker = Tracker::open(NullDevice::new(), JsonStore::new(library_path))
        .with_context(|| format!("failed to open library {}", library_path.display()))?;
    tracker.rename(name)?;
    Ok(())
}

pub fn show(library_path: &Path) -> Result<String> {
    let tracker = Tracker::open(NullDevice::new(), JsonStore::new(library_path))
        .with_context(|| format!("failed to open library {}", library_path.display()))?;
    Ok(display::playlist_listing(tracker.playlist()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LoopMode, PlaybackState, Playlist};
    use crate::store::MemoryStore;
    use std::fs;
    use tempfile::tempdir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(command_for_key(key(KeyCode::Char('n'))), Some(Command::Next));
        assert_eq!(command_for_key(key(KeyCode::Left)), Some(Command::Previous));
        assert_eq!(command_for_key(key(KeyCode::Char(' '))), Some(Command::Pause));
        assert_eq!(command_for_key(key(KeyCode::Enter)), Some(Command::Play));
        assert_eq!(command_for_key(key(KeyCode::Char('x'))), None);
        assert_eq!(
            command_for_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
    }

    #[test]
    fn commands_drive_the_tracker() {
        let playlist = Playlist {
            name: String::from("mix"),
            songs: vec![PathBuf::from("a.mp3"), PathBuf::from("b.mp3")],
            last_track: Some(PathBuf::from("a.mp3")),
            shuffle: false,
            loop_mode: LoopMode::All,
        };
        let mut tracker = Tracker::new(NullDevice::new(), MemoryStore::with_playlist(playlist));

        assert!(apply(&mut tracker, Command::Play));
        assert_eq!(tracker.playback_state(), PlaybackState::Playing);
        assert!(apply(&mut tracker, Command::Next));
        assert_eq!(tracker.current_track_path(), Some(Path::new("b.mp3")));
        assert!(apply(&mut tracker, Command::CycleLoop));
        assert_eq!(tracker.loop_mode(), LoopMode::Off);
        assert!(apply(&mut tracker, Command::ToggleShuffle));
        assert!(tracker.shuffle());
        assert_eq!(tracker.store().saves, 2);
        assert!(!apply(&mut tracker, Command::Quit));
    }

    #[test]
    fn session_is_saved_even_when_the_terminal_cannot_be_restored() {
        let playlist = Playlist {
            name: String::from("mix"),
            songs: vec![PathBuf::from("a.mp3")],
            last_track: Some(PathBuf::from("a.mp3")),
            shuffle: false,
            loop_mode: LoopMode::One,
        };
        let mut tracker = Tracker::new(NullDevice::new(), MemoryStore::with_playlist(playlist));
        tracker.play().expect("play");

        let err = finish_session(&mut tracker, Ok(()), Err(anyhow::anyhow!("tty gone")))
            .expect_err("restore failed");
        assert!(err.to_string().contains("tty gone"));
        assert_eq!(tracker.store().saves, 1);
        assert_eq!(tracker.playback_state(), PlaybackState::Stopped);
        assert!(!tracker.device().is_busy());
    }

    #[test]
    fn held_log_lines_are_written_on_release() {
        let mut log = SessionLog::default();
        log.hold();
        log.write_all(b"WARN could not start playback\n").expect("write");

        let mut out = Vec::new();
        log.release_to(&mut out).expect("release");
        assert_eq!(out, b"WARN could not start playback\n");

        let mut again = Vec::new();
        log.release_to(&mut again).expect("release");
        assert!(again.is_empty());
    }

    #[test]
    fn add_rename_and_show_round_trip_through_the_library() {
        let dir = tempdir().expect("tempdir");
        let music = dir.path().join("music");
        fs::create_dir_all(&music).expect("mkdir");
        fs::write(music.join("one.mp3"), b"").expect("write");
        fs::write(music.join("two.flac"), b"").expect("write");
        let library = dir.path().join("config").join("library.json");

        let added = add_tracks(&library, &[music]).expect("add");
        assert_eq!(added, 2);

        rename(&library, "Imports").expect("rename");
        let listing = show(&library).expect("show");
        assert!(listing.starts_with("Imports [shuffle: on, loop: all]"));
        assert!(listing.contains(">   1. "));
        assert!(listing.contains("one.mp3"));
        assert!(listing.contains("two.flac"));
    }

    #[test]
    fn add_refuses_paths_without_audio() {
        let dir = tempdir().expect("tempdir");
        let err = add_tracks(&dir.path().join("library.json"), &[dir.path().to_path_buf()])
            .expect_err("nothing to add");
        assert!(err.to_string().contains("no audio files"));
    }

    #[test]
    fn show_reports_malformed_library() {
        let dir = tempdir().expect("tempdir");
        let library = dir.path().join("library.json");
        fs::write(&library, "not json").expect("write");
        assert!(show(&library).is_err());
    }
}
