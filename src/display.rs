//! Text for a one-line "now playing" readout.

use crate::audio::PlaybackDevice;
use crate::core::Tracker;
use crate::model::{LoopMode, PlaybackState, Playlist};
use crate::store::PlaylistStore;

pub fn mode_badges(shuffle: bool, loop_mode: LoopMode) -> String {
    let shuffle = if shuffle { '≈' } else { ' ' };
    let repeat = match loop_mode {
        LoopMode::All => '∞',
        LoopMode::One => '1',
        LoopMode::Off => ' ',
    };
    format!("{shuffle}{repeat}")
}

/// `5250` → `5.25s`, `65500` → `1:05.50s`.
pub fn format_elapsed(millis: u64) -> String {
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) as f64 / 1000.0;
    if minutes > 0 {
        format!("{minutes}:{seconds:05.2}s")
    } else {
        format!("{seconds:.2}s")
    }
}

pub fn status_line<D: PlaybackDevice, S: PlaylistStore>(tracker: &Tracker<D, S>) -> String {
    let badges = mode_badges(tracker.shuffle(), tracker.loop_mode());
    let song = tracker
        .current_track_name()
        .unwrap_or_else(|| String::from("Song: --"));
    let mut line = format!("Album: {} {badges} | {song}", tracker.album_name());

    let state = tracker.playback_state();
    if tracker.current_track_path().is_some() && state != PlaybackState::Stopped {
        let paused = if state == PlaybackState::Paused {
            "(paused) "
        } else {
            ""
        };
        line.push_str(&format!(
            " | {paused}{}",
            format_elapsed(tracker.elapsed_millis())
        ));
    }
    line
}

/// Multi-line listing of a playlist with the current track marked by `>`.
pub fn playlist_listing(playlist: &Playlist) -> String {
    let loop_label = match playlist.loop_mode {
        LoopMode::Off => "off",
        LoopMode::One => "one",
        LoopMode::All => "all",
    };
    let mut out = format!(
        "{} [shuffle: {}, loop: {loop_label}]\n",
        playlist.name,
        if playlist.shuffle { "on" } else { "off" }
    );

    if playlist.songs.is_empty() {
        out.push_str("  (no songs)\n");
    }
    for (idx, song) in playlist.songs.iter().enumerate() {
        let marker = if playlist.last_track.as_ref() == Some(song) {
            '>'
        } else {
            ' '
        };
        out.push_str(&format!("{marker} {:>3}. {}\n", idx + 1, song.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullDevice;
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    #[test]
    fn badges_reflect_modes() {
        assert_eq!(mode_badges(true, LoopMode::All), "≈∞");
        assert_eq!(mode_badges(false, LoopMode::One), " 1");
        assert_eq!(mode_badges(false, LoopMode::Off), "  ");
    }

    #[test]
    fn elapsed_time_formats() {
        assert_eq!(format_elapsed(0), "0.00s");
        assert_eq!(format_elapsed(5_250), "5.25s");
        assert_eq!(format_elapsed(65_500), "1:05.50s");
        assert_eq!(format_elapsed(754_000), "12:34.00s");
    }

    #[test]
    fn status_line_shows_album_track_and_pause() {
        let playlist = Playlist {
            name: String::from("Road trip"),
            songs: vec![PathBuf::from("/music/drive.mp3")],
            last_track: Some(PathBuf::from("/music/drive.mp3")),
            shuffle: false,
            loop_mode: LoopMode::One,
        };
        let mut tracker = Tracker::new(NullDevice::new(), MemoryStore::with_playlist(playlist));
        assert_eq!(status_line(&tracker), "Album: Road trip  1 | drive.mp3");

        tracker.play().expect("play");
        tracker.pause();
        let line = status_line(&tracker);
        assert!(line.starts_with("Album: Road trip  1 | drive.mp3 | (paused) "), "{line}");
        assert!(line.ends_with('s'));
    }

    #[test]
    fn status_line_without_track() {
        let tracker = Tracker::new(NullDevice::new(), MemoryStore::new());
        assert_eq!(status_line(&tracker), "Album: New playlist ≈∞ | Song: --");
    }

    #[test]
    fn listing_marks_current_track() {
        let playlist = Playlist {
            name: String::from("Mix"),
            songs: vec![PathBuf::from("a.mp3"), PathBuf::from("b.mp3")],
            last_track: Some(PathBuf::from("b.mp3")),
            shuffle: false,
            loop_mode: LoopMode::All,
        };
        assert_eq!(
            playlist_listing(&playlist),
            "Mix [shuffle: off, loop: all]\n    1. a.mp3\n>   2. b.mp3\n"
        );
    }

    #[test]
    fn listing_of_empty_playlist() {
        assert_eq!(
            playlist_listing(&Playlist::default()),
            "New playlist [shuffle: on, loop: all]\n  (no songs)\n"
        );
    }
}
