#![no_main]

use libfuzzer_sys::fuzz_target;
use playdeck::audio::{NullDevice, PlaybackDevice};
use playdeck::core::{Direction, Tracker};
use playdeck::model::{PlaybackState, Playlist};
use playdeck::store::MemoryStore;
use std::path::PathBuf;

fuzz_target!(|data: &[u8]| {
    let len = data.first().map(|byte| usize::from(*byte % 8)).unwrap_or(0);
    let songs: Vec<PathBuf> = (0..len)
        .map(|idx| PathBuf::from(format!("track_{idx}.mp3")))
        .collect();
    let playlist = Playlist {
        last_track: songs.first().cloned(),
        songs,
        ..Playlist::default()
    };
    let mut tracker = Tracker::with_seed(
        NullDevice::new(),
        MemoryStore::with_playlist(playlist),
        data.len() as u64,
    );

    for byte in data.iter().skip(1) {
        match byte % 11 {
            0 => tracker.next(),
            1 => tracker.previous(),
            2 => {
                let _ = tracker.play();
            }
            3 => tracker.pause(),
            4 => tracker.stop(),
            5 => {
                let _ = tracker.toggle_shuffle();
            }
            6 => {
                let _ = tracker.cycle_loop_mode();
            }
            7 => tracker.device_mut().finish_track(),
            8 => tracker.advance(Direction::Backward, byte & 0x80 != 0),
            9 => tracker.advance(Direction::Forward, byte & 0x80 != 0),
            _ => tracker.monitor(),
        }

        if let Some(path) = tracker.current_track_path() {
            assert!(tracker.songs().iter().any(|song| song == path));
        }
        if tracker.playback_state() == PlaybackState::Playing && byte % 11 == 10 {
            assert!(tracker.device().is_busy());
        }
    }
});
