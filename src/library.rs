use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

/// Expands files and folders into the audio tracks they contain.
///
/// Files are kept in the order given; each folder contributes its audio
/// files sorted by path.
pub fn collect_tracks(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut tracks = Vec::new();

    for input in inputs {
        if input.is_dir() {
            tracks.extend(scan_folder(input));
        } else if input.is_file() && is_audio(input) {
            tracks.push(crate::config::normalize_path(input));
        } else {
            warn!(path = %input.display(), "skipping path that is not an audio file or folder");
        }
    }

    tracks
}

pub fn scan_folder(root: &Path) -> Vec<PathBuf> {
    let mut tracks: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
        .map(|entry| crate::config::normalize_path(entry.path()))
        .collect();

    tracks.sort();
    tracks
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn recognises_audio_extensions_case_insensitively() {
        assert!(is_audio(Path::new("a.MP3")));
        assert!(is_audio(Path::new("dir/b.flac")));
        assert!(!is_audio(Path::new("cover.jpg")));
        assert!(!is_audio(Path::new("README")));
    }

    #[test]
    fn folders_are_walked_recursively_and_sorted() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("disc2");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(dir.path().join("b.mp3"), b"").expect("write");
        fs::write(dir.path().join("a.ogg"), b"").expect("write");
        fs::write(dir.path().join("notes.txt"), b"").expect("write");
        fs::write(nested.join("c.wav"), b"").expect("write");

        let names: Vec<String> = collect_tracks(&[dir.path().to_path_buf()])
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.ogg", "b.mp3", "c.wav"]);
    }

    #[test]
    fn missing_and_non_audio_inputs_are_skipped() {
        let dir = tempdir().expect("tempdir");
        let text = dir.path().join("notes.txt");
        fs::write(&text, b"").expect("write");

        let tracks = collect_tracks(&[text, dir.path().join("missing.mp3")]);
        assert!(tracks.is_empty());
    }
}
