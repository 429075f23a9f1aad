use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "playdeck";
const LIBRARY_FILE: &str = "library.json";

/// How often the host asks the tracker whether the current track ended.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("PLAYDECK_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = if cfg!(windows) {
        env::var("USERPROFILE").context("USERPROFILE is not set")?
    } else {
        env::var("HOME").context("HOME is not set")?
    };
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn library_path() -> Result<PathBuf> {
    Ok(config_root()?.join(LIBRARY_FILE))
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_windows_verbatim_prefix(&canonical)
}

pub fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn library_lives_under_override_dir() {
        let dir = tempdir().expect("tempdir");
        unsafe {
            env::set_var("PLAYDECK_CONFIG_DIR", dir.path().to_string_lossy().as_ref());
        }

        let path = library_path().expect("library path");
        assert_eq!(path, dir.path().join("library.json"));
    }

    #[test]
    fn imported_tracks_lose_the_verbatim_prefix() {
        let local = strip_windows_verbatim_prefix(Path::new(r"\\?\C:\Music\Evening\01 intro.flac"));
        assert_eq!(local, PathBuf::from(r"C:\Music\Evening\01 intro.flac"));

        let shared = strip_windows_verbatim_prefix(Path::new(r"\\?\UNC\nas\music\set.ogg"));
        assert_eq!(shared, PathBuf::from(r"\\nas\music\set.ogg"));

        let plain = Path::new("/home/me/music/set.ogg");
        assert_eq!(strip_windows_verbatim_prefix(plain), plain.to_path_buf());
    }
}
