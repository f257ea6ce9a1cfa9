//! Subscription store.
//!
//! The whole [`ApplicationState`] is loaded once at start and written back
//! once at the end of a batch run.  There is no incremental persistence.
//!
//! The on-disk record is bincode-encoded and not meant to be read by anything
//! but this crate.  Saves go to a sibling `.tmp` file which is then renamed
//! over the real one, so a crash mid-save leaves the previous state intact.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;

/// One subscribed feed and how far it has been read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub name: String,
    /// Feed URL. Unique within a state.
    pub url: String,
    /// Every item published at or before this instant counts as read.
    /// `None` means nothing has been read yet.
    pub last_read: Option<DateTime<Utc>>,
    /// Highest item index seen by a previous run.  Kept for older state
    /// files; read status never depends on it.
    pub last_read_index: Option<usize>,
}

impl Subscription {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            last_read: None,
            last_read_index: None,
        }
    }
}

/// All subscriptions, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationState {
    pub subscriptions: Vec<Subscription>,
}

impl ApplicationState {
    /// Subscribe to `url` unless it is already subscribed.
    ///
    /// Returns `true` when a new subscription was added.
    pub fn subscribe(&mut self, name: impl Into<String>, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.get(&url).is_some() {
            return false;
        }
        self.subscriptions.push(Subscription::new(name, url));
        true
    }

    /// Remove the subscription for `url`. Returns `true` if one was removed.
    pub fn unsubscribe(&mut self, url: &str) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.url != url);
        self.subscriptions.len() != before
    }

    pub fn get(&self, url: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.url == url)
    }
}

/// Load the state stored at `path`.
pub fn load(path: &Path) -> Result<ApplicationState, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let (state, read): (ApplicationState, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(|e| {
            StoreError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

    if read != bytes.len() {
        return Err(StoreError::Decode {
            path: path.to_path_buf(),
            reason: format!("{} trailing bytes", bytes.len() - read),
        });
    }

    debug!(path = %path.display(), subscriptions = state.subscriptions.len(), "loaded state");
    Ok(state)
}

/// Load the state at `path`, treating a missing file as an empty state.
pub fn load_or_default(path: &Path) -> Result<ApplicationState, StoreError> {
    match load(path) {
        Err(StoreError::NotFound(_)) => {
            info!(path = %path.display(), "no saved state, starting empty");
            Ok(ApplicationState::default())
        }
        other => other,
    }
}

/// Replace the state at `path` with `state`.
pub fn save(path: &Path, state: &ApplicationState) -> Result<(), StoreError> {
    let write_err = |reason: String| StoreError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = bincode::serde::encode_to_vec(state, bincode::config::standard())
        .map_err(|e| write_err(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }

    let tmp = sibling(path, "tmp");
    let result = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e.to_string()));
    }

    debug!(path = %path.display(), subscriptions = state.subscriptions.len(), "saved state");
    Ok(())
}

/// Move an unreadable state file out of the way so a fresh state can be
/// saved without destroying it.  Returns where the file went.
pub fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let target = sibling(path, "corrupt");
    fs::rename(path, &target)?;
    Ok(target)
}

/// `path` with `suffix` appended to its file name (`state.bin` -> `state.bin.tmp`).
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_state() -> ApplicationState {
        let mut state = ApplicationState::default();
        state.subscribe("First", "http://a/feed");
        state.subscribe("Second", "http://b/feed");
        state.subscriptions[0].last_read =
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 15).unwrap());
        state.subscriptions[0].last_read_index = Some(4);
        state
    }

    // -- subscribe -----------------------------------------------------------

    #[test]
    fn subscribe_starts_with_zero_watermark() {
        let mut state = ApplicationState::default();
        assert!(state.subscribe("Example", "http://x/feed"));

        let sub = &state.subscriptions[0];
        assert_eq!(sub.name, "Example");
        assert!(sub.last_read.is_none());
        assert!(sub.last_read_index.is_none());
    }

    #[test]
    fn subscribe_is_idempotent_by_url() {
        let mut once = ApplicationState::default();
        once.subscribe("n", "http://x/feed");

        let mut twice = once.clone();
        assert!(!twice.subscribe("n", "http://x/feed"));
        assert!(!twice.subscribe("other name", "http://x/feed"));

        assert_eq!(once, twice);
    }

    #[test]
    fn subscribe_keeps_existing_watermark() {
        let mut state = sample_state();
        let before = state.clone();
        state.subscribe("First again", "http://a/feed");
        assert_eq!(state, before);
    }

    #[test]
    fn subscribe_preserves_order() {
        let state = sample_state();
        let urls: Vec<_> = state.subscriptions.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, ["http://a/feed", "http://b/feed"]);
    }

    #[test]
    fn unsubscribe_removes_only_matching_url() {
        let mut state = sample_state();
        assert!(state.unsubscribe("http://a/feed"));
        assert!(!state.unsubscribe("http://a/feed"));
        assert_eq!(state.subscriptions.len(), 1);
        assert!(state.get("http://b/feed").is_some());
    }

    // -- load / save ---------------------------------------------------------

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rss_state.bin");
        let state = sample_state();

        save(&path, &state).unwrap();
        assert_eq!(load(&path).unwrap(), state);
    }

    #[test]
    fn empty_state_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rss_state.bin");

        save(&path, &ApplicationState::default()).unwrap();
        assert_eq!(load(&path).unwrap(), ApplicationState::default());
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rss_state.bin");

        save(&path, &sample_state()).unwrap();
        save(&path, &ApplicationState::default()).unwrap();

        assert_eq!(load(&path).unwrap(), ApplicationState::default());
        assert!(!dir.path().join("rss_state.bin.tmp").exists());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/state.bin");

        save(&path, &sample_state()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn load_or_default_recovers_from_missing_file() {
        let dir = TempDir::new().unwrap();
        let state = load_or_default(&dir.path().join("absent.bin")).unwrap();
        assert!(state.subscriptions.is_empty());
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rss_state.bin");
        fs::write(&path, [0xff, 0xff, 0xff, 0xff, 0xff]).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
        assert!(matches!(load_or_default(&path), Err(StoreError::Decode { .. })));
    }

    #[test]
    fn trailing_bytes_are_a_decode_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rss_state.bin");
        save(&path, &sample_state()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(b"junk");
        fs::write(&path, bytes).unwrap();

        assert!(matches!(load(&path), Err(StoreError::Decode { .. })));
    }

    #[test]
    fn quarantine_moves_file_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rss_state.bin");
        fs::write(&path, b"broken").unwrap();

        let moved = quarantine(&path).unwrap();
        assert_eq!(moved, dir.path().join("rss_state.bin.corrupt"));
        assert!(!path.exists());
        assert_eq!(fs::read(moved).unwrap(), b"broken");
    }
}
