//! On-disk layout of an icsmirror data directory.
//!
//! ```text
//! <data_dir>/
//!   stored_events.json      the dedup store
//!   latest.ics              last fetched feed, as received
//!   full.ics                feed rendered from the store
//!   mirrored/<dest>.json    progress set per destination
//! ```

use std::path::{Path, PathBuf};

const EVENTS_FILE: &str = "stored_events.json";
const LATEST_FEED_FILE: &str = "latest.ics";
const FULL_FEED_FILE: &str = "full.ics";
const MIRRORED_DIR: &str = "mirrored";

#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StateDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events_path(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    pub fn latest_feed_path(&self) -> PathBuf {
        self.root.join(LATEST_FEED_FILE)
    }

    pub fn full_feed_path(&self) -> PathBuf {
        self.root.join(FULL_FEED_FILE)
    }

    /// Progress file for a destination, named after its slug.
    pub fn progress_path(&self, destination: &str) -> PathBuf {
        self.root
            .join(MIRRORED_DIR)
            .join(progress_file_name(destination))
    }
}

/// File name of a destination's progress set. Names that slug alike share a file.
pub fn progress_file_name(destination: &str) -> String {
    format!("{}.json", slug::slugify(destination))
}

/// Write through a temp file and rename, so readers never see a partial file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    std::fs::write(&temp, contents)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_path_is_slugged() {
        let state = StateDir::new("/data");

        assert_eq!(
            state.progress_path("School Calendar"),
            PathBuf::from("/data/mirrored/school-calendar.json")
        );
    }

    #[test]
    fn test_write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");

        write_atomic(&path, b"[]").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(!dir.path().join("nested/out.json.tmp").exists());
    }
}
