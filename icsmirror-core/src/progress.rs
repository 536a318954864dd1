//! Per-destination record of events already mirrored.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{IcsMirrorError, IcsMirrorResult};
use crate::record::{EventRecord, IdentityKey};
use crate::state::write_atomic;

/// Identity keys successfully pushed to one destination.
///
/// Only grows. Keys go in after a confirmed push and never come out.
pub struct ProgressSet {
    path: PathBuf,
    keys: HashSet<IdentityKey>,
}

impl ProgressSet {
    /// Load the progress file at `path`. A missing file is an empty set.
    pub fn load(path: impl Into<PathBuf>) -> IcsMirrorResult<Self> {
        let path = path.into();

        if !path.exists() {
            log::warn!("Progress file {} not found, starting fresh", path.display());
            return Ok(ProgressSet {
                path,
                keys: HashSet::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let keys: Vec<IdentityKey> = serde_json::from_str(&content).map_err(|e| {
            IcsMirrorError::Serialization(format!("{}: {}", path.display(), e))
        })?;

        Ok(ProgressSet {
            path,
            keys: keys.into_iter().collect(),
        })
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    /// Mark a key as mirrored. Returns false if it already was.
    pub fn insert(&mut self, key: IdentityKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Records that have not been mirrored yet, in store order.
    pub fn pending<'a>(&'a self, records: &'a [EventRecord]) -> impl Iterator<Item = &'a EventRecord> {
        records
            .iter()
            .filter(|record| !self.contains(&record.identity_key()))
    }

    pub fn save(&self) -> IcsMirrorResult<()> {
        // Sort for deterministic output
        let mut sorted: Vec<&IdentityKey> = self.keys.iter().collect();
        sorted.sort();

        let content = serde_json::to_string_pretty(&sorted)
            .map_err(|e| IcsMirrorError::Serialization(e.to_string()))?;

        write_atomic(&self.path, content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(summary: &str, start: &str) -> EventRecord {
        let start = DateTime::parse_from_rfc3339(start).unwrap();
        EventRecord {
            uid: String::new(),
            summary: summary.to_string(),
            description: String::new(),
            start,
            end: start,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let progress = ProgressSet::load(dir.path().join("mirrored/personal.json")).unwrap();

        assert!(progress.is_empty());
    }

    #[test]
    fn test_save_and_reload_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirrored/personal.json");

        let mut progress = ProgressSet::load(&path).unwrap();
        assert!(progress.insert(record("Lecture", "2025-09-02T09:00:00Z").identity_key()));
        assert!(progress.insert(record("Exam", "2025-09-01T09:00:00Z").identity_key()));
        assert!(!progress.insert(record("Exam", "2025-09-01T09:00:00Z").identity_key()));
        progress.save().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let keys: Vec<String> = serde_json::from_str(&content).unwrap();
        assert_eq!(
            keys,
            vec![
                "Exam|2025-09-01T09:00:00+00:00".to_string(),
                "Lecture|2025-09-02T09:00:00+00:00".to_string(),
            ]
        );

        let reloaded = ProgressSet::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&record("Lecture", "2025-09-02T09:00:00Z").identity_key()));
    }

    #[test]
    fn test_load_accepts_keys_with_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        std::fs::write(&path, r#"["Anatomy Lab|2024-08-12T08:00:00-04:00"]"#).unwrap();

        let progress = ProgressSet::load(&path).unwrap();

        assert!(progress.contains(&record("Anatomy Lab", "2024-08-12T12:00:00Z").identity_key()));
    }

    #[test]
    fn test_load_accepts_bare_date_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        std::fs::write(&path, r#"["Orientation|2024-08-12"]"#).unwrap();

        let progress = ProgressSet::load(&path).unwrap();

        assert!(progress.contains(&record("Orientation", "2024-08-12T00:00:00Z").identity_key()));
    }

    #[test]
    fn test_pending_skips_mirrored_records() {
        let records = vec![
            record("Lecture", "2025-09-01T09:00:00Z"),
            record("Lab", "2025-09-01T13:00:00Z"),
        ];
        let dir = tempfile::tempdir().unwrap();
        let mut progress = ProgressSet::load(dir.path().join("p.json")).unwrap();
        progress.insert(records[0].identity_key());

        let pending: Vec<_> = progress.pending(&records).map(|r| r.summary.as_str()).collect();

        assert_eq!(pending, vec!["Lab"]);
    }
}
