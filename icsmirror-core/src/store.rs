//! The dedup store: an append-only, identity-key-unique list of events.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{IcsMirrorError, IcsMirrorResult};
use crate::record::{EventRecord, IdentityKey};
use crate::state::write_atomic;

/// Result of merging a batch of incoming records into existing ones.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Every record after the merge, in insertion order, one per identity key.
    pub merged: Vec<EventRecord>,
    /// Records that were not known before, in the order they arrived.
    pub added: Vec<EventRecord>,
    /// Duplicates found (and dropped) among the existing records.
    pub collapsed: usize,
}

/// Merge `incoming` into `existing`, first write wins.
///
/// Existing duplicates are collapsed to their first occurrence before any
/// incoming record is considered. Incoming records whose key is already
/// present are discarded without touching the stored record.
pub fn merge(
    existing: Vec<EventRecord>,
    incoming: impl IntoIterator<Item = EventRecord>,
) -> MergeOutcome {
    let mut seen: HashSet<IdentityKey> = HashSet::with_capacity(existing.len());
    let mut merged = Vec::with_capacity(existing.len());
    let mut collapsed = 0;

    for record in existing {
        if seen.insert(record.identity_key()) {
            merged.push(record);
        } else {
            log::debug!(
                "Dropping stored duplicate of '{}' at {}",
                record.summary,
                record.start
            );
            collapsed += 1;
        }
    }

    let mut added = Vec::new();
    for record in incoming {
        if seen.insert(record.identity_key()) {
            merged.push(record.clone());
            added.push(record);
        }
    }

    MergeOutcome {
        merged,
        added,
        collapsed,
    }
}

/// The persisted store, loaded from and saved to a JSON file.
pub struct EventStore {
    path: PathBuf,
    records: Vec<EventRecord>,
}

impl EventStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> IcsMirrorResult<Self> {
        let path = path.into();

        if !path.exists() {
            log::warn!(
                "Event store {} not found, starting empty",
                path.display()
            );
            return Ok(EventStore {
                path,
                records: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let records: Vec<EventRecord> = serde_json::from_str(&content).map_err(|e| {
            IcsMirrorError::Serialization(format!("{}: {}", path.display(), e))
        })?;

        Ok(EventStore { path, records })
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge incoming records into the store and return the ones that were new.
    ///
    /// Only the in-memory store changes; call `save` to persist.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = EventRecord>) -> Vec<EventRecord> {
        let existing = std::mem::take(&mut self.records);
        let outcome = merge(existing, incoming);

        if outcome.collapsed > 0 {
            log::warn!(
                "Collapsed {} duplicate stored event(s) in {}",
                outcome.collapsed,
                self.path.display()
            );
        }

        self.records = outcome.merged;
        outcome.added
    }

    pub fn save(&self) -> IcsMirrorResult<()> {
        let content = serde_json::to_string_pretty(&self.records)
            .map_err(|e| IcsMirrorError::Serialization(e.to_string()))?;

        write_atomic(&self.path, content.as_bytes())?;
        Ok(())
    }
}
