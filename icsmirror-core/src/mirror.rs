//! Idempotent mirroring of stored events into destination calendars.
//!
//! Destination services have no notion of idempotency, so each destination
//! keeps a `ProgressSet` of identity keys it has confirmed. A sweep pushes
//! every stored record whose key is missing from that set and records the
//! key only once the push succeeded. Failed pushes are retried next run.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::category::{Categorizer, Category};
use crate::error::{IcsMirrorResult, RemoteError};
use crate::progress::ProgressSet;
use crate::record::{EventRecord, IdentityKey};
use crate::state::StateDir;

/// A calendar that receives mirrored events.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// Local name, also used to name the progress file
    pub name: String,
    /// Calendar ID on the remote service
    pub calendar_id: String,
}

/// What gets sent to a destination for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub summary: String,
    /// Source description followed by a `UID:<uid>` line
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub time_zone: String,
    pub category: Option<Category>,
}

impl EventPayload {
    pub fn from_record(record: &EventRecord, category: Option<Category>) -> Self {
        let description = format!("{}\nUID:{}", record.description.trim(), record.uid)
            .trim()
            .to_string();

        EventPayload {
            summary: record.summary.clone(),
            description,
            start: record.start.with_timezone(&Utc),
            end: record.end.with_timezone(&Utc),
            time_zone: "UTC".to_string(),
            category,
        }
    }
}

/// A remote calendar service that can create events.
///
/// No idempotency is assumed: inserting the same payload twice creates two events.
#[allow(async_fn_in_trait)]
pub trait DestinationService {
    /// Create an event and return its remote ID.
    async fn insert(&self, calendar_id: &str, payload: &EventPayload) -> Result<String, RemoteError>;
}

/// Result of considering one record for one destination.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Added { remote_id: String },
    Skipped,
    Failed(RemoteError),
}

/// A push that failed during a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PushFailure {
    pub key: IdentityKey,
    pub error: RemoteError,
}

/// Counters for one destination sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub destination: String,
    pub added: usize,
    pub skipped: usize,
    pub failures: Vec<PushFailure>,
}

impl SweepReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn record(&mut self, key: &IdentityKey, outcome: PushOutcome) {
        match outcome {
            PushOutcome::Added { .. } => self.added += 1,
            PushOutcome::Skipped => self.skipped += 1,
            PushOutcome::Failed(error) => self.failures.push(PushFailure {
                key: key.clone(),
                error,
            }),
        }
    }
}

/// Drives sweeps over destinations through a `DestinationService`.
pub struct MirrorDriver<'a, S> {
    service: &'a S,
    categorizer: &'a Categorizer,
    push_delay: Duration,
}

impl<'a, S: DestinationService> MirrorDriver<'a, S> {
    pub fn new(service: &'a S, categorizer: &'a Categorizer, push_delay: Duration) -> Self {
        MirrorDriver {
            service,
            categorizer,
            push_delay,
        }
    }

    /// Push one record unless the destination already has it.
    pub async fn push_record(
        &self,
        destination: &Destination,
        record: &EventRecord,
        progress: &mut ProgressSet,
    ) -> PushOutcome {
        let key = record.identity_key();
        if progress.contains(&key) {
            return PushOutcome::Skipped;
        }

        let category = self.categorizer.categorize(record).cloned();
        let payload = EventPayload::from_record(record, category);

        match self.service.insert(&destination.calendar_id, &payload).await {
            Ok(remote_id) => {
                progress.insert(key);
                log::info!(
                    "Added '{}' to {} (category {})",
                    record.summary,
                    destination.name,
                    payload
                        .category
                        .as_ref()
                        .map(Category::as_str)
                        .unwrap_or("none")
                );
                if !self.push_delay.is_zero() {
                    tokio::time::sleep(self.push_delay).await;
                }
                PushOutcome::Added { remote_id }
            }
            Err(error) => {
                log::error!(
                    "Failed to add '{}' to {}: {}",
                    record.summary,
                    destination.name,
                    error
                );
                PushOutcome::Failed(error)
            }
        }
    }

    /// Push every record the destination does not have yet. Never stops early.
    pub async fn sweep(
        &self,
        destination: &Destination,
        records: &[EventRecord],
        progress: &mut ProgressSet,
    ) -> SweepReport {
        let mut report = SweepReport {
            destination: destination.name.clone(),
            ..SweepReport::default()
        };

        for record in records {
            let outcome = self.push_record(destination, record, progress).await;
            report.record(&record.identity_key(), outcome);
        }

        log::info!(
            "{}: added {}, skipped {}, failed {}",
            report.destination,
            report.added,
            report.skipped,
            report.failed()
        );

        report
    }

    /// Sweep each destination in turn, persisting its progress before moving on.
    pub async fn run(
        &self,
        destinations: &[Destination],
        records: &[EventRecord],
        state: &StateDir,
    ) -> IcsMirrorResult<Vec<SweepReport>> {
        let mut reports = Vec::with_capacity(destinations.len());

        for destination in destinations {
            let mut progress = ProgressSet::load(state.progress_path(&destination.name))?;
            log::debug!(
                "{}: {} event(s) already mirrored",
                destination.name,
                progress.len()
            );

            let report = self.sweep(destination, records, &mut progress).await;
            progress.save()?;

            reports.push(report);
        }

        Ok(reports)
    }
}
