//! Canonical event records and their identity key.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An event as kept in the store.
///
/// Field names on disk follow the `dtstart`/`dtend` convention. Older store
/// files may hold bare dates or offset-less times; see `parse_stored_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub uid: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "dtstart", deserialize_with = "deserialize_stored_time")]
    pub start: DateTime<FixedOffset>,
    #[serde(rename = "dtend", deserialize_with = "deserialize_stored_time")]
    pub end: DateTime<FixedOffset>,
}

/// Read a stored timestamp.
///
/// RFC 3339 is what we write. A bare `YYYY-MM-DD` is an all-day start and
/// becomes midnight UTC; an offset-less date-time is read as UTC. Both match
/// how the feed parser decodes `VALUE=DATE` and floating times.
fn parse_stored_time(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn deserialize_stored_time<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_stored_time(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date/time '{value}'")))
}

impl EventRecord {
    /// The `(summary, start)` pair that decides whether two records are the same event.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            summary: self.summary.clone(),
            start: self.start.with_timezone(&Utc),
        }
    }
}

/// Composite identity of an event. `uid` is deliberately not part of it.
///
/// `start` is compared as an instant, so the same moment written with
/// different offsets yields the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct IdentityKey {
    pub summary: String,
    pub start: DateTime<Utc>,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.summary, self.start.to_rfc3339())
    }
}

impl FromStr for IdentityKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Summaries may contain '|', timestamps never do
        let (summary, start) = s
            .rsplit_once('|')
            .ok_or_else(|| format!("identity key has no '|' separator: {s}"))?;
        let start = parse_stored_time(start)
            .ok_or_else(|| format!("identity key has invalid start '{start}'"))?;

        Ok(IdentityKey {
            summary: summary.to_string(),
            start: start.with_timezone(&Utc),
        })
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
