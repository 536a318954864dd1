//! Feed generation.

use chrono::{DateTime, FixedOffset, Utc};
use icalendar::{Calendar, Component};

use crate::record::EventRecord;

/// Product identifier written into every rendered feed.
pub const PRODID: &str = "-//icsmirror//icsmirror//EN";

/// Render the whole store as one calendar, one VEVENT per record, in store order.
///
/// The output only depends on the records passed in, so rendering the same
/// store twice yields identical bytes.
pub fn render_feed(records: &[EventRecord]) -> Vec<u8> {
    let mut cal = Calendar::new();

    for record in records {
        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&record.uid);
        ics_event.summary(&record.summary);

        // DTSTAMP is required; pinned to DTSTART so output is stable across runs
        ics_event.add_property("DTSTAMP", format_utc(&record.start));
        ics_event.add_property("DTSTART", format_utc(&record.start));
        ics_event.add_property("DTEND", format_utc(&record.end));

        if !record.description.is_empty() {
            ics_event.description(&record.description);
        }

        cal.push(ics_event.done());
    }

    let cal = cal.done();

    finalize(&cal.to_string()).into_bytes()
}

fn format_utc(time: &DateTime<FixedOffset>) -> String {
    time.with_timezone(&Utc)
        .format("%Y%m%dT%H%M%SZ")
        .to_string()
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with ours
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn finalize(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_feed;

    fn make_record(uid: &str, summary: &str, start: &str, end: &str) -> EventRecord {
        EventRecord {
            uid: uid.to_string(),
            summary: summary.to_string(),
            description: String::new(),
            start: DateTime::parse_from_rfc3339(start).unwrap(),
            end: DateTime::parse_from_rfc3339(end).unwrap(),
        }
    }

    #[test]
    fn test_render_feed_has_one_vevent_per_record() {
        let records = vec![
            make_record("a", "Lecture", "2025-09-01T09:00:00Z", "2025-09-01T10:00:00Z"),
            make_record("b", "Lab", "2025-09-02T09:00:00Z", "2025-09-02T11:00:00Z"),
        ];

        let ics = String::from_utf8(render_feed(&records)).unwrap();

        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert!(ics.contains(&format!("PRODID:{PRODID}")), "ICS:\n{ics}");
        assert!(ics.contains("VERSION:2.0"), "ICS:\n{ics}");
        assert!(!ics.contains("CALSCALE"), "ICS:\n{ics}");
        assert!(ics.contains("UID:b"), "ICS:\n{ics}");
        assert!(ics.contains("DTSTART:20250902T090000Z"), "ICS:\n{ics}");
        assert!(ics.contains("DTEND:20250902T110000Z"), "ICS:\n{ics}");
    }

    #[test]
    fn test_render_feed_writes_times_as_utc() {
        let records = vec![make_record(
            "a",
            "Lecture",
            "2025-09-01T09:00:00-04:00",
            "2025-09-01T10:00:00-04:00",
        )];

        let ics = String::from_utf8(render_feed(&records)).unwrap();

        assert!(ics.contains("DTSTART:20250901T130000Z"), "ICS:\n{ics}");
        assert!(ics.contains("DTEND:20250901T140000Z"), "ICS:\n{ics}");
    }

    #[test]
    fn test_render_feed_is_deterministic() {
        let records = vec![
            make_record("a", "Lecture", "2025-09-01T09:00:00Z", "2025-09-01T10:00:00Z"),
            make_record("b", "Lab", "2025-09-02T09:00:00Z", "2025-09-02T11:00:00Z"),
        ];

        assert_eq!(render_feed(&records), render_feed(&records));
    }

    #[test]
    fn test_rendered_feed_parses_back_to_same_records() {
        let mut lecture =
            make_record("a", "Lecture", "2025-09-01T09:00:00Z", "2025-09-01T10:00:00Z");
        lecture.description = "Room 101".to_string();
        let records = vec![
            lecture,
            make_record("b", "Lab", "2025-09-02T09:00:00Z", "2025-09-02T11:00:00Z"),
        ];

        let parsed = parse_feed(&render_feed(&records)).expect("Should parse rendered feed");

        assert_eq!(parsed, records);
    }

    #[test]
    fn test_special_characters_survive_render_and_parse() {
        let mut record = make_record(
            "a",
            "Lab, Section B; room \\ 4",
            "2025-09-01T09:00:00Z",
            "2025-09-01T10:00:00Z",
        );
        record.description = "Bring C:\\new; gloves, goggles\nMeet at the door".to_string();
        let records = vec![record];

        let parsed = parse_feed(&render_feed(&records)).expect("Should parse rendered feed");

        assert_eq!(parsed[0].summary, "Lab, Section B; room \\ 4");
        assert_eq!(
            parsed[0].description,
            "Bring C:\\new; gloves, goggles\nMeet at the door"
        );
        assert_eq!(parsed[0].identity_key(), records[0].identity_key());
    }

    #[test]
    fn test_render_empty_store_is_a_valid_calendar() {
        let ics = String::from_utf8(render_feed(&[])).unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR"));
        assert!(ics.trim_end().ends_with("END:VCALENDAR"));
        assert!(parse_feed(ics.as_bytes()).unwrap().is_empty());
    }
}
