//! Feed parsing using the icalendar crate's parser.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};

use crate::error::DecodeError;
use crate::record::EventRecord;

/// Decode raw feed bytes into one record per VEVENT, in feed order.
///
/// Non-event components (VTIMEZONE, VTODO, ...) are skipped. Any event whose
/// times cannot be decoded fails the whole feed.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<EventRecord>, DecodeError> {
    let content = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
    let content = content.trim_start_matches('\u{feff}');

    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .map(normalize_event)
        .collect()
}

/// Convert a parsed VEVENT into a canonical record
fn normalize_event(vevent: &Component) -> Result<EventRecord, DecodeError> {
    let uid = text_prop(vevent, "UID").unwrap_or_default();
    let summary = text_prop(vevent, "SUMMARY").unwrap_or_default();
    let description = text_prop(vevent, "DESCRIPTION")
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    let start = match vevent.find_prop("DTSTART") {
        Some(prop) => decode_time(&uid, "DTSTART", DatePerhapsTime::try_from(prop).ok())?,
        None => {
            return Err(DecodeError::MissingProperty {
                uid,
                property: "DTSTART",
            });
        }
    };

    let end = if let Some(prop) = vevent.find_prop("DTEND") {
        decode_time(&uid, "DTEND", DatePerhapsTime::try_from(prop).ok())?
    } else if let Some(prop) = vevent.find_prop("DURATION") {
        start + parse_duration(&uid, prop.val.as_ref())?
    } else {
        start
    };

    Ok(EventRecord {
        uid,
        summary,
        description,
        start,
        end,
    })
}

fn text_prop(component: &Component, name: &str) -> Option<String> {
    component
        .find_prop(name)
        .map(|p| p.val.to_string())
}

/// Decode a DTSTART/DTEND value into a timezone-aware instant.
///
/// Floating times are read as UTC; all-day dates become midnight UTC.
fn decode_time(
    uid: &str,
    property: &'static str,
    value: Option<DatePerhapsTime>,
) -> Result<DateTime<FixedOffset>, DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidTime {
        uid: uid.to_string(),
        property,
        reason,
    };

    let value = value.ok_or_else(|| invalid("unparseable date/time value".to_string()))?;

    match value {
        DatePerhapsTime::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().fixed_offset())
            .ok_or_else(|| invalid(format!("date out of range: {d}"))),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Ok(dt.fixed_offset()),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            Ok(naive.and_utc().fixed_offset())
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            resolve_zoned(&date_time, &tzid).map_err(invalid)
        }
    }
}

fn resolve_zoned(naive: &NaiveDateTime, tzid: &str) -> Result<DateTime<FixedOffset>, String> {
    let tz: chrono_tz::Tz = tzid
        .parse()
        .map_err(|_| format!("unknown time zone '{tzid}'"))?;

    // Ambiguous local times (DST fall-back) take the earlier instant
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| format!("{naive} does not exist in {tzid}"))
}

fn parse_duration(uid: &str, value: &str) -> Result<chrono::Duration, DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidTime {
        uid: uid.to_string(),
        property: "DURATION",
        reason,
    };

    let is_negative = value.starts_with('-');
    let duration_str = value.trim_start_matches(['-', '+']);

    let duration = iso8601::duration(duration_str).map_err(|e| invalid(e.to_string()))?;
    let std_duration: std::time::Duration = duration.into();
    let duration = chrono::Duration::from_std(std_duration).map_err(|e| invalid(e.to_string()))?;

    Ok(if is_negative { -duration } else { duration })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
        dt.with_timezone(&Utc)
    }

    fn feed(events: &str) -> Vec<u8> {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\n{events}END:VCALENDAR\r\n").into_bytes()
    }

    #[test]
    fn test_parse_feed_skips_non_event_components() {
        let bytes = feed(
            "BEGIN:VTODO\r\nUID:todo-1\r\nSUMMARY:Not an event\r\nEND:VTODO\r\n\
             BEGIN:VEVENT\r\nUID:evt-1\r\nSUMMARY:Lecture\r\n\
             DTSTART:20250901T130000Z\r\nDTEND:20250901T140000Z\r\nEND:VEVENT\r\n",
        );

        let records = parse_feed(&bytes).expect("Should parse");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uid, "evt-1");
        assert_eq!(records[0].summary, "Lecture");
        assert_eq!(records[0].start.to_rfc3339(), "2025-09-01T13:00:00+00:00");
        assert_eq!(records[0].end.to_rfc3339(), "2025-09-01T14:00:00+00:00");
    }

    #[test]
    fn test_parse_feed_trims_description_and_defaults_to_empty() {
        let bytes = feed(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:With\r\nDESCRIPTION:  Room 101  \r\n\
             DTSTART:20250901T130000Z\r\nDTEND:20250901T140000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:b\r\nSUMMARY:Without\r\n\
             DTSTART:20250902T130000Z\r\nDTEND:20250902T140000Z\r\nEND:VEVENT\r\n",
        );

        let records = parse_feed(&bytes).expect("Should parse");

        assert_eq!(records[0].description, "Room 101");
        assert_eq!(records[1].description, "");
    }

    #[test]
    fn test_parse_feed_keeps_escaped_backslashes() {
        let bytes = feed(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Path C:\\\\new\r\n\
             DESCRIPTION:room \\\\ 4\r\n\
             DTSTART:20250901T130000Z\r\nDTEND:20250901T140000Z\r\nEND:VEVENT\r\n",
        );

        let records = parse_feed(&bytes).expect("Should parse");

        assert_eq!(records[0].summary, "Path C:\\new");
        assert_eq!(records[0].description, "room \\ 4");
    }

    #[test]
    fn test_parse_feed_unescapes_text() {
        let bytes = feed(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Lab\\, Section B\r\n\
             DESCRIPTION:Line one\\nLine two\r\n\
             DTSTART:20250901T130000Z\r\nDTEND:20250901T140000Z\r\nEND:VEVENT\r\n",
        );

        let records = parse_feed(&bytes).expect("Should parse");

        assert_eq!(records[0].summary, "Lab, Section B");
        assert_eq!(records[0].description, "Line one\nLine two");
    }

    #[test]
    fn test_parse_feed_resolves_tzid() {
        let bytes = feed(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Lecture\r\n\
             DTSTART;TZID=America/New_York:20250901T090000\r\n\
             DTEND;TZID=America/New_York:20250901T100000\r\nEND:VEVENT\r\n",
        );

        let records = parse_feed(&bytes).expect("Should parse");

        assert_eq!(utc(records[0].start).to_rfc3339(), "2025-09-01T13:00:00+00:00");
        assert_eq!(records[0].start.offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_parse_feed_floating_and_date_values_are_utc() {
        let bytes = feed(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Floating\r\n\
             DTSTART:20250901T090000\r\nDTEND:20250901T100000\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:b\r\nSUMMARY:All day\r\n\
             DTSTART;VALUE=DATE:20250902\r\nDTEND;VALUE=DATE:20250903\r\nEND:VEVENT\r\n",
        );

        let records = parse_feed(&bytes).expect("Should parse");

        assert_eq!(records[0].start.to_rfc3339(), "2025-09-01T09:00:00+00:00");
        assert_eq!(records[1].start.to_rfc3339(), "2025-09-02T00:00:00+00:00");
        assert_eq!(records[1].end.to_rfc3339(), "2025-09-03T00:00:00+00:00");
    }

    #[test]
    fn test_parse_feed_uses_duration_when_dtend_missing() {
        let bytes = feed(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Exam\r\n\
             DTSTART:20250901T130000Z\r\nDURATION:PT1H30M\r\nEND:VEVENT\r\n",
        );

        let records = parse_feed(&bytes).expect("Should parse");

        assert_eq!(records[0].end.to_rfc3339(), "2025-09-01T14:30:00+00:00");
    }

    #[test]
    fn test_parse_feed_fails_without_dtstart() {
        let bytes = feed("BEGIN:VEVENT\r\nUID:broken\r\nSUMMARY:No start\r\nEND:VEVENT\r\n");

        let err = parse_feed(&bytes).unwrap_err();

        assert!(matches!(
            err,
            DecodeError::MissingProperty { ref uid, property: "DTSTART" } if uid == "broken"
        ));
    }

    #[test]
    fn test_parse_feed_fails_on_unknown_timezone() {
        let bytes = feed(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Lecture\r\n\
             DTSTART;TZID=Mars/Olympus_Mons:20250901T090000\r\n\
             DTEND;TZID=Mars/Olympus_Mons:20250901T100000\r\nEND:VEVENT\r\n",
        );

        let err = parse_feed(&bytes).unwrap_err();

        assert!(matches!(err, DecodeError::InvalidTime { property: "DTSTART", .. }));
    }

    #[test]
    fn test_parse_feed_rejects_invalid_utf8() {
        let err = parse_feed(&[0xff, 0xfe, 0x00]).unwrap_err();

        assert!(matches!(err, DecodeError::InvalidUtf8));
    }
}
