//! Occurrence store: turns raw feed rows into catalog records.
//!
//! The transform is pure. Rows are never dropped or deduplicated; fields
//! that fail to parse (`year`, the date sort key) become `None` and the
//! record is kept.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lineup_types::{CLOSING_TOKEN, FeedRow, OccurrenceRecord};
use tracing::warn;

/// Date layouts accepted for ordering, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Date-time layouts whose date part is used for ordering.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Build the record sequence of one snapshot from raw feed rows.
///
/// Output order equals input order. Rows whose name is empty after
/// trimming are kept and reported once with a warning.
pub fn build(rows: Vec<FeedRow>) -> Vec<OccurrenceRecord> {
    let records: Vec<OccurrenceRecord> = rows.into_iter().map(to_record).collect();

    let empty_names = records.iter().filter(|r| r.name.is_empty()).count();
    if empty_names > 0 {
        warn!(
            empty_names,
            total = records.len(),
            "feed contains records with an empty name"
        );
    }

    records
}

/// Convert a single feed row.
pub fn to_record(row: FeedRow) -> OccurrenceRecord {
    let date_key = parse_date(&row.date);
    let year = parse_year(&row.year);
    OccurrenceRecord {
        name: row.name.trim().to_owned(),
        label: row.label.trim().to_owned(),
        is_closing_set: row.closing == CLOSING_TOKEN,
        year,
        date_key,
        date: row.date,
        time: row.time,
        location: row.floor,
    }
}

/// Parse the leading integer of a year column.
///
/// Leading whitespace and a sign are accepted, parsing stops at the first
/// non-digit (`"2023 (tbc)"` is 2023). Returns `None` when no digit is
/// found or the value does not fit an `i32`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, trimmed.get(1..)?),
        Some(b'+') => (false, trimmed.get(1..)?),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    let digits = rest.get(..digits_len)?;
    if digits.is_empty() {
        return None;
    }
    let magnitude: i32 = digits.parse().ok()?;
    Some(if negative { magnitude.checked_neg()? } else { magnitude })
}

/// Parse a feed date for ordering purposes.
///
/// Accepts ISO dates, RFC 3339 timestamps, ISO date-times without zone,
/// and the common `MM/DD/YYYY` and `DD.MM.YYYY` layouts. Returns `None`
/// for anything else.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|stamp| stamp.date())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(name: &str, closing: &str, year: &str) -> FeedRow {
        FeedRow {
            date: String::from("2023-05-01"),
            name: name.to_owned(),
            label: String::from("  Ostgut Ton "),
            time: String::from("06:00"),
            floor: String::from("Panorama Bar"),
            closing: closing.to_owned(),
            year: year.to_owned(),
        }
    }

    #[test]
    fn trims_name_and_label_and_maps_floor() {
        let record = to_record(row("  Ben Klock  ", "TRUE", "2023"));
        assert_eq!(record.name, "Ben Klock");
        assert_eq!(record.label, "Ostgut Ton");
        assert_eq!(record.location, "Panorama Bar");
        assert_eq!(record.time, "06:00");
        assert_eq!(record.date, "2023-05-01");
        assert_eq!(record.year, Some(2023));
        assert_eq!(record.date_key, NaiveDate::from_ymd_opt(2023, 5, 1));
    }

    #[test]
    fn closing_requires_exact_token() {
        assert!(to_record(row("a", "TRUE", "")).is_closing_set);
        assert!(!to_record(row("a", "true", "")).is_closing_set);
        assert!(!to_record(row("a", "FALSE", "")).is_closing_set);
        assert!(!to_record(row("a", "", "")).is_closing_set);
    }

    #[test]
    fn unparsable_year_keeps_record() {
        let records = build(vec![row("Ben Klock", "FALSE", "n/a"), row("Marcel Dettmann", "FALSE", "2019")]);
        assert_eq!(records.len(), 2);
        assert_eq!(records.first().unwrap().year, None);
        assert_eq!(records.get(1).unwrap().year, Some(2019));
    }

    #[test]
    fn empty_name_is_kept() {
        let records = build(vec![row("   ", "FALSE", "2020")]);
        assert_eq!(records.len(), 1);
        assert_eq!(records.first().unwrap().name, "");
    }

    #[test]
    fn build_preserves_order_and_duplicates() {
        let records = build(vec![
            row("Ben Klock", "FALSE", "2020"),
            row("Ben Klock", "FALSE", "2020"),
            row("DVS1", "FALSE", "2021"),
        ]);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ben Klock", "Ben Klock", "DVS1"]);
    }

    #[test]
    fn year_parsing_takes_leading_integer() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year(" 2023 "), Some(2023));
        assert_eq!(parse_year("2023.0"), Some(2023));
        assert_eq!(parse_year("2023 (tbc)"), Some(2023));
        assert_eq!(parse_year("-12"), Some(-12));
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("abc"), None);
        assert_eq!(parse_year("-"), None);
        assert_eq!(parse_year("99999999999"), None);
    }

    #[test]
    fn date_parsing_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 10);
        assert_eq!(parse_date("2024-01-10"), expected);
        assert_eq!(parse_date(" 2024-01-10 "), expected);
        assert_eq!(parse_date("01/10/2024"), expected);
        assert_eq!(parse_date("10.01.2024"), expected);
        assert_eq!(parse_date("2024-01-10T23:00:00+01:00"), expected);
        assert_eq!(parse_date("2024-01-10 23:00:00"), expected);
    }

    #[test]
    fn date_parsing_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("sometime in spring"), None);
        assert_eq!(parse_date("2024-13-45"), None);
    }
}
