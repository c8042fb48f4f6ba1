//! HL7 V3 timestamp parsing and formatting.
//!
//! Values are read by trying each accepted format in order and keeping the
//! first that parses. Formats without an offset are taken to be UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::options::TimestampFormat;

/// One accepted timestamp layout.
#[derive(Debug, Clone, Copy)]
enum Layout {
    /// Date, time and offset.
    Offset(&'static str),
    /// RFC 3339.
    Rfc3339,
    /// Date and time without an offset.
    Naive(&'static str),
    /// Date only; midnight.
    Date(&'static str),
}

/// Accepted layouts, in the order they are tried.
const LAYOUTS: [Layout; 12] = [
    // HL7 canonical: 20240301102030.0000+0200
    Layout::Offset("%Y%m%d%H%M%S%.f%z"),
    // HL7 legacy: 20240301102030.000
    Layout::Naive("%Y%m%d%H%M%S%.f"),
    Layout::Naive("%Y%m%d%H%M"),
    Layout::Rfc3339,
    Layout::Offset("%Y-%m-%dT%H:%M:%S%.f%z"),
    Layout::Naive("%Y-%m-%dT%H:%M:%S%.f"),
    Layout::Naive("%Y-%m-%d %H:%M:%S%.f"),
    Layout::Naive("%Y-%m-%dT%H:%M"),
    Layout::Naive("%d.%m.%Y %H:%M:%S"),
    Layout::Date("%Y%m%d"),
    Layout::Date("%Y-%m-%d"),
    Layout::Date("%d.%m.%Y"),
];

impl Layout {
    fn parse(self, value: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            Layout::Offset(format) => DateTime::parse_from_str(value, format).ok(),
            Layout::Rfc3339 => DateTime::parse_from_rfc3339(value).ok(),
            Layout::Naive(format) => NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(|naive| naive.and_utc().fixed_offset()),
            Layout::Date(format) => NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().fixed_offset()),
        }
    }
}

/// Parses a timestamp in any accepted format.
pub fn parse_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    LAYOUTS.iter().find_map(|layout| layout.parse(value))
}

/// Formats a timestamp for the wire.
///
/// The canonical form writes the full offset, minutes included, so offsets
/// such as `+0530` keep their instant.
pub fn format_datetime(value: &DateTime<FixedOffset>, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::Canonical => {
            let ten_thousandths = (value.nanosecond() % 1_000_000_000) / 100_000;
            format!(
                "{}.{:04}{}",
                value.format("%Y%m%d%H%M%S"),
                ten_thousandths,
                value.format("%z")
            )
        }
        TimestampFormat::Legacy => value.naive_utc().format("%Y%m%d%H%M%S%.3f").to_string(),
    }
}
