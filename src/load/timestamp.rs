use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Year assumed for the timestamps that do not specify one.
///
/// It is a leap year, so February 29 of the profile survives the parsing.
pub const REFERENCE_YEAR: i32 = 2024;

/// Timestamp layout of a CSV column.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimestampFormat {
    Rfc3339,
    WithOffset(&'static str),
    DateTime(&'static str),
    Date(&'static str),

    /// Stamped onto the [`REFERENCE_YEAR`], the pattern starts with `%Y-`.
    WithoutYear(&'static str),
}

/// Candidates in the order of preference.
const KNOWN_FORMATS: &[TimestampFormat] = &[
    TimestampFormat::Rfc3339,
    TimestampFormat::WithOffset("%Y-%m-%d %H:%M:%S%z"),
    TimestampFormat::WithOffset("%Y-%m-%d %H:%M:%S%:z"),
    TimestampFormat::DateTime("%Y-%m-%d %H:%M:%S"),
    TimestampFormat::DateTime("%Y-%m-%dT%H:%M:%S"),
    TimestampFormat::DateTime("%Y-%m-%d %H:%M"),
    TimestampFormat::DateTime("%Y-%m-%d %I:%M:%S %p"),
    TimestampFormat::DateTime("%m/%d/%Y %H:%M"),
    TimestampFormat::DateTime("%d/%m/%Y %H:%M"),
    TimestampFormat::DateTime("%m/%d/%Y %I:%M %p"),
    TimestampFormat::DateTime("%d.%m.%Y %H:%M"),
    TimestampFormat::Date("%Y-%m-%d"),
    TimestampFormat::Date("%m/%d/%Y"),
    TimestampFormat::Date("%d/%m/%Y"),
    TimestampFormat::Date("%b %d, %Y"),
    TimestampFormat::Date("%B %d, %Y"),
    TimestampFormat::Date("%d %B %Y"),
    TimestampFormat::WithoutYear("%Y-%d.%m. %H:%M"),
    TimestampFormat::WithoutYear("%Y-%m-%d %H:%M:%S"),
    TimestampFormat::WithoutYear("%Y-%m-%d %I:%M:%S %p"),
    TimestampFormat::WithoutYear("%Y-%m/%d %H:%M"),
];

impl TimestampFormat {
    /// Pick the first known format which parses every sample.
    pub fn detect(samples: &[&str]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        KNOWN_FORMATS
            .iter()
            .copied()
            .find(|format| samples.iter().all(|sample| format.parse(sample).is_ok()))
    }

    pub fn parse(self, text: &str) -> chrono::ParseResult<DateTime<Utc>> {
        let text = text.trim();
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(text).map(|timestamp| timestamp.to_utc()),
            Self::WithOffset(pattern) => {
                DateTime::parse_from_str(text, pattern).map(|timestamp| timestamp.to_utc())
            }
            Self::DateTime(pattern) => {
                NaiveDateTime::parse_from_str(text, pattern).map(|timestamp| timestamp.and_utc())
            }
            Self::Date(pattern) => NaiveDate::parse_from_str(text, pattern)
                .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc()),
            Self::WithoutYear(pattern) => {
                NaiveDateTime::parse_from_str(&format!("{REFERENCE_YEAR}-{text}"), pattern)
                    .map(|timestamp| timestamp.and_utc())
            }
        }
    }
}

impl Display for TimestampFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rfc3339 => write!(f, "RFC 3339"),
            Self::WithOffset(pattern) | Self::DateTime(pattern) | Self::Date(pattern) => {
                write!(f, "`{pattern}`")
            }
            Self::WithoutYear(pattern) => write!(f, "`{pattern}` in {REFERENCE_YEAR}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn detect_and_parse(samples: &[&str]) -> (TimestampFormat, DateTime<Utc>) {
        let format = TimestampFormat::detect(samples).unwrap();
        (format, format.parse(samples[0]).unwrap())
    }

    #[test]
    fn test_rfc3339() {
        let (format, timestamp) = detect_and_parse(&["2023-01-01T00:00:00.000Z"]);
        assert_eq!(format, TimestampFormat::Rfc3339);
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_with_offset() {
        let (_, timestamp) = detect_and_parse(&["2023-06-01 12:00:00+0200"]);
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_month_first_preferred() {
        let (format, timestamp) = detect_and_parse(&["01/02/2024 13:00", "01/03/2024 13:00"]);
        assert_eq!(format, TimestampFormat::DateTime("%m/%d/%Y %H:%M"));
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_day_first_detected_from_later_sample() {
        let (format, timestamp) = detect_and_parse(&["01/02/2024 13:00", "13/02/2024 13:00"]);
        assert_eq!(format, TimestampFormat::DateTime("%d/%m/%Y %H:%M"));
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2024, 2, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_twelve_hour_clock() {
        let (_, timestamp) = detect_and_parse(&["2023-06-01 01:30:00 PM"]);
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2023, 6, 1, 13, 30, 0).unwrap());
    }

    #[test]
    fn test_month_name() {
        let (_, timestamp) = detect_and_parse(&["Mar 5, 2023"]);
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2023, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_pvsol_without_year() {
        let (format, timestamp) = detect_and_parse(&["29.02. 13:00", "01.01. 00:00"]);
        assert_eq!(format, TimestampFormat::WithoutYear("%Y-%d.%m. %H:%M"));
        assert_eq!(timestamp, Utc.with_ymd_and_hms(REFERENCE_YEAR, 2, 29, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_year_prefixed_pvsol_is_unknown() {
        assert_eq!(TimestampFormat::detect(&["2024-01.01. 00:00"]), None);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(TimestampFormat::detect(&["yesterday"]), None);
        assert_eq!(TimestampFormat::detect(&[]), None);
    }
}
