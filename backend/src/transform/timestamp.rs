//! Timestamp parsing and UTC normalization.
//!
//! Two policies:
//!
//! - [`ParsePolicy::Mixed`]: every value is tried against every known
//!   ISO-8601 variant independently.
//! - [`ParsePolicy::Strict`]: the variant is inferred from the first value
//!   and every later value must use it too.
//!
//! Values carrying an offset are shifted to UTC; values without one are
//! taken to be UTC already. The result is always a naive instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// How a column of timestamps is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    Mixed,
    Strict,
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    /// Numeric offset, converted to UTC.
    Offset(&'static str),
    /// Trailing `Z`.
    Zulu(&'static str),
    /// Trailing ` UTC`.
    UtcWord(&'static str),
    Naive(&'static str),
    DateOnly(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Variant {
    name: &'static str,
    layout: Layout,
}

// Zulu forms come before offsets; `%#z` accepts `±HH`, `±HHMM` and `±HH:MM`.
const VARIANTS: &[Variant] = &[
    Variant { name: "iso8601-zulu", layout: Layout::Zulu("%Y-%m-%dT%H:%M:%S%.f") },
    Variant { name: "space-zulu", layout: Layout::Zulu("%Y-%m-%d %H:%M:%S%.f") },
    Variant { name: "iso8601-minutes-zulu", layout: Layout::Zulu("%Y-%m-%dT%H:%M") },
    Variant { name: "space-minutes-zulu", layout: Layout::Zulu("%Y-%m-%d %H:%M") },
    Variant { name: "basic-zulu", layout: Layout::Zulu("%Y%m%dT%H%M%S%.f") },
    Variant { name: "iso8601-offset", layout: Layout::Offset("%Y-%m-%dT%H:%M:%S%.f%#z") },
    Variant { name: "space-offset", layout: Layout::Offset("%Y-%m-%d %H:%M:%S%.f%#z") },
    Variant { name: "iso8601-minutes-offset", layout: Layout::Offset("%Y-%m-%dT%H:%M%#z") },
    Variant { name: "basic-offset", layout: Layout::Offset("%Y%m%dT%H%M%S%.f%#z") },
    Variant { name: "space-utc", layout: Layout::UtcWord("%Y-%m-%d %H:%M:%S%.f") },
    Variant { name: "iso8601-naive", layout: Layout::Naive("%Y-%m-%dT%H:%M:%S%.f") },
    Variant { name: "space-naive", layout: Layout::Naive("%Y-%m-%d %H:%M:%S%.f") },
    Variant { name: "iso8601-minutes", layout: Layout::Naive("%Y-%m-%dT%H:%M") },
    Variant { name: "space-minutes", layout: Layout::Naive("%Y-%m-%d %H:%M") },
    Variant { name: "basic-naive", layout: Layout::Naive("%Y%m%dT%H%M%S%.f") },
    Variant { name: "date", layout: Layout::DateOnly("%Y-%m-%d") },
];

impl Variant {
    fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        match self.layout {
            Layout::Offset(fmt) => DateTime::parse_from_str(value, fmt)
                .ok()
                .map(|dt| dt.naive_utc()),
            Layout::Zulu(fmt) => value
                .strip_suffix('Z')
                .or_else(|| value.strip_suffix('z'))
                .and_then(|rest| NaiveDateTime::parse_from_str(rest, fmt).ok()),
            Layout::UtcWord(fmt) => value
                .strip_suffix(" UTC")
                .and_then(|rest| NaiveDateTime::parse_from_str(rest, fmt).ok()),
            Layout::Naive(fmt) => NaiveDateTime::parse_from_str(value, fmt).ok(),
            Layout::DateOnly(fmt) => NaiveDate::parse_from_str(value, fmt)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN)),
        }
    }
}

/// Parses one column of timestamps under a policy.
///
/// Stateful: under [`ParsePolicy::Strict`] the first successful parse
/// fixes the variant for the rest of the column.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    policy: ParsePolicy,
    inferred: Option<Variant>,
}

impl TimestampParser {
    pub fn new(policy: ParsePolicy) -> Self {
        Self {
            policy,
            inferred: None,
        }
    }

    pub fn policy(&self) -> ParsePolicy {
        self.policy
    }

    /// Name of the variant fixed by the first value, if any.
    pub fn inferred_format(&self) -> Option<&'static str> {
        self.inferred.map(|v| v.name)
    }

    /// Parse one value to a naive UTC instant.
    ///
    /// The error is a human-readable reason, wrapped by the caller with
    /// table and row context.
    pub fn parse(&mut self, raw: &str) -> Result<NaiveDateTime, String> {
        let value = raw.trim();

        if let (ParsePolicy::Strict, Some(variant)) = (self.policy, self.inferred) {
            return variant.parse(value).ok_or_else(|| {
                format!(
                    "does not match format '{}' inferred from the first value",
                    variant.name
                )
            });
        }

        let (variant, parsed) = VARIANTS
            .iter()
            .find_map(|variant| variant.parse(value).map(|ts| (*variant, ts)))
            .ok_or_else(|| "unrecognised timestamp format".to_string())?;

        if self.policy == ParsePolicy::Strict {
            self.inferred = Some(variant);
        }
        Ok(parsed)
    }
}

/// Parse a single value with the mixed policy.
pub fn parse_mixed(value: &str) -> Result<NaiveDateTime, String> {
    TimestampParser::new(ParsePolicy::Mixed).parse(value)
}

/// Render an instant the way output tables carry it.
///
/// The fractional part is only written when non-zero.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rstest::rstest;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[rstest]
    #[case("2023-01-01T00:00:00Z", ts(2023, 1, 1, 0, 0, 0))]
    #[case("2023-01-02T12:00:00Z", ts(2023, 1, 2, 12, 0, 0))]
    #[case("2023-01-01T10:30:00+02:00", ts(2023, 1, 1, 8, 30, 0))]
    #[case("2023-01-01 01:30:00-03:00", ts(2023, 1, 1, 4, 30, 0))]
    #[case("2023-01-01 23:30:00+0000", ts(2023, 1, 1, 23, 30, 0))]
    #[case("2023-01-01 10:00:00 UTC", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01 10:00:00", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01T10:00:00", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01 10:00", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01", ts(2023, 1, 1, 0, 0, 0))]
    #[case("2023-01-01T10:00", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01T10:00Z", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01 10:00Z", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01T10:00:00+00", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01 10:00:00+00", ts(2023, 1, 1, 10, 0, 0))]
    #[case("2023-01-01 10:00:00.5-03", ts(2023, 1, 1, 13, 0, 0).with_nanosecond(500_000_000).unwrap())]
    #[case("2023-01-01T10:00+01:00", ts(2023, 1, 1, 9, 0, 0))]
    #[case("20230101T100000Z", ts(2023, 1, 1, 10, 0, 0))]
    #[case("20230101T100000", ts(2023, 1, 1, 10, 0, 0))]
    #[case("20230101T100000+0530", ts(2023, 1, 1, 4, 30, 0))]
    fn test_mixed_accepts_iso_variants(#[case] input: &str, #[case] expected: NaiveDateTime) {
        assert_eq!(parse_mixed(input).unwrap(), expected);
    }

    #[test]
    fn test_offset_crossing_midnight_moves_date() {
        let parsed = parse_mixed("2023-01-01T22:00:00-05:00").unwrap();
        assert_eq!(parsed, ts(2023, 1, 2, 3, 0, 0));
    }

    #[test]
    fn test_fractional_seconds_kept() {
        let parsed = parse_mixed("2020-02-19 21:54:41.311000+00:00").unwrap();
        assert_eq!(parsed.nanosecond(), 311_000_000);
    }

    #[rstest]
    #[case("")]
    #[case("yesterday")]
    #[case("2023-13-01")]
    #[case("01/02/2023")]
    #[case("2023-01-01T10")]
    #[case("20230101")]
    #[case("2023-01-01T10:00:00+0")]
    fn test_mixed_rejects_garbage(#[case] input: &str) {
        assert!(parse_mixed(input).is_err());
    }

    #[test]
    fn test_mixed_allows_different_variants_per_value() {
        let mut parser = TimestampParser::new(ParsePolicy::Mixed);
        assert!(parser.parse("2023-01-01T00:00:00Z").is_ok());
        assert!(parser.parse("2023-01-02 05:00:00").is_ok());
        assert!(parser.parse("2023-01-03").is_ok());
        assert_eq!(parser.inferred_format(), None);
    }

    #[test]
    fn test_strict_locks_first_variant() {
        let mut parser = TimestampParser::new(ParsePolicy::Strict);
        assert!(parser.parse("2023-01-01T00:00:00Z").is_ok());
        assert_eq!(parser.inferred_format(), Some("iso8601-zulu"));
        assert!(parser.parse("2023-01-05T08:15:00.250Z").is_ok());

        let err = parser.parse("2023-01-02 05:00:00").unwrap_err();
        assert!(err.contains("iso8601-zulu"));
    }

    #[test]
    fn test_strict_locks_hour_offset_variant() {
        let mut parser = TimestampParser::new(ParsePolicy::Strict);
        assert_eq!(parser.parse("2023-01-01 10:00:00+00").unwrap(), ts(2023, 1, 1, 10, 0, 0));
        assert_eq!(parser.inferred_format(), Some("space-offset"));
        assert_eq!(parser.parse("2023-01-01 10:00:00+02:00").unwrap(), ts(2023, 1, 1, 8, 0, 0));
        assert!(parser.parse("2023-01-01T10:00:00+00").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&ts(2023, 1, 2, 3, 4, 5)), "2023-01-02 03:04:05");
        let with_millis = parse_mixed("2023-01-02T03:04:05.5Z").unwrap();
        assert_eq!(format_timestamp(&with_millis), "2023-01-02 03:04:05.500");
    }
}
