//! Temporal value comparison for merge's `seenMinimum`/`seenMaximum`
//! reduction over chronolike string formats.
//!
//! Grounded on `original_source/timestring/timestring.go`. The Go
//! reference leans on `rickb777/date/period` for ISO-8601 durations;
//! no crate in this workspace covers that, so durations are parsed
//! here directly with a small, total regex-based parser.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::format::Format;

/// A parsed instant/duration paired with its original string, so the
/// minimum/maximum of a set of strings can be recovered by value.
#[derive(Debug, Clone)]
pub struct TimeString {
    pub raw: String,
    /// Comparison key: nanoseconds since a fixed epoch for date/time/
    /// date-time formats, or an approximate duration in nanoseconds
    /// for `duration`.
    pub key: i128,
}

/// `2006-01-02` (date)
const TF_DATE: &str = "%Y-%m-%d";
/// RFC3339 (date-time, with TZ)
const TF_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
/// date-time without a timezone offset
const TF_DATETIME_NOTZ: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// `15:04:05Z07:00` (time, optional TZ)
const TF_TIME: &str = "%H:%M:%S%.f%:z";

/// Parse one value for the given chronolike [`Format`]. Never fails:
/// values that reach here have already passed the corresponding
/// format-sniff probe, so parsing is total for well-formed input;
/// malformed input (should not occur) sorts as the minimum possible
/// key rather than panicking, since a parse failure here is not one
/// of the three error kinds in spec §7 (it would be a programmer
/// error only if the sniffer and parser disagree).
pub fn parse(format: Format, s: &str) -> TimeString {
    let key = match format {
        Format::Date => parse_date(s).unwrap_or(i128::MIN),
        Format::DateTime | Format::DateTimeNoTz => parse_datetime(s).unwrap_or(i128::MIN),
        Format::Time => parse_time(s).unwrap_or(i128::MIN),
        Format::Duration => parse_period(s).map(|d| d as i128).unwrap_or(i128::MIN),
        _ => i128::MIN,
    };
    TimeString {
        raw: s.to_string(),
        key,
    }
}

/// Reduce a set of raw temporal strings (already known to share one
/// chronolike format) to (min, max) by chronological value.
pub fn min_max(format: Format, values: &[&str]) -> (String, String) {
    let parsed: Vec<TimeString> = values.iter().map(|s| parse(format, s)).collect();
    let min = parsed.iter().min_by_key(|t| t.key).expect("non-empty");
    let max = parsed.iter().max_by_key(|t| t.key).expect("non-empty");
    (min.raw.clone(), max.raw.clone())
}

fn parse_date(s: &str) -> Option<i128> {
    let (y, m, d) = date_parts(s)?;
    Some(((y * 12 + m) * 31 + d) * 86_400)
}

/// Extract `(year, month, day)` from a `date`-formatted string, for
/// callers (datagen) that need real calendar components rather than
/// the ordering-only key `parse` produces.
pub fn date_parts(s: &str) -> Option<(i128, i128, i128)> {
    let caps = DATE_RE.captures(s)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

/// Extract `(hour, minute, second)` from a `time`-formatted string.
pub fn time_parts(s: &str) -> Option<(i128, i128, i128)> {
    let caps = TIME_RE.captures(s)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

/// Extract `(year, month, day, hour, minute, second)` from a
/// `date-time`/`date-time-notz`-formatted string.
pub fn datetime_parts(s: &str) -> Option<(i128, i128, i128, i128, i128, i128)> {
    let caps = DATETIME_RE.captures(s)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
        caps[5].parse().ok()?,
        caps[6].parse().ok()?,
    ))
}

fn parse_time(s: &str) -> Option<i128> {
    let caps = TIME_RE.captures(s)?;
    let h: i128 = caps[1].parse().ok()?;
    let m: i128 = caps[2].parse().ok()?;
    let sec: i128 = caps[3].parse().ok()?;
    let frac_ns: i128 = caps
        .get(4)
        .map(|m| parse_fraction_nanos(m.as_str()))
        .unwrap_or(0);
    let offset_secs = caps.get(5).map(|m| parse_offset_secs(m.as_str())).unwrap_or(0);
    Some((h * 3600 + m * 60 + sec) * 1_000_000_000 + frac_ns - (offset_secs as i128) * 1_000_000_000)
}

fn parse_datetime(s: &str) -> Option<i128> {
    let caps = DATETIME_RE.captures(s)?;
    let y: i128 = caps[1].parse().ok()?;
    let mo: i128 = caps[2].parse().ok()?;
    let d: i128 = caps[3].parse().ok()?;
    let h: i128 = caps[4].parse().ok()?;
    let mi: i128 = caps[5].parse().ok()?;
    let sec: i128 = caps[6].parse().ok()?;
    let frac_ns: i128 = caps
        .get(7)
        .map(|m| parse_fraction_nanos(m.as_str()))
        .unwrap_or(0);
    let offset_secs = caps.get(8).map(|m| parse_offset_secs(m.as_str())).unwrap_or(0);
    let days = ((y * 12 + mo) * 31) + d;
    Some(days * 86_400_000_000_000 + (h * 3600 + mi * 60 + sec) * 1_000_000_000 + frac_ns
        - (offset_secs as i128) * 1_000_000_000)
}

fn parse_fraction_nanos(frac: &str) -> i128 {
    // frac is like ".123" (leading dot, variable digits)
    let digits = frac.trim_start_matches('.');
    if digits.is_empty() {
        return 0;
    }
    let padded: String = digits.chars().chain(std::iter::repeat('0')).take(9).collect();
    padded.parse().unwrap_or(0)
}

fn parse_offset_secs(offset: &str) -> i64 {
    if offset.is_empty() || offset == "Z" {
        return 0;
    }
    let sign: i64 = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return 0;
    }
    let hh: i64 = digits[0..2].parse().unwrap_or(0);
    let mm: i64 = digits[2..4].parse().unwrap_or(0);
    sign * (hh * 3600 + mm * 60)
}

/// Average-calendar ISO-8601 period parser: `PnYnMnDTnHnMnS`.
///
/// Returns an approximate duration in nanoseconds, using the same
/// average year/month lengths the Go reference's period library uses
/// internally for `DurationApprox` (365.2425-day year, 1/12 of that
/// for a month).
pub fn parse_period(s: &str) -> Option<i128> {
    let caps = PERIOD_RE.captures(s)?;
    if caps.iter().skip(1).all(|g| g.is_none()) {
        return None;
    }
    let years: f64 = field(&caps, 1);
    let months: f64 = field(&caps, 2);
    let weeks: f64 = field(&caps, 3);
    let days: f64 = field(&caps, 4);
    let hours: f64 = field(&caps, 5);
    let mins: f64 = field(&caps, 6);
    let secs: f64 = field(&caps, 7);

    const SECONDS_PER_DAY: f64 = 86_400.0;
    const DAYS_PER_YEAR: f64 = 365.2425;
    const DAYS_PER_MONTH: f64 = DAYS_PER_YEAR / 12.0;

    let total_secs = years * DAYS_PER_YEAR * SECONDS_PER_DAY
        + months * DAYS_PER_MONTH * SECONDS_PER_DAY
        + weeks * 7.0 * SECONDS_PER_DAY
        + days * SECONDS_PER_DAY
        + hours * 3600.0
        + mins * 60.0
        + secs;
    Some((total_secs * 1_000_000_000.0) as i128)
}

fn field(caps: &regex::Captures, idx: usize) -> f64 {
    caps.get(idx)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$").unwrap()
});

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$",
    )
    .unwrap()
});

/// `PnYnMnWnDTnHnMnS`, every field optional (but at least one must be
/// present), following ISO-8601 period grammar.
static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^P
        (?:(\d+(?:\.\d+)?)Y)?
        (?:(\d+(?:\.\d+)?)M)?
        (?:(\d+(?:\.\d+)?)W)?
        (?:(\d+(?:\.\d+)?)D)?
        (?:T
            (?:(\d+(?:\.\d+)?)H)?
            (?:(\d+(?:\.\d+)?)M)?
            (?:(\d+(?:\.\d+)?)S)?
        )?
        $",
    )
    .unwrap()
});

/// Whether `s` parses as an ISO-8601 period (used by the format sniffer).
pub fn is_period(s: &str) -> bool {
    parse_period(s).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_min_max() {
        let (min, max) = min_max(Format::Date, &["2020-01-01", "2019-12-31", "2021-06-15"]);
        assert_eq!(min, "2019-12-31");
        assert_eq!(max, "2021-06-15");
    }

    #[test]
    fn datetime_min_max_across_offsets() {
        let (min, max) = min_max(
            Format::DateTime,
            &["2020-01-01T00:00:00Z", "2020-01-01T01:00:00+02:00"],
        );
        // 01:00+02:00 == 23:00 UTC previous day's equivalent offset => earlier instant
        assert_eq!(min, "2020-01-01T01:00:00+02:00");
        assert_eq!(max, "2020-01-01T00:00:00Z");
    }

    #[test]
    fn period_roundish() {
        assert!(is_period("P1Y2M10DT2H30M"));
        assert!(is_period("PT30S"));
        assert!(!is_period("not-a-period"));
    }

    #[test]
    fn period_ordering() {
        let (min, max) = min_max(Format::Duration, &["P1D", "PT1H"]);
        assert_eq!(min, "PT1H");
        assert_eq!(max, "P1D");
    }
}
