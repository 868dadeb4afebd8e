//! Format sniffing (spec §4.2) and the numeric format join lattice
//! (spec §4.6).
//!
//! Grounded on `original_source/jsonformat/jsonformat.go`.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::jsontype::JsonType;
use crate::timestring;

/// A format tag. `None` in the owning `Option<Format>` means "no
/// format", spelled `""` in the persisted JSON per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    // Numeric
    Int32,
    Int64,
    Float,
    Double,
    Timestamp,
    TimestampMs,
    ZeroOne,
    // Lexical
    Binary,
    Byte,
    Email,
    IsoCountry,
    IsoCurrency,
    Ipv4,
    Ipv6,
    Uri,
    Uuid4,
    Numerical,
    // Temporal
    Date,
    DateTime,
    DateTimeNoTz,
    Time,
    Duration,
}

impl Format {
    pub const fn as_str(self) -> &'static str {
        match self {
            Format::Int32 => "int32",
            Format::Int64 => "int64",
            Format::Float => "float",
            Format::Double => "double",
            Format::Timestamp => "timestamp",
            Format::TimestampMs => "timestamp-ms",
            Format::ZeroOne => "zero-one",
            Format::Binary => "binary",
            Format::Byte => "byte",
            Format::Email => "email",
            Format::IsoCountry => "iso-country",
            Format::IsoCurrency => "iso-currency",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Uri => "uri",
            Format::Uuid4 => "uuid4",
            Format::Numerical => "numerical",
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::DateTimeNoTz => "date-time-notz",
            Format::Time => "time",
            Format::Duration => "duration",
        }
    }

    pub fn from_str(s: &str) -> Option<Format> {
        Some(match s {
            "int32" => Format::Int32,
            "int64" => Format::Int64,
            "float" => Format::Float,
            "double" => Format::Double,
            "timestamp" => Format::Timestamp,
            "timestamp-ms" => Format::TimestampMs,
            "zero-one" => Format::ZeroOne,
            "binary" => Format::Binary,
            "byte" => Format::Byte,
            "email" => Format::Email,
            "iso-country" => Format::IsoCountry,
            "iso-currency" => Format::IsoCurrency,
            "ipv4" => Format::Ipv4,
            "ipv6" => Format::Ipv6,
            "uri" => Format::Uri,
            "uuid4" => Format::Uuid4,
            "numerical" => Format::Numerical,
            "date" => Format::Date,
            "date-time" => Format::DateTime,
            "date-time-notz" => Format::DateTimeNoTz,
            "time" => Format::Time,
            "duration" => Format::Duration,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats whose `seenMinimum`/`seenMaximum` reduce via chronological
/// rather than lexical/numeric comparison.
pub fn is_chronolike(f: Format) -> bool {
    matches!(
        f,
        Format::Date | Format::DateTime | Format::DateTimeNoTz | Format::Time | Format::Duration
    )
}

/// Sniff the format of a string value. Probes run in the fixed order
/// spec §4.2 mandates; the first hit wins. `date-time-notz` is tried
/// before `date-time` so a timezone-less timestamp isn't swallowed by
/// the TZ-aware probe.
pub fn sniff_string(s: &str) -> Option<Format> {
    if EMAIL_RE.is_match(s) {
        return Some(Format::Email);
    }
    if sniff_uri(s) {
        return Some(Format::Uri);
    }
    if s.parse::<Ipv4Addr>().is_ok() {
        return Some(Format::Ipv4);
    }
    if s.parse::<Ipv6Addr>().is_ok() {
        return Some(Format::Ipv6);
    }
    if COUNTRY_RE.is_match(s) {
        return Some(Format::IsoCountry);
    }
    if CURRENCY_RE.is_match(s) {
        return Some(Format::IsoCurrency);
    }
    if UUID4_RE.is_match(s) {
        return Some(Format::Uuid4);
    }
    if NUMERICAL_RE.is_match(s) {
        return Some(Format::Numerical);
    }
    if DATETIME_NOTZ_RE.is_match(s) {
        return Some(Format::DateTimeNoTz);
    }
    if DATETIME_TZ_RE.is_match(s) {
        return Some(Format::DateTime);
    }
    if DATE_RE.is_match(s) {
        return Some(Format::Date);
    }
    if TIME_RE.is_match(s) {
        return Some(Format::Time);
    }
    if timestring::is_period(s) {
        return Some(Format::Duration);
    }
    if sniff_binary(s) {
        return Some(Format::Binary);
    }
    if sniff_base64(s) {
        return Some(Format::Byte);
    }
    None
}

/// Never true in this implementation: mirrors
/// `original_source/jsonformat/jsonformat.go:sniffBinary`, which is a
/// reachable format tag that the probe chain never actually emits.
/// Kept as an explicit stub (rather than removed) so `Format::Binary`
/// remains a legitimate value schemas persisted elsewhere can carry,
/// and so `datagen` still has a generator for it.
fn sniff_binary(_s: &str) -> bool {
    false
}

fn sniff_base64(s: &str) -> bool {
    if s.len() < 40 {
        return false;
    }
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s).is_ok()
}

fn sniff_uri(s: &str) -> bool {
    s.starts_with('/') || URI_RE.is_match(s)
}

/// Sniff the format of an integer value.
pub fn sniff_integer(v: i64) -> Format {
    let f = v as f64;
    if sniff_timestamp(f) {
        Format::Timestamp
    } else if sniff_timestamp_ms(f) {
        Format::TimestampMs
    } else if v >= i32::MIN as i64 && v <= i32::MAX as i64 {
        Format::Int32
    } else {
        Format::Int64
    }
}

/// Sniff the format of a non-integral numeric value.
pub fn sniff_number(v: f64) -> Format {
    if sniff_timestamp(v) {
        Format::Timestamp
    } else if sniff_timestamp_ms(v) {
        Format::TimestampMs
    } else if v >= MIN_F32 as f64 && v <= MAX_F32 as f64 {
        Format::Float
    } else {
        Format::Double
    }
}

fn sniff_timestamp(f: f64) -> bool {
    sniff_timestamp_ms(f * 1000.0)
}

fn sniff_timestamp_ms(f: f64) -> bool {
    f > lower_bound_ms() && f < upper_bound_ms()
}

/// UTC midnight 1990-01-01, in milliseconds since the Unix epoch.
fn lower_bound_ms() -> f64 {
    631_152_000_000.0
}

/// `now + 40 years`, in milliseconds since the Unix epoch.
fn upper_bound_ms() -> f64 {
    const CIRCA_YEAR_MS: f64 = 365.0 * 24.0 * 3600.0 * 1000.0;
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as f64;
    now_ms + CIRCA_YEAR_MS * 40.0
}

const MAX_F32: f32 = f32::MAX;
const MIN_F32: f32 = f32::MIN;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*@([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,6}$").unwrap());
static URI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+://").unwrap());
static COUNTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z]$").unwrap());
static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]{3}|[a-z]{3})$").unwrap());
static UUID4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .unwrap()
});
static NUMERICAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static DATETIME_TZ_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.?\d*(Z|[+-]\d{2}:?\d{2})?$").unwrap()
});
static DATETIME_NOTZ_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.?\d*$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}\.?\d*([+-]\d{2}:?\d{2})?$").unwrap());

/// Join two numeric (or equal) formats per the static lattice table
/// (spec §4.6). Returns `None` ("no format") for incompatible pairs,
/// e.g. `uuid4 ⊔ email`.
pub fn merge_format(a: Option<Format>, b: Option<Format>) -> Option<Format> {
    if a == b {
        return a;
    }
    let (a, b) = (a?, b?);
    lattice(a, b).or_else(|| lattice(b, a))
}

/// `int32 ⊔ timestamp = int32` rather than `timestamp`: the lattice
/// deliberately prefers a narrower fixed-width integer format over a
/// timestamp hint when widths differ — timestamp is advisory, not
/// authoritative (spec §9 open question, preserved as specified).
fn lattice(a: Format, b: Format) -> Option<Format> {
    use Format::*;
    Some(match (a, b) {
        (Double, Double) => Double,
        (Double, Float) => Double,
        (Double, Int32) => Double,
        (Double, Int64) => Double,
        (Double, Timestamp) => Double,
        (Double, TimestampMs) => Double,
        (Double, ZeroOne) => Double,

        (Float, Double) => Double,
        (Float, Float) => Float,
        (Float, Int32) => Float,
        (Float, Int64) => Double,
        (Float, Timestamp) => Float,
        (Float, TimestampMs) => Float,
        (Float, ZeroOne) => Float,

        (Int32, Double) => Double,
        (Int32, Float) => Float,
        (Int32, Int32) => Int32,
        (Int32, Int64) => Int64,
        (Int32, Timestamp) => Int32,
        (Int32, TimestampMs) => Int32,
        (Int32, ZeroOne) => Int32,

        (Int64, Double) => Double,
        (Int64, Float) => Double,
        (Int64, Int32) => Int64,
        (Int64, Int64) => Int64,
        (Int64, Timestamp) => Int64,
        (Int64, TimestampMs) => Int64,
        (Int64, ZeroOne) => Int64,

        (Timestamp, Double) => Double,
        (Timestamp, Float) => Float,
        (Timestamp, Int32) => Int32,
        (Timestamp, Int64) => Int64,
        (Timestamp, Timestamp) => Timestamp,
        (Timestamp, TimestampMs) => Double,
        (Timestamp, ZeroOne) => Double,

        (TimestampMs, Double) => Double,
        (TimestampMs, Float) => Float,
        (TimestampMs, Int32) => Int32,
        (TimestampMs, Int64) => Int64,
        (TimestampMs, Timestamp) => Double,
        (TimestampMs, TimestampMs) => TimestampMs,
        (TimestampMs, ZeroOne) => Double,

        _ if a == b => a,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_email() {
        assert_eq!(sniff_string("a@b.com"), Some(Format::Email));
    }

    #[test]
    fn sniffs_uri_leading_slash() {
        assert_eq!(sniff_string("/foo/bar"), Some(Format::Uri));
    }

    #[test]
    fn sniffs_uri_scheme() {
        assert_eq!(sniff_string("https://example.com/x"), Some(Format::Uri));
    }

    #[test]
    fn sniffs_ipv4_and_ipv6() {
        assert_eq!(sniff_string("127.0.0.1"), Some(Format::Ipv4));
        assert_eq!(sniff_string("::1"), Some(Format::Ipv6));
    }

    #[test]
    fn sniffs_uuid4() {
        assert_eq!(
            sniff_string("550e8400-e29b-41d4-a716-446655440000"),
            Some(Format::Uuid4)
        );
    }

    #[test]
    fn notz_before_tz() {
        assert_eq!(
            sniff_string("2020-01-01T00:00:00"),
            Some(Format::DateTimeNoTz)
        );
        assert_eq!(
            sniff_string("2020-01-01T00:00:00Z"),
            Some(Format::DateTime)
        );
    }

    #[test]
    fn sniffs_numerical_before_date() {
        assert_eq!(sniff_string("12345678"), Some(Format::Numerical));
    }

    #[test]
    fn plain_string_has_no_format() {
        assert_eq!(sniff_string("hello world"), None);
    }

    #[test]
    fn int32_vs_int64() {
        assert_eq!(sniff_integer(5_000_000_000), Format::Int64);
    }

    #[test]
    fn lattice_int32_timestamp_prefers_int32() {
        assert_eq!(
            merge_format(Some(Format::Int32), Some(Format::Timestamp)),
            Some(Format::Int32)
        );
    }

    #[test]
    fn lattice_incompatible_yields_none() {
        assert_eq!(merge_format(Some(Format::Uuid4), Some(Format::Email)), None);
    }

    #[test]
    fn lattice_timestamp_scales_collapse_to_double() {
        assert_eq!(
            merge_format(Some(Format::Timestamp), Some(Format::TimestampMs)),
            Some(Format::Double)
        );
    }
}
