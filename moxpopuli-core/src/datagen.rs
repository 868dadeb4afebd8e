//! Reverse direction: synthesize a concrete value conforming to a
//! schema (spec §4.9).
//!
//! Grounded on `original_source/datagen/datagen.go` and
//! `original_source/faker/faker.go`. `faker.go`'s helpers are folded
//! in here as small private functions rather than ported as a
//! separate module, since nothing else in this crate needs them.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde_json::{Map, Value};

use crate::format::Format;
use crate::schema::Schema;
use crate::timestring;

/// Generate a value satisfying `schema`. `key` is the enclosing
/// property name — only consulted for the `updated`/`modified`
/// temporal-cap special case.
pub fn generate(key: &str, schema: &Schema, rng: &mut dyn RngCore) -> Value {
    match schema {
        Schema::Integer(s) => {
            if s.format == Some(Format::ZeroOne) {
                return Value::from(choice(rng, &[0i64, 1]));
            }
            let (min, max) = (
                s.bounds.seen_minimum.unwrap_or(0),
                s.bounds.seen_maximum.unwrap_or(0),
            );
            Value::from(fake_i64(rng, min, max))
        }
        Schema::Number(s) => {
            let (min, max) = (
                s.bounds.seen_minimum.unwrap_or(0.0),
                s.bounds.seen_maximum.unwrap_or(0.0),
            );
            Value::from(fake_f64(rng, min, max))
        }
        Schema::Boolean(_) => Value::Bool(rng.next_u32() % 2 == 0),
        Schema::String(s) => {
            if let Some(enum_values) = &s.enum_values {
                if !enum_values.is_empty() {
                    return Value::from(choice(rng, enum_values).clone());
                }
            }
            Value::from(generate_string(key, s, rng))
        }
        Schema::Array(s) => {
            let (min, max) = (
                s.seen_min_length.unwrap_or(0) as i64,
                s.seen_max_length.unwrap_or(0) as i64,
            );
            let len = fake_i64(rng, min, max).max(0) as usize;
            let items: Vec<Value> = (0..len)
                .map(|i| generate(&i.to_string(), &s.items, rng))
                .collect();
            Value::Array(items)
        }
        Schema::Object(s) => {
            let mut m = Map::new();
            for (k, v) in &s.properties {
                m.insert(k.clone(), generate(k, v, rng));
            }
            Value::Object(m)
        }
        // The reference never dispatches into a oneOf's variants here:
        // `ToInteger`/`ToString`/etc. all key off `P_TYPE`, and the
        // oneOf wrapper never sets it, so generation falls through to
        // the same nullable-or-fallback branch as an untyped schema.
        Schema::OneOf(s) if s.common.nullable => Value::Null,
        Schema::OneOf(_) => {
            if rng.next_u32() % 2 == 0 {
                Value::from(fake_hex(rng, 4, 20))
            } else {
                Value::from(fake_i64(rng, -1_000_000_000_000, 1_000_000_000_000))
            }
        }
        Schema::Untyped(s) if s.common.nullable => Value::Null,
        Schema::Untyped(_) => {
            if rng.next_u32() % 2 == 0 {
                Value::from(fake_hex(rng, 4, 20))
            } else {
                Value::from(fake_i64(rng, -1_000_000_000_000, 1_000_000_000_000))
            }
        }
    }
}

fn generate_string(
    key: &str,
    s: &crate::schema::StringSchema,
    rng: &mut dyn RngCore,
) -> String {
    match s.format {
        Some(Format::Binary) => fake_hex(
            rng,
            s.seen_min_length.unwrap_or(4) as usize,
            s.seen_max_length.unwrap_or(12) as usize,
        ),
        Some(Format::Byte) => base64_encode(
            fake_hex(
                rng,
                s.seen_min_length.unwrap_or(4) as usize,
                s.seen_max_length.unwrap_or(12) as usize,
            )
            .as_bytes(),
        ),
        Some(Format::Email) => fake_email(rng),
        Some(Format::IsoCountry) => fake_currency(rng)[..2].to_string(),
        Some(Format::IsoCurrency) => fake_currency(rng),
        Some(Format::Ipv4) => fake_ipv4(rng),
        Some(Format::Ipv6) => fake_ipv6(rng),
        Some(Format::Uri) => fake_uri(s, rng),
        Some(Format::Uuid4) => fake_uuid4(rng),
        Some(Format::Numerical) => {
            let min: i64 = s.seen_minimum.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0);
            let max: i64 = s.seen_maximum.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0);
            fake_i64(rng, min, max).to_string()
        }
        Some(Format::Date) => time_faker(key, s, Layout::Date, rng),
        Some(Format::DateTime) => time_faker(key, s, Layout::DateTime, rng),
        Some(Format::DateTimeNoTz) => time_faker(key, s, Layout::DateTimeNoTz, rng),
        Some(Format::Time) => time_faker(key, s, Layout::Time, rng),
        Some(Format::Duration) => fake_duration(s, rng),
        _ => fake_hex(
            rng,
            s.seen_min_length.unwrap_or(4) as usize,
            s.seen_max_length.unwrap_or(12) as usize,
        ),
    }
}

enum Layout {
    Date,
    DateTime,
    DateTimeNoTz,
    Time,
}

/// Generate a random instant between the schema's observed bounds.
/// Keys prefixed `updated`/`modified` cap the upper bound at "now",
/// so fixtures built from an `updated_at`-style schema remain
/// reproducible going forward.
fn time_faker(key: &str, s: &crate::schema::StringSchema, layout: Layout, rng: &mut dyn RngCore) -> String {
    let cap_now = key.starts_with("updated") || key.starts_with("modified");
    let min_s = s.seen_minimum.as_deref().unwrap_or("");
    let max_s = s.seen_maximum.as_deref().unwrap_or("");

    match layout {
        Layout::Date => {
            let (y1, m1, d1) = timestring::date_parts(min_s).unwrap_or((1970, 1, 1));
            let (mut y2, mut m2, mut d2) = timestring::date_parts(max_s).unwrap_or((y1, m1, d1));
            if cap_now {
                let (ny, nm, nd) = today_civil();
                (y2, m2, d2) = (ny as i128, nm as i128, nd as i128);
            }
            let lo = days_from_civil(y1 as i64, m1 as i64, d1 as i64);
            let hi = days_from_civil(y2 as i64, m2 as i64, d2 as i64);
            let day = fake_i64(rng, lo.min(hi), lo.max(hi));
            let (y, m, d) = civil_from_days(day);
            format!("{y:04}-{m:02}-{d:02}")
        }
        Layout::Time => {
            let (h1, mi1, s1) = timestring::time_parts(min_s).unwrap_or((0, 0, 0));
            let (h2, mi2, s2) = timestring::time_parts(max_s).unwrap_or((h1, mi1, s1));
            let lo = h1 * 3600 + mi1 * 60 + s1;
            let hi = h2 * 3600 + mi2 * 60 + s2;
            let secs = fake_i64(rng, lo.min(hi) as i64, lo.max(hi) as i64);
            format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
        }
        Layout::DateTime | Layout::DateTimeNoTz => {
            let (y1, mo1, d1, h1, mi1, s1) =
                timestring::datetime_parts(min_s).unwrap_or((1970, 1, 1, 0, 0, 0));
            let (mut y2, mut mo2, mut d2, mut h2, mut mi2, mut s2) =
                timestring::datetime_parts(max_s).unwrap_or((y1, mo1, d1, h1, mi1, s1));
            if cap_now {
                let (ny, nm, nd) = today_civil();
                (y2, mo2, d2) = (ny as i128, nm as i128, nd as i128);
                (h2, mi2, s2) = (23, 59, 59);
            }
            let lo = days_from_civil(y1 as i64, mo1 as i64, d1 as i64) * 86_400
                + (h1 * 3600 + mi1 * 60 + s1) as i64;
            let hi = days_from_civil(y2 as i64, mo2 as i64, d2 as i64) * 86_400
                + (h2 * 3600 + mi2 * 60 + s2) as i64;
            let total = fake_i64(rng, lo.min(hi), lo.max(hi));
            let (day, rem) = (total.div_euclid(86_400), total.rem_euclid(86_400));
            let (y, m, d) = civil_from_days(day);
            let suffix = match layout {
                Layout::DateTime => "Z",
                _ => "",
            };
            format!(
                "{y:04}-{m:02}-{d:02}T{:02}:{:02}:{:02}{suffix}",
                rem / 3600,
                (rem / 60) % 60,
                rem % 60
            )
        }
    }
}

fn today_civil() -> (i64, u32, u32) {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let (y, m, d) = civil_from_days(secs.div_euclid(86_400));
    (y, m as u32, d as u32)
}

fn fake_duration(s: &crate::schema::StringSchema, rng: &mut dyn RngCore) -> String {
    let min = s
        .seen_minimum
        .as_deref()
        .and_then(timestring::parse_period)
        .unwrap_or(0);
    let max = s
        .seen_maximum
        .as_deref()
        .and_then(timestring::parse_period)
        .unwrap_or(0);
    let lo = (min.min(max) / 1_000_000_000) as i64;
    let hi = (min.max(max) / 1_000_000_000) as i64;
    let total_secs = fake_i64(rng, lo, hi).max(0);
    let days = total_secs / 86_400;
    let rem = total_secs % 86_400;
    let h = rem / 3600;
    let m = (rem % 3600) / 60;
    let sec = rem % 60;
    if days > 0 {
        format!("P{days}DT{h}H{m}M{sec}S")
    } else {
        format!("PT{h}H{m}M{sec}S")
    }
}

fn fake_uri(s: &crate::schema::StringSchema, rng: &mut dyn RngCore) -> String {
    let Some(locs) = &s.uri_locations else {
        return format!("https://{}", fake_hex(rng, 4, 12));
    };
    if locs.is_empty() {
        return "https://example.com".to_string();
    }
    let base = choice(rng, locs);
    format!("{base}/{}", fake_hex(rng, 4, 12))
}

/// Days since 1970-01-01 for `(y, m, d)` (Howard Hinnant's
/// `days_from_civil`, public domain algorithm).
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn choice<'a, T>(rng: &mut dyn RngCore, items: &'a [T]) -> &'a T {
    &items[(rng.next_u32() as usize) % items.len()]
}

fn fake_i64(rng: &mut dyn RngCore, min: i64, max: i64) -> i64 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let span = (max - min) as u64 + 1;
    if span == 0 {
        return min;
    }
    min + (rng.next_u64() % span) as i64
}

fn fake_f64(rng: &mut dyn RngCore, min: f64, max: f64) -> f64 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let unit = (rng.next_u64() as f64) / (u64::MAX as f64);
    min + unit * (max - min)
}

fn fake_hex(rng: &mut dyn RngCore, min_len: usize, max_len: usize) -> String {
    let len = fake_i64(rng, min_len as i64, max_len.max(min_len) as i64).max(0) as usize;
    let mut bytes = vec![0u8; len.div_ceil(2)];
    rng.fill_bytes(&mut bytes);
    let mut hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(len);
    hex
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn fake_email(rng: &mut dyn RngCore) -> String {
    format!("{}@example.com", fake_hex(rng, 6, 10))
}

const CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CHF", "AUD", "CAD"];

/// Mirrors `faker.Country`'s observed bug: it slices `faker.Currency()`
/// rather than drawing from a real country list (preserved per the
/// country/currency note in DESIGN.md).
fn fake_currency(rng: &mut dyn RngCore) -> String {
    choice(rng, CURRENCY_CODES).to_string()
}

fn fake_ipv4(rng: &mut dyn RngCore) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.next_u32() % 256,
        rng.next_u32() % 256,
        rng.next_u32() % 256,
        rng.next_u32() % 256
    )
}

fn fake_ipv6(rng: &mut dyn RngCore) -> String {
    let groups: Vec<String> = (0..8).map(|_| format!("{:x}", rng.next_u32() % 0x10000)).collect();
    groups.join(":")
}

fn fake_uuid4(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    uuid::Builder::from_bytes(bytes)
        .into_uuid()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::derive;
    use crate::merge::merge_one;
    use rand::SeedableRng;
    use serde_json::json;

    fn rng() -> rand::rngs::SmallRng {
        rand::rngs::SmallRng::seed_from_u64(7)
    }

    #[test]
    fn integer_generates_within_observed_bounds() {
        let s = derive("x", &json!(5), &[]);
        for _ in 0..20 {
            let v = generate("x", &s, &mut rng());
            assert_eq!(v, json!(5));
        }
    }

    #[test]
    fn boolean_generates_a_bool() {
        let s = derive("x", &json!(true), &[]);
        let v = generate("x", &s, &mut rng());
        assert!(v.is_boolean());
    }

    #[test]
    fn enum_string_generates_a_member() {
        let mut schema = Schema::default();
        let mut r = rng();
        for i in 0..11 {
            schema = merge_one(
                schema,
                json!({"x": format!("V{}", i % 3)}),
                None,
                &[],
                &mut r,
            )
            .unwrap();
        }
        let o = match &schema {
            Schema::Object(o) => o,
            _ => panic!(),
        };
        let v = generate("x", o.properties.get("x").unwrap(), &mut r);
        let s = v.as_str().unwrap();
        assert!(["V0", "V1", "V2"].contains(&s));
    }

    #[test]
    fn null_only_generates_null() {
        let s = derive("x", &Value::Null, &[]);
        assert_eq!(generate("x", &s, &mut rng()), Value::Null);
    }

    #[test]
    fn object_recurses_into_properties() {
        let s = derive("", &json!({"a": 1, "b": true}), &[]);
        let v = generate("", &s, &mut rng());
        assert!(v.get("a").unwrap().is_i64());
        assert!(v.get("b").unwrap().is_boolean());
    }

    #[test]
    fn civil_day_roundtrip() {
        let d = days_from_civil(2020, 6, 15);
        assert_eq!(civil_from_days(d), (2020, 6, 15));
    }
}
