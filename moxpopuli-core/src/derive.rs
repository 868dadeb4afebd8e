//! Single-observation schema construction (spec §4.4).
//!
//! Grounded on `original_source/schema/schema.go` (`Derive`,
//! `deriveNumber`, `deriveInteger`, `deriveString`, `deriveObject`,
//! `deriveArray`).

use serde_json::Value;

use crate::format::{self, Format};
use crate::jsontype::{self, JsonType};
use crate::redact;
use crate::schema::{
    ArraySchema, BooleanSchema, Common, IntegerSchema, NumberBounds, NumberSchema, ObjectSchema,
    Schema, StringSchema, UntypedSchema,
};

/// Build a one-sample schema for `value`, observed under key `key`
/// (the enclosing object's property name, or `""` at the root — used
/// only by the sensitivity classifier's key-suffix rule).
pub fn derive(key: &str, value: &Value, salt: &[u8]) -> Schema {
    if value.is_null() {
        return Schema::Untyped(UntypedSchema {
            common: Common {
                nullable: true,
                ..Default::default()
            },
        });
    }
    match jsontype::sniff(value) {
        JsonType::Boolean => Schema::Boolean(BooleanSchema::default()),
        JsonType::Number => derive_number(value.as_f64().expect("sniffed as number")),
        JsonType::Integer => derive_integer(value_as_i64(value)),
        JsonType::String => derive_string(key, value.as_str().expect("sniffed as string"), salt),
        JsonType::Object => derive_object(value.as_object().expect("sniffed as object"), salt),
        JsonType::Array => derive_array(key, value.as_array().expect("sniffed as array"), salt),
    }
}

fn value_as_i64(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .expect("sniffed as integer")
}

fn derive_number(v: f64) -> Schema {
    Schema::Number(NumberSchema {
        common: Common::default(),
        format: Some(format::sniff_number(v)),
        bounds: NumberBounds {
            minimum: None,
            maximum: None,
            seen_minimum: Some(v),
            seen_maximum: Some(v),
        },
    })
}

fn derive_integer(v: i64) -> Schema {
    Schema::Integer(IntegerSchema {
        common: Common::default(),
        format: Some(format::sniff_integer(v)),
        bounds: NumberBounds {
            minimum: None,
            maximum: None,
            seen_minimum: Some(v),
            seen_maximum: Some(v),
        },
        enum_values: None,
    })
}

fn derive_string(key: &str, raw: &str, salt: &[u8]) -> Schema {
    let f = format::sniff_string(raw);
    let (value, sensitive) = redact::sensitive(f, key, raw, salt);
    #[cfg(feature = "trace")]
    if sensitive {
        tracing::trace!(key, format = ?f, "value classified sensitive, redacted");
    }

    let mut s = StringSchema {
        common: Common::default(),
        format: f,
        seen_strings: Some(vec![value.clone()]),
        sensitive,
        ..Default::default()
    };

    match f {
        Some(Format::IsoCountry) => {
            // Source writes 3 for both min/max here; see DESIGN.md Open
            // Questions for the country/currency length swap.
            s.min_length = Some(3);
            s.max_length = Some(3);
        }
        Some(Format::IsoCurrency) => {
            s.min_length = Some(2);
            s.max_length = Some(2);
        }
        Some(Format::Uuid4) => {
            s.min_length = Some(value.len() as u64);
            s.max_length = Some(value.len() as u64);
        }
        Some(Format::Numerical) => {
            s.seen_minimum = Some(value.clone());
            s.seen_maximum = Some(value.clone());
        }
        Some(fmt) if format::is_chronolike(fmt) => {
            s.seen_minimum = Some(value.clone());
            s.seen_maximum = Some(value.clone());
        }
        Some(Format::Uri) if !value.starts_with('/') => {
            if let Ok(parsed) = url::Url::parse(&value) {
                s.uri_locations = Some(vec![format!(
                    "{}://{}",
                    parsed.scheme(),
                    parsed.host_str().unwrap_or("")
                )]);
            }
            s.seen_min_length = Some(value.len() as u64);
            s.seen_max_length = Some(value.len() as u64);
        }
        _ => {
            s.seen_min_length = Some(value.len() as u64);
            s.seen_max_length = Some(value.len() as u64);
        }
    }

    Schema::String(s)
}

fn derive_object(v: &serde_json::Map<String, Value>, salt: &[u8]) -> Schema {
    let properties = v
        .iter()
        .map(|(k, val)| (k.clone(), derive(k, val, salt)))
        .collect();
    Schema::Object(ObjectSchema {
        common: Common::default(),
        properties,
    })
}

fn derive_array(key: &str, v: &[Value], salt: &[u8]) -> Schema {
    let items = match v.first() {
        Some(first) => derive(key, first, salt),
        None => Schema::default(),
    };
    Schema::Array(ArraySchema {
        common: Common::default(),
        items: Box::new(items),
        seen_min_length: Some(v.len() as u64),
        seen_max_length: Some(v.len() as u64),
    })
}
