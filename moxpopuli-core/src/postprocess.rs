//! Post-processors run at the tail of every merge (spec §4.7).
//!
//! Grounded on `original_source/schemamerge/schemamerge.go`
//! (`handleIdentifier`, `handleStringEnum`, `handleZeroOne`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::format::Format;
use crate::schema::Schema;

/// Valid enums start with a letter and contain only upper OR
/// lowercase, plus numbers and underscores.
static VALID_ENUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]([a-z0-9_]|[A-Z0-9_])+$").unwrap());

/// Likely enums are short and letters-only (mixed case still rejected
/// by the per-char alternation, same as the source).
static LIKELY_ENUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z\d_]|[A-Z\d_]){2,26}$").unwrap());

/// Run all three post-processors, in the fixed order the reference
/// applies them.
pub fn postprocess(key: &str, schema: &mut Schema) {
    handle_identifier(key, schema);
    handle_string_enum(schema);
    handle_zero_one(schema);
}

fn handle_identifier(key: &str, schema: &mut Schema) {
    if key.ends_with("_id") {
        schema.common_mut().identifier = true;
        return;
    }
    if schema.samples() < 5 {
        return;
    }
    let Some(s) = schema.as_string() else {
        return;
    };
    let (Some(min), Some(max)) = (s.seen_min_length, s.seen_max_length) else {
        return;
    };
    if min == max && min > 8 {
        schema.common_mut().identifier = true;
    }
}

fn handle_string_enum(schema: &mut Schema) {
    let samples = schema.samples();
    let format = schema.format();
    let Some(s) = schema.as_string_mut() else {
        return;
    };

    if format == Some(Format::Uuid4) || s.sensitive {
        s.enum_values = None;
        s.seen_strings = None;
        return;
    }

    let mut all: Vec<String> = s
        .enum_values
        .take()
        .into_iter()
        .flatten()
        .chain(s.seen_strings.take().into_iter().flatten())
        .collect();
    all.sort();
    all.dedup();

    for v in &all {
        if !VALID_ENUM_RE.is_match(v) {
            s.enum_values = None;
            s.seen_strings = None;
            return;
        }
    }

    if samples <= 10 {
        s.enum_values = None;
        s.seen_strings = Some(all);
        return;
    }

    let all_likely = all.iter().all(|v| LIKELY_ENUM_RE.is_match(v));
    if all_likely && all.len() < 20 {
        s.seen_strings = None;
        s.enum_values = Some(all);
    } else {
        s.enum_values = None;
        s.seen_strings = Some(all);
    }
}

fn handle_zero_one(schema: &mut Schema) {
    let samples = schema.samples();
    let Some(i) = schema.as_integer_mut() else {
        return;
    };
    if samples <= 5 {
        return;
    }
    let (Some(min), Some(max)) = (i.bounds.seen_minimum, i.bounds.seen_maximum) else {
        return;
    };
    if min == 0 && max == 1 {
        i.enum_values = Some(vec![0, 1]);
        i.format = Some(Format::ZeroOne);
    } else {
        i.enum_values = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Common, IntegerSchema, NumberBounds, StringSchema};

    fn string_schema(samples: u64, strings: Vec<&str>) -> Schema {
        Schema::String(StringSchema {
            common: Common {
                samples,
                ..Default::default()
            },
            seen_strings: Some(strings.into_iter().map(String::from).collect()),
            ..Default::default()
        })
    }

    #[test]
    fn key_ending_in_id_marks_identifier() {
        let mut s = string_schema(1, vec!["abcdefghij"]);
        postprocess("user_id", &mut s);
        assert!(s.common().identifier);
    }

    #[test]
    fn fixed_length_string_over_threshold_is_identifier() {
        let mut s = string_schema(5, vec!["123456789"]);
        s.as_string_mut().unwrap().seen_min_length = Some(9);
        s.as_string_mut().unwrap().seen_max_length = Some(9);
        postprocess("key", &mut s);
        assert!(s.common().identifier);
    }

    #[test]
    fn small_sample_defers_to_seen_strings() {
        let mut s = string_schema(3, vec!["A", "B"]);
        postprocess("k", &mut s);
        let st = s.as_string().unwrap();
        assert!(st.enum_values.is_none());
        assert!(st.seen_strings.is_some());
    }

    #[test]
    fn likely_enum_with_enough_samples_commits() {
        let mut s = string_schema(11, vec!["VALUE_1", "VALUE_2"]);
        postprocess("k", &mut s);
        let st = s.as_string().unwrap();
        assert_eq!(
            st.enum_values,
            Some(vec!["VALUE_1".to_string(), "VALUE_2".to_string()])
        );
        assert!(st.seen_strings.is_none());
    }

    #[test]
    fn invalid_enum_member_drops_both() {
        let mut s = string_schema(11, vec!["123_bad_start"]);
        postprocess("k", &mut s);
        let st = s.as_string().unwrap();
        assert!(st.enum_values.is_none());
        assert!(st.seen_strings.is_none());
    }

    #[test]
    fn zero_one_promotes_after_enough_samples() {
        let mut s = Schema::Integer(IntegerSchema {
            common: Common {
                samples: 6,
                ..Default::default()
            },
            bounds: NumberBounds {
                seen_minimum: Some(0),
                seen_maximum: Some(1),
                ..Default::default()
            },
            ..Default::default()
        });
        postprocess("x", &mut s);
        let i = s.as_integer().unwrap();
        assert_eq!(i.format, Some(Format::ZeroOne));
        assert_eq!(i.enum_values, Some(vec![0, 1]));
    }

    #[test]
    fn widening_range_drops_enum() {
        let mut s = Schema::Integer(IntegerSchema {
            common: Common {
                samples: 6,
                ..Default::default()
            },
            bounds: NumberBounds {
                seen_minimum: Some(0),
                seen_maximum: Some(2),
                ..Default::default()
            },
            enum_values: Some(vec![0, 1]),
            ..Default::default()
        });
        postprocess("x", &mut s);
        assert!(s.as_integer().unwrap().enum_values.is_none());
    }
}
