//! Schema merge (spec §4.5) and the MergeMany/MergeOne driver (spec
//! §4.8).
//!
//! Grounded on `original_source/schemamerge/schemamerge.go` (`Merge`,
//! `mergeObjects`, `mergeSliceProperty`, `handleNumerical`,
//! `MergeMany`, `MergeOne`).

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::RngCore;
use serde_json::Value;

use crate::derive::derive;
use crate::error::{MoxError, Result};
use crate::format::{self, Format};
use crate::postprocess::postprocess;
use crate::schema::{
    ArraySchema, Common, IntegerSchema, NumberBounds, NumberSchema, ObjectSchema, OneOfSchema,
    Schema, StringSchema,
};
use crate::timestring;

/// Result of one merge: the fused schema, and whether the merge
/// represents a *structural* change worth recording as an example.
pub struct MergeOutput {
    pub schema: Schema,
    pub type_changed: bool,
}

/// Fuse `s2` (a just-derived one-sample observation) into `s1` (the
/// accumulator, possibly a freshly-built default schema). `key` is the
/// enclosing property name, used only by the identifier post-processor.
pub fn merge(key: &str, s1: &Schema, s2: &Schema) -> MergeOutput {
    if is_empty(s1) {
        let mut clone = s2.clone();
        clone.incr_samples_deep();
        return MergeOutput {
            schema: clone,
            type_changed: true,
        };
    }

    if s1.null_only() && !s2.null_only() {
        let mut clone = s2.clone();
        clone.common_mut().nullable = true;
        clone.incr_samples();
        return MergeOutput {
            schema: clone,
            type_changed: true,
        };
    }
    if !s1.null_only() && s2.null_only() {
        let mut clone = s1.clone();
        clone.common_mut().nullable = true;
        clone.incr_samples();
        return MergeOutput {
            schema: clone,
            type_changed: true,
        };
    }

    // Integer <-> number promotion: rewrite the integer side in place,
    // then fall through to the same-type merge below.
    let (s1, s2) = match (s1, s2) {
        (Schema::Integer(i), Schema::Number(_)) => {
            (promote_to_number(i), s2.clone())
        }
        (Schema::Number(_), Schema::Integer(i)) => {
            (s1.clone(), promote_to_number(i))
        }
        _ => (s1.clone(), s2.clone()),
    };

    if std::mem::discriminant(&s1) != std::mem::discriminant(&s2) {
        #[cfg(feature = "trace")]
        tracing::debug!(key, s1 = s1.type_name(), s2 = s2.type_name(), "type mismatch, folding into oneOf");
        let mut s2 = s2.clone();
        s2.incr_samples();
        let (variants, type_changed) = merge_slice_property(&s1, &s2);
        // The reference returns here with `sr := Schema{}` untouched —
        // samples/nullable/lastValue are only set on the same-type path
        // below, not on the oneOf wrapper.
        return MergeOutput {
            schema: Schema::OneOf(OneOfSchema {
                common: Common::default(),
                variants,
            }),
            type_changed,
        };
    }

    let mut common = Common::default();
    common.samples = std::cmp::max(s1.samples(), 1) + 1;
    common.nullable = s1.nullable() || s2.nullable();
    common.last_value = s2.common().last_value.clone().or_else(|| s1.common().last_value.clone());

    let merged_format = format::merge_format(s1.format(), s2.format());

    let mut result = match (&s1, &s2) {
        (Schema::Boolean(_), Schema::Boolean(_)) => Schema::Boolean(Default::default()),
        (Schema::Integer(a), Schema::Integer(b)) => {
            merge_integer(common.clone(), merged_format, a, b)
        }
        (Schema::Number(a), Schema::Number(b)) => {
            merge_number(common.clone(), merged_format, a, b)
        }
        (Schema::String(a), Schema::String(b)) => {
            merge_string(common.clone(), merged_format, a, b)
        }
        (Schema::Object(a), Schema::Object(b)) => {
            let (properties, type_changed) = merge_objects(a, b);
            return finish(
                Schema::Object(ObjectSchema { common, properties }),
                key,
                type_changed,
            );
        }
        (Schema::Array(a), Schema::Array(b)) => {
            let (arr, type_changed) = merge_arrays(common.clone(), a, b);
            return finish(arr, key, type_changed);
        }
        _ => Schema::Untyped(Default::default()),
    };
    *result.common_mut() = common;
    finish(result, key, false)
}

fn finish(mut schema: Schema, key: &str, type_changed: bool) -> MergeOutput {
    postprocess(key, &mut schema);
    MergeOutput {
        schema,
        type_changed,
    }
}

/// A schema with no fields at all: `Schema::default()`, or an array's
/// `items` derived from an empty sample array.
fn is_empty(s: &Schema) -> bool {
    matches!(s, Schema::Untyped(u) if u.common == Common::default())
}

fn promote_to_number(i: &IntegerSchema) -> Schema {
    Schema::Number(NumberSchema {
        common: i.common.clone(),
        format: i.format,
        bounds: NumberBounds {
            minimum: i.bounds.minimum.map(|v| v as f64),
            maximum: i.bounds.maximum.map(|v| v as f64),
            seen_minimum: i.bounds.seen_minimum.map(|v| v as f64),
            seen_maximum: i.bounds.seen_maximum.map(|v| v as f64),
        },
    })
}

fn merge_integer(
    common: Common,
    format: Option<Format>,
    a: &IntegerSchema,
    b: &IntegerSchema,
) -> Schema {
    let mut out = IntegerSchema {
        common,
        format,
        ..Default::default()
    };
    if format == Some(Format::ZeroOne) {
        out.enum_values = b.enum_values.clone();
    } else {
        out.bounds.minimum = min_opt(a.bounds.minimum, b.bounds.minimum);
        out.bounds.maximum = max_opt(a.bounds.maximum, b.bounds.maximum);
        out.bounds.seen_minimum = min_opt(a.bounds.seen_minimum, b.bounds.seen_minimum);
        out.bounds.seen_maximum = max_opt(a.bounds.seen_maximum, b.bounds.seen_maximum);
    }
    Schema::Integer(out)
}

fn merge_number(
    common: Common,
    format: Option<Format>,
    a: &NumberSchema,
    b: &NumberSchema,
) -> Schema {
    Schema::Number(NumberSchema {
        common,
        format,
        bounds: NumberBounds {
            minimum: min_opt(a.bounds.minimum, b.bounds.minimum),
            maximum: max_opt(a.bounds.maximum, b.bounds.maximum),
            seen_minimum: min_opt(a.bounds.seen_minimum, b.bounds.seen_minimum),
            seen_maximum: max_opt(a.bounds.seen_maximum, b.bounds.seen_maximum),
        },
    })
}

fn merge_string(
    common: Common,
    format: Option<Format>,
    a: &StringSchema,
    b: &StringSchema,
) -> Schema {
    let mut out = StringSchema {
        common,
        format,
        ..Default::default()
    };

    if format == Some(Format::Uri) {
        let mut locs: Vec<String> = a
            .uri_locations
            .iter()
            .flatten()
            .chain(b.uri_locations.iter().flatten())
            .cloned()
            .collect();
        locs.sort();
        locs.dedup();
        if !locs.is_empty() {
            out.uri_locations = Some(locs);
        }
    }

    if format == Some(Format::Numerical) {
        let (min, max) = handle_numerical(a, b);
        out.seen_minimum = Some(min);
        out.seen_maximum = Some(max);
    } else if let Some(fmt) = format {
        if format::is_chronolike(fmt) {
            let values: Vec<&str> = [a.seen_minimum.as_deref(), b.seen_minimum.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !values.is_empty() {
                let (min, _) = timestring::min_max(fmt, &values);
                out.seen_minimum = Some(min);
            }
            let values: Vec<&str> = [a.seen_maximum.as_deref(), b.seen_maximum.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !values.is_empty() {
                let (_, max) = timestring::min_max(fmt, &values);
                out.seen_maximum = Some(max);
            }
        }
    }

    out.min_length = min_opt(a.min_length, b.min_length);
    out.max_length = max_opt(a.max_length, b.max_length);
    out.seen_min_length = min_opt(a.seen_min_length, b.seen_min_length);
    out.seen_max_length = max_opt(a.seen_max_length, b.seen_max_length);
    out.sensitive = a.sensitive || b.sensitive;

    let mut enum_values: Vec<String> = a
        .enum_values
        .iter()
        .flatten()
        .chain(b.enum_values.iter().flatten())
        .cloned()
        .collect();
    if !enum_values.is_empty() {
        out.enum_values = Some(std::mem::take(&mut enum_values));
    }
    let mut seen: Vec<String> = a
        .seen_strings
        .iter()
        .flatten()
        .chain(b.seen_strings.iter().flatten())
        .cloned()
        .collect();
    if !seen.is_empty() {
        out.seen_strings = Some(std::mem::take(&mut seen));
    }

    Schema::String(out)
}

/// Integer-decode `seenMinimum`/`seenMaximum` for `numerical`-format
/// strings and reduce by integer comparison, not lexical.
fn handle_numerical(a: &StringSchema, b: &StringSchema) -> (String, String) {
    let parse = |s: &Option<String>| -> i64 { s.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0) };
    let min = std::cmp::min(parse(&a.seen_minimum), parse(&b.seen_minimum));
    let max = std::cmp::max(parse(&a.seen_maximum), parse(&b.seen_maximum));
    (min.to_string(), max.to_string())
}

fn merge_objects(a: &ObjectSchema, b: &ObjectSchema) -> (BTreeMap<String, Schema>, bool) {
    let mut result = BTreeMap::new();
    let mut type_changed = false;
    for (k, av) in &a.properties {
        if let Some(bv) = b.properties.get(k) {
            let mo = merge(k, av, bv);
            type_changed = type_changed || mo.type_changed;
            result.insert(k.clone(), mo.schema);
        } else {
            result.insert(k.clone(), av.clone());
        }
    }
    for (k, bv) in &b.properties {
        if !a.properties.contains_key(k) {
            result.insert(k.clone(), bv.clone());
        }
    }
    (result, type_changed)
}

fn merge_arrays(common: Common, a: &ArraySchema, b: &ArraySchema) -> (Schema, bool) {
    let a_empty = is_empty(&a.items);
    let b_empty = is_empty(&b.items);

    let (items, type_changed) = if a_empty && b_empty {
        (a.items.clone(), false)
    } else if a_empty {
        (b.items.clone(), true)
    } else if b_empty {
        (a.items.clone(), true)
    } else {
        let mo = merge("items", &a.items, &b.items);
        (Box::new(mo.schema), mo.type_changed)
    };

    let schema = Schema::Array(ArraySchema {
        common,
        items,
        seen_min_length: min_opt(a.seen_min_length, b.seen_min_length),
        seen_max_length: max_opt(a.seen_max_length, b.seen_max_length),
    });
    (schema, type_changed)
}

/// Flatten any existing `oneOf` on either side, group the union by
/// `(type, format)`, merge within each group. `type_changed` is true
/// iff at least one grouping actually collapsed two schemas together.
fn merge_slice_property(s1: &Schema, s2: &Schema) -> (Vec<Schema>, bool) {
    let mut flat = Vec::with_capacity(4);
    match s1 {
        Schema::OneOf(o) => flat.extend(o.variants.iter().cloned()),
        other => flat.push(other.clone()),
    }
    match s2 {
        Schema::OneOf(o) => flat.extend(o.variants.iter().cloned()),
        other => flat.push(other.clone()),
    }

    let mut accum: Vec<(String, Schema)> = Vec::new();
    for s in flat.iter() {
        let key = format!(
            "{}-{}",
            s.type_name(),
            s.format().map(|f| f.as_str()).unwrap_or("")
        );
        if let Some(entry) = accum.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = merge("", &entry.1, s).schema;
        } else {
            accum.push((key, s.clone()));
        }
    }
    let uniq: Vec<Schema> = accum.into_iter().map(|(_, s)| s).collect();
    let type_changed = uniq.len() == flat.len();
    (uniq, type_changed)
}

fn min_opt<T: PartialOrd + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a < b { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn max_opt<T: PartialOrd + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a > b { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Merge an iterator of payloads into `schema`, one `derive`+`merge`
/// per payload. `example_limit`: `None` leaves `examples` untouched,
/// `Some(n)` with `n <= 0` deletes it, `Some(n)` with `n > 0` samples
/// down to `n` entries drawn from the existing reservoir plus any
/// newly recorded structural-change payloads.
pub fn merge_many<I>(
    schema: Schema,
    payloads: I,
    example_limit: Option<i64>,
    salt: &[u8],
    rng: &mut dyn RngCore,
) -> Result<Schema>
where
    I: IntoIterator<Item = std::result::Result<Value, String>>,
{
    let mut result = schema;
    let mut new_examples = Vec::new();
    for (index, item) in payloads.into_iter().enumerate() {
        let payload = item.map_err(|e| MoxError::IteratorFailed(format!("#{index}: {e}")))?;
        let observed = derive("", &payload, salt);
        let mo = merge("", &result, &observed);
        result = mo.schema;
        if mo.type_changed {
            new_examples.push(payload);
        }
    }

    match example_limit {
        None => {}
        Some(limit) if limit <= 0 => {
            result.common_mut().examples = None;
        }
        Some(limit) => {
            let mut pool: Vec<Value> = result
                .common()
                .examples
                .clone()
                .unwrap_or_default();
            pool.extend(new_examples);
            let limit = limit as usize;
            if pool.len() > limit {
                pool.shuffle(rng);
                pool.truncate(limit);
            }
            result.common_mut().examples = Some(pool);
        }
    }

    Ok(result)
}

/// Convenience wrapper over [`merge_many`] for a single payload.
pub fn merge_one(
    schema: Schema,
    payload: Value,
    example_limit: Option<i64>,
    salt: &[u8],
    rng: &mut dyn RngCore,
) -> Result<Schema> {
    merge_many(schema, std::iter::once(Ok(payload)), example_limit, salt, rng)
}
