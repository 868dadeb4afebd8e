//! Integration tests for the six numbered scenarios in spec §8, plus
//! the cross-cutting invariants that don't fit naturally into a single
//! module's unit tests.

use moxpopuli_core::schema::Schema;
use moxpopuli_core::{derive, merge, merge_one};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::json;

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(1)
}

#[test]
fn scenario_1_integer_sample() {
    let schema = merge_one(Schema::default(), json!({"x": 1}), None, &[], &mut rng()).unwrap();
    assert_eq!(schema.type_name(), "object");
    assert_eq!(schema.samples(), 1);

    let x = match &schema {
        Schema::Object(o) => o.properties.get("x").unwrap(),
        _ => panic!("expected object"),
    };
    let i = x.as_integer().unwrap();
    assert_eq!(i.format, Some(moxpopuli_core::format::Format::Int32));
    assert_eq!(i.bounds.seen_minimum, Some(1));
    assert_eq!(i.bounds.seen_maximum, Some(1));
}

#[test]
fn scenario_2_int_to_number_promotion() {
    let mut schema = Schema::default();
    let mut r = rng();
    schema = merge_one(schema, json!({"y": 10}), None, &[], &mut r).unwrap();
    schema = merge_one(schema, json!({"y": 10.5}), None, &[], &mut r).unwrap();

    let y = match &schema {
        Schema::Object(o) => o.properties.get("y").unwrap(),
        _ => panic!("expected object"),
    };
    let n = y.as_number().unwrap();
    assert_eq!(n.bounds.seen_minimum, Some(10.0));
    assert_eq!(n.bounds.seen_maximum, Some(10.5));
    assert_eq!(y.samples(), 2);
}

#[test]
fn scenario_3_uri_then_plain_string_collapses_format() {
    let mut schema = Schema::default();
    let mut r = rng();
    schema = merge_one(
        schema,
        json!({"y": "https://x.y.z"}),
        None,
        &[],
        &mut r,
    )
    .unwrap();
    schema = merge_one(schema, json!({"y": "a"}), None, &[], &mut r).unwrap();

    let y = match &schema {
        Schema::Object(o) => o.properties.get("y").unwrap(),
        _ => panic!("expected object"),
    };
    let s = y.as_string().unwrap();
    assert_eq!(s.format, None);
    assert!(s.uri_locations.is_none());
    assert_eq!(s.seen_min_length, Some(1));
    assert_eq!(s.seen_max_length, Some(13));
}

#[test]
fn scenario_4_zero_one_promotion_then_widening() {
    let mut schema = Schema::default();
    let mut r = rng();
    for v in [0, 1, 0, 1, 0, 1] {
        schema = merge_one(schema, json!({"x": v}), None, &[], &mut r).unwrap();
    }
    let x = match &schema {
        Schema::Object(o) => o.properties.get("x").unwrap(),
        _ => panic!("expected object"),
    };
    let i = x.as_integer().unwrap();
    assert_eq!(i.format, Some(moxpopuli_core::format::Format::ZeroOne));
    assert_eq!(i.enum_values, Some(vec![0, 1]));

    schema = merge_one(schema, json!({"x": 2}), None, &[], &mut r).unwrap();
    let x = match &schema {
        Schema::Object(o) => o.properties.get("x").unwrap(),
        _ => panic!("expected object"),
    };
    let i = x.as_integer().unwrap();
    assert!(i.enum_values.is_none());
    assert_eq!(i.format, Some(moxpopuli_core::format::Format::Int32));
}

#[test]
fn scenario_5_enum_discovery() {
    let mut schema = Schema::default();
    let mut r = rng();
    for i in 0..50 {
        let v = format!("VALUE_{}", (i % 5) + 1);
        schema = merge_one(schema, json!({"x": v}), None, &[], &mut r).unwrap();
    }
    let x = match &schema {
        Schema::Object(o) => o.properties.get("x").unwrap(),
        _ => panic!("expected object"),
    };
    let s = x.as_string().unwrap();
    assert_eq!(
        s.enum_values,
        Some(vec![
            "VALUE_1".to_string(),
            "VALUE_2".to_string(),
            "VALUE_3".to_string(),
            "VALUE_4".to_string(),
            "VALUE_5".to_string(),
        ])
    );
    assert!(s.seen_strings.is_none());
}

#[test]
fn scenario_6_sensitive_hashing_is_deterministic_per_salt() {
    let value = "c2c691f00d678abf6c54b18fd930";
    let a1 = derive("x", &json!(value), b"abcd");
    let a2 = derive("x", &json!(value), b"abcd");
    let b = derive("x", &json!(value), b"xyz");

    let seen = |s: &Schema| s.as_string().unwrap().seen_strings.clone().unwrap()[0].clone();
    assert_eq!(seen(&a1), seen(&a2));
    assert_ne!(seen(&a1), seen(&b));
    assert_eq!(seen(&a1).len(), value.len());
}

#[test]
fn samples_count_equals_payload_count() {
    let mut schema = Schema::default();
    let mut r = rng();
    for i in 0..7 {
        schema = merge_one(schema, json!({"n": i}), None, &[], &mut r).unwrap();
    }
    assert_eq!(schema.samples(), 7);
}

#[test]
fn merge_with_null_sets_nullable_without_changing_type() {
    let one = derive("x", &json!(1), &[]);
    let merged = merge("x", &one, &derive("x", &json!(null), &[])).schema;
    assert!(merged.nullable());
    assert_eq!(merged.type_name(), "integer");
}

#[test]
fn sensitive_flag_never_clears_once_set() {
    let sensitive = derive("auth_token", &json!("abcdef1234567890"), &[]);
    let plain = derive("auth_token", &json!("short"), &[]);
    let merged = merge("auth_token", &sensitive, &plain).schema;
    assert!(merged.as_string().unwrap().sensitive);
}

#[test]
fn merge_is_associative_up_to_samples() {
    let a = derive("x", &json!(1), &[]);
    let b = derive("x", &json!(2), &[]);
    let c = derive("x", &json!(3), &[]);

    let left = merge("x", &merge("x", &a, &b).schema, &c).schema;
    let right = merge("x", &a, &merge("x", &b, &c).schema).schema;

    assert_eq!(left.as_integer().unwrap().bounds, right.as_integer().unwrap().bounds);
    assert_eq!(left.type_name(), right.type_name());
}
