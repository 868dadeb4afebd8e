//! Concrete-value type classification.
//!
//! Grounded on `original_source/jsontype/jsontype.go`.

use serde_json::Value;

/// One of the seven JSON type tags a concrete value can sniff to.
///
/// `null` has no `JsonType` of its own (spec: "null -> notype"); callers
/// branch on `Value::Null` before reaching [`sniff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Integer,
    Number,
    String,
    Boolean,
    Object,
    Array,
}

impl JsonType {
    pub const fn as_str(self) -> &'static str {
        match self {
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a non-null decoded JSON value.
///
/// Implements the integer/number coercion rule from spec §4.1: a
/// numeric value whose value equals its integral truncation sniffs as
/// `Integer` even if it was written with a decimal point (`10.0`).
///
/// # Panics
/// Panics if given `Value::Null` — that is a programmer error in the
/// caller, which must branch on null before deriving a type (mirrors
/// the Go reference's `Sniff` receiving a non-nil `interface{}`).
pub fn sniff(value: &Value) -> JsonType {
    match value {
        Value::Null => unreachable!("jsontype::sniff must not be called with null"),
        Value::Bool(_) => JsonType::Boolean,
        Value::String(_) => JsonType::String,
        Value::Object(_) => JsonType::Object,
        Value::Array(_) => JsonType::Array,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return JsonType::Integer;
            }
            let f = n
                .as_f64()
                .expect("serde_json::Number is always representable as f64");
            if f.is_finite() && f.fract() == 0.0 {
                JsonType::Integer
            } else {
                JsonType::Number
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_sniff_as_integer() {
        assert_eq!(sniff(&json!(1)), JsonType::Integer);
        assert_eq!(sniff(&json!(-5)), JsonType::Integer);
    }

    #[test]
    fn integral_float_coerces_to_integer() {
        assert_eq!(sniff(&json!(10.0)), JsonType::Integer);
    }

    #[test]
    fn fractional_float_is_number() {
        assert_eq!(sniff(&json!(10.5)), JsonType::Number);
    }

    #[test]
    fn other_types() {
        assert_eq!(sniff(&json!(true)), JsonType::Boolean);
        assert_eq!(sniff(&json!("x")), JsonType::String);
        assert_eq!(sniff(&json!({})), JsonType::Object);
        assert_eq!(sniff(&json!([])), JsonType::Array);
    }

    #[test]
    #[should_panic]
    fn null_panics() {
        sniff(&Value::Null);
    }
}
