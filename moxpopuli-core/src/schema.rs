//! The `Schema` discriminated union (spec §3) and its JSON
//! projection.
//!
//! Grounded on `original_source/schema/schema.go`, which represents a
//! schema as `map[Field]interface{}` keyed by the field-name
//! constants reproduced here as literals inside [`to_value`]/
//! [`from_value`]. The union form is used instead (per spec.md §9:
//! "the union form enforces more invariants at construction time").

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{MoxError, Result};
use crate::format::Format;

/// Fields every schema variant carries, regardless of type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Common {
    pub nullable: bool,
    pub samples: u64,
    pub identifier: bool,
    /// `x-lastValue`: written by the out-of-scope HTTP collaborator;
    /// this crate only has to round-trip it.
    pub last_value: Option<Value>,
    /// `examples`: only ever populated on the root schema, by
    /// `merge_many`.
    pub examples: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberBounds<T> {
    pub minimum: Option<T>,
    pub maximum: Option<T>,
    pub seen_minimum: Option<T>,
    pub seen_maximum: Option<T>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegerSchema {
    pub common: Common,
    pub format: Option<Format>,
    pub bounds: NumberBounds<i64>,
    /// Only ever `Some([0, 1])`, written by the zero-one post-processor.
    pub enum_values: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    pub common: Common,
    pub format: Option<Format>,
    pub bounds: NumberBounds<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    pub common: Common,
    pub format: Option<Format>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub seen_min_length: Option<u64>,
    pub seen_max_length: Option<u64>,
    /// Raw string for `numerical`/chronolike formats so merge can
    /// re-parse under the right comparator; `None` otherwise.
    pub seen_minimum: Option<String>,
    pub seen_maximum: Option<String>,
    pub seen_strings: Option<Vec<String>>,
    pub enum_values: Option<Vec<String>>,
    pub sensitive: bool,
    pub uri_locations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooleanSchema {
    pub common: Common,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub common: Common,
    pub properties: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub common: Common,
    pub items: Box<Schema>,
    pub seen_min_length: Option<u64>,
    pub seen_max_length: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UntypedSchema {
    pub common: Common,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneOfSchema {
    pub common: Common,
    pub variants: Vec<Schema>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Untyped(UntypedSchema),
    Boolean(BooleanSchema),
    Integer(IntegerSchema),
    Number(NumberSchema),
    String(StringSchema),
    Object(ObjectSchema),
    Array(ArraySchema),
    OneOf(OneOfSchema),
}

impl Default for Schema {
    fn default() -> Self {
        Schema::Untyped(UntypedSchema::default())
    }
}

impl Schema {
    pub fn common(&self) -> &Common {
        match self {
            Schema::Untyped(s) => &s.common,
            Schema::Boolean(s) => &s.common,
            Schema::Integer(s) => &s.common,
            Schema::Number(s) => &s.common,
            Schema::String(s) => &s.common,
            Schema::Object(s) => &s.common,
            Schema::Array(s) => &s.common,
            Schema::OneOf(s) => &s.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut Common {
        match self {
            Schema::Untyped(s) => &mut s.common,
            Schema::Boolean(s) => &mut s.common,
            Schema::Integer(s) => &mut s.common,
            Schema::Number(s) => &mut s.common,
            Schema::String(s) => &mut s.common,
            Schema::Object(s) => &mut s.common,
            Schema::Array(s) => &mut s.common,
            Schema::OneOf(s) => &mut s.common,
        }
    }

    pub fn nullable(&self) -> bool {
        self.common().nullable
    }

    pub fn samples(&self) -> u64 {
        self.common().samples
    }

    pub fn incr_samples(&mut self) {
        self.common_mut().samples += 1;
    }

    /// Recursively increments `samples` on this schema and every
    /// sub-schema. Used the first time a fresh accumulator is cloned
    /// into place (merge step 1), mirroring `Schema.IncrSamplesDeep`.
    pub fn incr_samples_deep(&mut self) {
        self.incr_samples();
        match self {
            Schema::Object(o) => {
                for child in o.properties.values_mut() {
                    child.incr_samples_deep();
                }
            }
            Schema::Array(a) => a.items.incr_samples_deep(),
            Schema::OneOf(o) => {
                for variant in &mut o.variants {
                    variant.incr_samples_deep();
                }
            }
            _ => {}
        }
    }

    /// `true` iff the only observation at this position has been null.
    pub fn null_only(&self) -> bool {
        self.nullable() && matches!(self, Schema::Untyped(_))
    }

    pub fn format(&self) -> Option<Format> {
        match self {
            Schema::Integer(s) => s.format,
            Schema::Number(s) => s.format,
            Schema::String(s) => s.format,
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&IntegerSchema> {
        match self {
            Schema::Integer(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&NumberSchema> {
        match self {
            Schema::Number(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringSchema> {
        match self {
            Schema::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_mut(&mut self) -> Option<&mut StringSchema> {
        match self {
            Schema::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer_mut(&mut self) -> Option<&mut IntegerSchema> {
        match self {
            Schema::Integer(s) => Some(s),
            _ => None,
        }
    }

    /// A short tag naming this variant, used to group `oneOf` members
    /// by `(type, format)`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Untyped(_) => "",
            Schema::Boolean(_) => "boolean",
            Schema::Integer(_) => "integer",
            Schema::Number(_) => "number",
            Schema::String(_) => "string",
            Schema::Object(_) => "object",
            Schema::Array(_) => "array",
            Schema::OneOf(_) => "oneOf",
        }
    }

    /// Serialize to the exact persisted field layout (spec §6).
    pub fn to_value(&self) -> Value {
        let mut m = Map::new();
        let common = self.common();
        if common.nullable {
            m.insert("x-nullable".into(), Value::Bool(true));
        }
        if common.samples > 0 {
            m.insert("x-samples".into(), Value::from(common.samples));
        }
        if common.identifier {
            m.insert("x-identifier".into(), Value::Bool(true));
        }
        if let Some(lv) = &common.last_value {
            m.insert("x-lastValue".into(), lv.clone());
        }
        if let Some(examples) = &common.examples {
            m.insert("examples".into(), Value::Array(examples.clone()));
        }

        match self {
            Schema::Untyped(_) => {}
            Schema::Boolean(_) => {
                m.insert("type".into(), Value::from("boolean"));
            }
            Schema::Integer(s) => {
                m.insert("type".into(), Value::from("integer"));
                if let Some(f) = s.format {
                    m.insert("format".into(), Value::from(f.as_str()));
                }
                insert_opt(&mut m, "minimum", s.bounds.minimum);
                insert_opt(&mut m, "maximum", s.bounds.maximum);
                insert_opt(&mut m, "x-seenMinimum", s.bounds.seen_minimum);
                insert_opt(&mut m, "x-seenMaximum", s.bounds.seen_maximum);
                if let Some(e) = &s.enum_values {
                    m.insert("enum".into(), Value::from(e.clone()));
                }
            }
            Schema::Number(s) => {
                m.insert("type".into(), Value::from("number"));
                if let Some(f) = s.format {
                    m.insert("format".into(), Value::from(f.as_str()));
                }
                insert_opt(&mut m, "minimum", s.bounds.minimum);
                insert_opt(&mut m, "maximum", s.bounds.maximum);
                insert_opt(&mut m, "x-seenMinimum", s.bounds.seen_minimum);
                insert_opt(&mut m, "x-seenMaximum", s.bounds.seen_maximum);
            }
            Schema::String(s) => {
                m.insert("type".into(), Value::from("string"));
                if let Some(f) = s.format {
                    m.insert("format".into(), Value::from(f.as_str()));
                }
                insert_opt(&mut m, "minLength", s.min_length);
                insert_opt(&mut m, "maxLength", s.max_length);
                insert_opt(&mut m, "x-seenMinLength", s.seen_min_length);
                insert_opt(&mut m, "x-seenMaxLength", s.seen_max_length);
                if let Some(v) = &s.seen_minimum {
                    m.insert("x-seenMinimum".into(), Value::from(v.clone()));
                }
                if let Some(v) = &s.seen_maximum {
                    m.insert("x-seenMaximum".into(), Value::from(v.clone()));
                }
                if let Some(e) = &s.enum_values {
                    m.insert("enum".into(), Value::from(e.clone()));
                }
                if let Some(v) = &s.seen_strings {
                    m.insert("x-seenStrings".into(), Value::from(v.clone()));
                }
                if s.sensitive {
                    m.insert("x-sensitive".into(), Value::Bool(true));
                }
                if let Some(v) = &s.uri_locations {
                    m.insert("x-uriLocations".into(), Value::from(v.clone()));
                }
            }
            Schema::Object(s) => {
                m.insert("type".into(), Value::from("object"));
                let props: Map<String, Value> = s
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect();
                m.insert("properties".into(), Value::Object(props));
            }
            Schema::Array(s) => {
                m.insert("type".into(), Value::from("array"));
                m.insert("items".into(), s.items.to_value());
                insert_opt(&mut m, "x-seenMinLength", s.seen_min_length);
                insert_opt(&mut m, "x-seenMaxLength", s.seen_max_length);
            }
            Schema::OneOf(s) => {
                let variants: Vec<Value> = s.variants.iter().map(Schema::to_value).collect();
                m.insert("oneOf".into(), Value::Array(variants));
            }
        }
        Value::Object(m)
    }

    /// Parse the persisted field layout back into a `Schema`.
    pub fn from_value(v: &Value) -> Result<Schema> {
        let m = v
            .as_object()
            .ok_or_else(|| MoxError::Invariant("schema must be a JSON object".into()))?;

        let common = Common {
            nullable: m.get("x-nullable").and_then(Value::as_bool).unwrap_or(false),
            samples: m.get("x-samples").and_then(Value::as_u64).unwrap_or(0),
            identifier: m.get("x-identifier").and_then(Value::as_bool).unwrap_or(false),
            last_value: m.get("x-lastValue").cloned(),
            examples: m
                .get("examples")
                .and_then(Value::as_array)
                .map(|a| a.clone()),
        };

        if let Some(one_of) = m.get("oneOf").and_then(Value::as_array) {
            let variants = one_of
                .iter()
                .map(Schema::from_value)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Schema::OneOf(OneOfSchema { common, variants }));
        }

        let type_tag = m.get("type").and_then(Value::as_str);
        Ok(match type_tag {
            None => Schema::Untyped(UntypedSchema { common }),
            Some("boolean") => Schema::Boolean(BooleanSchema { common }),
            Some("integer") => Schema::Integer(IntegerSchema {
                common,
                format: m.get("format").and_then(Value::as_str).and_then(Format::from_str),
                bounds: NumberBounds {
                    minimum: m.get("minimum").and_then(Value::as_i64),
                    maximum: m.get("maximum").and_then(Value::as_i64),
                    seen_minimum: m.get("x-seenMinimum").and_then(Value::as_i64),
                    seen_maximum: m.get("x-seenMaximum").and_then(Value::as_i64),
                },
                enum_values: m.get("enum").and_then(Value::as_array).map(|a| {
                    a.iter().filter_map(Value::as_i64).collect()
                }),
            }),
            Some("number") => Schema::Number(NumberSchema {
                common,
                format: m.get("format").and_then(Value::as_str).and_then(Format::from_str),
                bounds: NumberBounds {
                    minimum: m.get("minimum").and_then(Value::as_f64),
                    maximum: m.get("maximum").and_then(Value::as_f64),
                    seen_minimum: m.get("x-seenMinimum").and_then(Value::as_f64),
                    seen_maximum: m.get("x-seenMaximum").and_then(Value::as_f64),
                },
            }),
            Some("string") => Schema::String(StringSchema {
                common,
                format: m.get("format").and_then(Value::as_str).and_then(Format::from_str),
                min_length: m.get("minLength").and_then(Value::as_u64),
                max_length: m.get("maxLength").and_then(Value::as_u64),
                seen_min_length: m.get("x-seenMinLength").and_then(Value::as_u64),
                seen_max_length: m.get("x-seenMaxLength").and_then(Value::as_u64),
                seen_minimum: m
                    .get("x-seenMinimum")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                seen_maximum: m
                    .get("x-seenMaximum")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                seen_strings: string_vec(m.get("x-seenStrings")),
                enum_values: string_vec(m.get("enum")),
                sensitive: m.get("x-sensitive").and_then(Value::as_bool).unwrap_or(false),
                uri_locations: string_vec(m.get("x-uriLocations")),
            }),
            Some("object") => {
                let mut properties = BTreeMap::new();
                if let Some(props) = m.get("properties").and_then(Value::as_object) {
                    for (k, v) in props {
                        properties.insert(k.clone(), Schema::from_value(v)?);
                    }
                }
                Schema::Object(ObjectSchema { common, properties })
            }
            Some("array") => {
                let items = match m.get("items") {
                    Some(v) => Schema::from_value(v)?,
                    None => Schema::default(),
                };
                Schema::Array(ArraySchema {
                    common,
                    items: Box::new(items),
                    seen_min_length: m.get("x-seenMinLength").and_then(Value::as_u64),
                    seen_max_length: m.get("x-seenMaxLength").and_then(Value::as_u64),
                })
            }
            Some(other) => {
                return Err(MoxError::Invariant(format!("unknown schema type {other:?}")))
            }
        })
    }
}

fn insert_opt<T: Into<Value>>(m: &mut Map<String, Value>, key: &str, v: Option<T>) {
    if let Some(v) = v {
        m.insert(key.into(), v.into());
    }
}

fn string_vec(v: Option<&Value>) -> Option<Vec<String>> {
    v.and_then(Value::as_array).map(|a| {
        a.iter()
            .filter_map(|x| x.as_str().map(str::to_string))
            .collect()
    })
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Schema::from_value(&v).map_err(D::Error::custom)
    }
}

/// Write a schema to `w`, pretty-printed with a two-space indent, per
/// spec §6's "Persisted schema format".
pub fn to_writer_pretty<W: std::io::Write>(w: W, schema: &Schema) -> Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(w, formatter);
    schema
        .to_value()
        .serialize(&mut ser)
        .map_err(|e| MoxError::Invariant(e.to_string()))
}

pub fn from_reader<R: std::io::Read>(r: R) -> Result<Schema> {
    let v: Value = serde_json::from_reader(r).map_err(|e| MoxError::InvalidPayload {
        index: 0,
        source: e,
    })?;
    Schema::from_value(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_nullable_round_trips() {
        let s = Schema::Untyped(UntypedSchema {
            common: Common {
                nullable: true,
                ..Default::default()
            },
        });
        let v = s.to_value();
        assert_eq!(v, serde_json::json!({"x-nullable": true}));
        let back = Schema::from_value(&v).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn integer_round_trips() {
        let s = Schema::Integer(IntegerSchema {
            common: Common {
                samples: 1,
                ..Default::default()
            },
            format: Some(Format::Int32),
            bounds: NumberBounds {
                minimum: None,
                maximum: None,
                seen_minimum: Some(1),
                seen_maximum: Some(1),
            },
            enum_values: None,
        });
        let v = s.to_value();
        assert_eq!(v["type"], "integer");
        assert_eq!(v["format"], "int32");
        assert_eq!(v["x-seenMinimum"], 1);
        let back = Schema::from_value(&v).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn object_properties_round_trip() {
        let mut props = BTreeMap::new();
        props.insert(
            "x".to_string(),
            Schema::Boolean(BooleanSchema::default()),
        );
        let s = Schema::Object(ObjectSchema {
            common: Common::default(),
            properties: props,
        });
        let v = s.to_value();
        let back = Schema::from_value(&v).unwrap();
        assert_eq!(back, s);
    }
}
