//! Conversions between [`Value`] and `serde_json::Value`

use serde_json::{Map, Number};

use crate::Value;

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            // u64 above i64::MAX and fractional numbers land on Float
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Integer)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, field)| (key, Value::from(field)))
                    .collect(),
            ),
        }
    }
}

/// `undefined` has no JSON spelling and becomes `null`, as do non-finite
/// floats.
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Undefined => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => {
                Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(key, field)| (key, serde_json::Value::from(field)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

#[test]
fn test_json_numbers_keep_their_kind() {
    let value = Value::from(serde_json::json!([1, 1.5, u64::MAX]));
    assert_eq!(
        value,
        Value::Array(vec![
            Value::Integer(1),
            Value::Float(1.5),
            Value::Float(u64::MAX as f64)
        ])
    );
}

#[test]
fn test_undefined_and_nan_become_null() {
    let value = Value::Array(vec![Value::Undefined, Value::Float(f64::NAN)]);
    let json = serde_json::Value::from(value);
    assert_eq!(json, serde_json::json!([null, null]));
}
