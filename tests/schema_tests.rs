// tests/schema_tests.rs

use std::collections::HashMap;

use grammar_kit::schema::{SchemaError, SchemaMap, TypeDescriptor, validate};
use grammar_kit::value::Value;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn descriptor(text: &str) -> TypeDescriptor {
    TypeDescriptor::parse(text).unwrap()
}

fn object(fields: &[(&str, Value)]) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>(),
    )
}

// ============================================================================
// Descriptor language
// ============================================================================

#[rstest]
#[case("number", "number")]
#[case("number>=0", "number >= 0")]
#[case("number > -1.5", "number > -1.5")]
#[case("0<=number<100", "0 <= number < 100")]
#[case("string == 3", "string == 3")]
#[case("string <= 10", "string <= 10")]
#[case("number.integer", "number.integer")]
#[case("string.email", "string.email")]
#[case("string[]", "string[]")]
#[case("(number|string)[]", "(number | string)[]")]
#[case("'asc' | 'desc'", "'asc' | 'desc'")]
#[case("42", "42")]
#[case("true", "true")]
#[case("number | (string | null)", "number | string | null")]
#[case("(number)", "number")]
#[case("unknown", "unknown")]
fn test_canonical_display(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(descriptor(input).to_string(), expected);
}

#[rstest]
#[case("")]
#[case("numbr")]
#[case("number |")]
#[case("(number")]
#[case("string.integer")]
#[case("'open")]
#[case("number >= ")]
#[case("boolean > 1")]
fn test_invalid_descriptors(#[case] input: &str) {
    assert!(TypeDescriptor::parse(input).is_err(), "{input} should not parse");
}

#[test]
fn test_from_str() {
    let parsed: TypeDescriptor = "number | string".parse().unwrap();
    assert_eq!(parsed.members().len(), 2);
}

// ============================================================================
// Admitting values
// ============================================================================

#[rstest]
#[case("number", Value::Integer(1), true)]
#[case("number", Value::Float(1.5), true)]
#[case("number", Value::String("1".into()), false)]
#[case("number.integer", Value::Float(2.0), true)]
#[case("number.integer", Value::Float(2.5), false)]
#[case("0 <= number < 10", Value::Integer(0), true)]
#[case("0 <= number < 10", Value::Integer(10), false)]
#[case("number > 0", Value::Integer(0), false)]
#[case("string <= 3", Value::String("abc".into()), true)]
#[case("string <= 3", Value::String("abcd".into()), false)]
#[case("string == 2", Value::String("éé".into()), true)]
#[case("string.email", Value::String("a@b.co".into()), true)]
#[case("string.email", Value::String("nope".into()), false)]
#[case("string.uuid", Value::String("123e4567-e89b-12d3-a456-426614174000".into()), true)]
#[case("string.date", Value::String("2024-02-30".into()), true)]
#[case("string.date", Value::String("2024-13-01".into()), false)]
#[case("string.url", Value::String("https://example.com/x".into()), true)]
#[case("string.alpha", Value::String("abc1".into()), false)]
#[case("string.alphanumeric", Value::String("abc1".into()), true)]
#[case("'asc' | 'desc'", Value::String("desc".into()), true)]
#[case("'asc' | 'desc'", Value::String("up".into()), false)]
#[case("42", Value::Float(42.0), true)]
#[case("number | null", Value::Null, true)]
#[case("number", Value::Undefined, false)]
#[case("number | undefined", Value::Undefined, true)]
#[case("boolean", Value::Boolean(false), true)]
#[case("object", Value::Object(HashMap::new()), true)]
#[case("unknown", Value::Null, true)]
fn test_admits(#[case] text: &str, #[case] value: Value, #[case] expected: bool) {
    assert_eq!(descriptor(text).admits(&value), expected, "{text} admits {value:?}");
}

#[test]
fn test_array_admits() {
    let strings = descriptor("string[]");
    assert!(strings.admits(&Value::Array(vec!["a".into(), "b".into()])));
    assert!(!strings.admits(&Value::Array(vec!["a".into(), 1i64.into()])));
    assert!(!strings.admits(&Value::String("a".into())));

    let short = descriptor("number[] <= 2");
    assert!(short.admits(&Value::Array(vec![1i64.into(), 2i64.into()])));
    assert!(!short.admits(&Value::Array(vec![1i64.into(), 2i64.into(), 3i64.into()])));
}

// ============================================================================
// Subsumption
// ============================================================================

#[rstest]
#[case("number", "number >= 0", true)]
#[case("number >= 0", "number", false)]
#[case("number >= 0", "number > 5", true)]
#[case("number", "number.integer", true)]
#[case("number.integer", "number", false)]
#[case("number | string", "string", true)]
#[case("number | string", "boolean", false)]
#[case("string", "number | string", false)]
#[case("number | string | null", "number | null", true)]
#[case("boolean", "true", true)]
#[case("number", "42", true)]
#[case("'a' | 'b'", "'a'", true)]
#[case("unknown", "boolean", true)]
#[case("boolean", "unknown", true)]
#[case("number[]", "(number >= 0)[]", true)]
#[case("number[]", "string[]", false)]
#[case("object", "number", false)]
fn test_accepts(#[case] constraint: &str, #[case] operand: &str, #[case] expected: bool) {
    assert_eq!(
        descriptor(constraint).accepts(&descriptor(operand)),
        expected,
        "{constraint} accepts {operand}"
    );
}

// ============================================================================
// Schema maps
// ============================================================================

#[test]
fn test_schema_from_json() {
    let schema = SchemaMap::from_json(&json!({
        "price": "number >= 0",
        "user": { "email": "string.email" }
    }))
    .unwrap();
    assert_eq!(schema.len(), 2);
    let path = vec!["user".to_string(), "email".to_string()];
    assert_eq!(
        schema.resolve(&path).map(|entry| entry.descriptor().to_string()),
        Some("string.email".to_string())
    );
    assert_eq!(schema.get("user").map(|e| e.descriptor().to_string()), Some("object".to_string()));
}

#[test]
fn test_schema_from_json_errors() {
    assert_eq!(SchemaMap::from_json(&json!([1])), Err(SchemaError::NotAnObject));
    assert_eq!(
        SchemaMap::from_json(&json!({ "a": 5 })),
        Err(SchemaError::InvalidEntry("a".to_string()))
    );
    let err = SchemaMap::from_json(&json!({ "user": { "age": "numbr" } })).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidDescriptor { ref field, .. } if field == "user.age"));
}

#[test]
fn test_resolve_through_scalar_fails() {
    let schema = SchemaMap::new().field("x", "number").unwrap();
    assert!(schema.resolve(&["x".to_string(), "y".to_string()]).is_none());
}

// ============================================================================
// Validation
// ============================================================================

fn user_schema() -> SchemaMap {
    SchemaMap::new()
        .field("name", "string")
        .unwrap()
        .field("score", "0 <= number <= 100")
        .unwrap()
        .nested("user", SchemaMap::new().field("age", "number.integer").unwrap())
}

#[test]
fn test_valid_data() {
    let data = object(&[
        ("name", "ada".into()),
        ("score", Value::Integer(99)),
        ("user", object(&[("age", Value::Integer(36))])),
        ("extra", Value::Boolean(true)),
    ]);
    assert_eq!(validate(&data, &user_schema()), Ok(()));
}

#[test]
fn test_absent_fields_are_not_violations() {
    assert_eq!(validate(&object(&[]), &user_schema()), Ok(()));
}

#[test]
fn test_collects_every_violation() {
    let data = object(&[
        ("name", Value::Integer(1)),
        ("score", Value::Integer(101)),
        ("user", object(&[("age", Value::Float(3.5))])),
    ]);
    let violations = validate(&data, &user_schema()).unwrap_err();
    let rendered: Vec<String> = violations.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "name must be string (was 1)",
            "score must be 0 <= number <= 100 (was 101)",
            "user.age must be number.integer (was 3.5)",
        ]
    );
}

#[test]
fn test_nested_map_requires_object() {
    let data = object(&[("user", Value::Integer(3))]);
    let violations = validate(&data, &user_schema()).unwrap_err();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].path, "user");
    assert_eq!(violations[0].expected, "object");
}

#[test]
fn test_root_must_be_object() {
    let violations = validate(&Value::Null, &user_schema()).unwrap_err();
    assert_eq!(violations[0].path, "$");
}
