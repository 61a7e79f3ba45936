// tests/cli_tests.rs

use grammar_kit::cli::{self, CheckOptions, CheckResult, CliError};
use grammar_kit::{ErrorKind, NodeDefinition, PatternElement, Precedence, library};
use pretty_assertions::assert_eq;
use serde_json::json;

fn check(
    expression: &str,
    schema: Option<&str>,
    data: Option<&str>,
) -> Result<CheckResult, CliError> {
    cli::execute_check(&CheckOptions {
        expression: expression.to_string(),
        schema: schema.map(str::to_string),
        data: data.map(str::to_string),
        ..Default::default()
    })
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_evaluates() {
    let result = check(
        "price * qty",
        Some(r#"{"price": "number", "qty": "number.integer"}"#),
        Some(r#"{"price": 2.5, "qty": 4}"#),
    )
    .unwrap();
    assert_eq!(result, CheckResult::Success(json!(10)));
}

#[test]
fn test_check_without_schema_needs_no_data() {
    let result = check("'a' + 'b'", None, None).unwrap();
    assert_eq!(result, CheckResult::Success(json!("ab")));
}

#[test]
fn test_check_undefined_becomes_null() {
    let result = check("undefined", None, None).unwrap();
    assert_eq!(result, CheckResult::Success(json!(null)));
}

#[test]
fn test_syntax_only() {
    let result = cli::execute_check(&CheckOptions {
        expression: "flag ? 1 : 'x'".to_string(),
        schema: Some(r#"{"flag": "boolean"}"#.to_string()),
        syntax_only: true,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(
        result,
        CheckResult::SyntaxValid {
            output_schema: "number | string".to_string()
        }
    );
}

#[test]
fn test_missing_data_input() {
    let err = check("x + 1", Some(r#"{"x": "number"}"#), None).unwrap_err();
    assert!(matches!(err, CliError::NoInput));
}

#[test]
fn test_invalid_json() {
    let err = check("x", Some("{not json"), None).unwrap_err();
    assert!(matches!(err, CliError::Json(_)));
}

#[test]
fn test_invalid_schema() {
    let err = check("x", Some(r#"{"x": "numbr"}"#), None).unwrap_err();
    assert!(matches!(err, CliError::Schema(_)));
}

#[test]
fn test_max_depth_option() {
    let err = cli::execute_check(&CheckOptions {
        expression: format!("{}1{}", "(".repeat(10), ")".repeat(10)),
        max_depth: Some(4),
        ..Default::default()
    })
    .unwrap_err();
    match err {
        CliError::Parse(e) => assert_eq!(e.kind(), ErrorKind::NestingTooDeep),
        other => panic!("expected a parse error, got {other}"),
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_parse_diagnostic_has_caret() {
    let err = check("1 + y", Some(r#"{"x": "number"}"#), Some("{}")).unwrap_err();
    let diagnostic = err.diagnostic(40).unwrap();
    assert_eq!(
        diagnostic,
        concat!(
            "error[UnknownIdentifier]: unknown identifier `y`\n",
            "  --> line 1, column 5\n",
            "   |\n",
            "   | 1 + y\n",
            "   |     ^\n",
        )
    );
}

#[test]
fn test_eval_diagnostic_lists_violations() {
    let err = check("x + 1", Some(r#"{"x": "number"}"#), Some(r#"{"x": "one"}"#)).unwrap_err();
    let diagnostic = err.diagnostic(40).unwrap();
    assert!(diagnostic.starts_with("error[DataTypeViolation]"));
    assert!(diagnostic.ends_with("  = x must be number (was \"one\")\n"), "{diagnostic}");
}

#[test]
fn test_other_errors_have_no_diagnostic() {
    assert!(CliError::NoInput.diagnostic(40).is_none());
}

// ============================================================================
// grammar listing
// ============================================================================

#[test]
fn test_describe_standard_grammar() {
    let parser = library::standard_parser().unwrap();
    let listing = cli::describe_grammar(parser.grammar());
    assert!(listing.starts_with("level 1\n"));
    assert!(listing.contains("level 9\n"));
    assert!(listing.contains(r#"lhs:number as left "+" lhs:number as right  -> number"#));
    assert!(!listing.contains("level atom"));
}

#[test]
fn test_render_pattern() {
    let node = NodeDefinition::new(
        "range",
        Precedence::Atom,
        vec![
            PatternElement::text("range"),
            PatternElement::number().bind("from"),
            PatternElement::optional(vec![PatternElement::text(".."), PatternElement::number()]),
        ],
    );
    assert_eq!(cli::render_pattern(&node.pattern), r#""range" number as from [".." number]"#);
}
