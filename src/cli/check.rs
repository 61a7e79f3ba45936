//! Parse and evaluate one expression with the standard node library

use tracing::debug;

use super::CliError;
use crate::{EvalContext, ParserOptions, SchemaMap, Value, evaluate, library};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to check
    pub expression: String,
    /// Schema JSON, `{ "field": "descriptor" | { ... } }`
    pub schema: Option<String>,
    /// Data JSON
    pub data: Option<String>,
    /// Only parse, don't evaluate
    pub syntax_only: bool,
    /// Overrides the parser's nesting limit
    pub max_depth: Option<usize>,
}

/// Result of a check operation
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// The expression parsed; carries its output schema
    SyntaxValid { output_schema: String },
    /// The expression evaluated to a JSON value
    Success(serde_json::Value),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let mut parser_options = ParserOptions::default();
    if let Some(max_depth) = options.max_depth {
        parser_options = parser_options.with_max_depth(max_depth);
    }
    let parser = library::standard_parser()?.with_options(parser_options);

    let schema = match &options.schema {
        Some(text) => SchemaMap::from_json(&serde_json::from_str(text)?)?,
        None => SchemaMap::new(),
    };
    debug!(fields = schema.len(), "loaded schema");

    let ast = parser.parse_complete(&options.expression, &schema)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid {
            output_schema: ast.output_schema().to_string(),
        });
    }

    let data = match (&options.data, schema.is_empty()) {
        (Some(text), _) => serde_json::from_str::<serde_json::Value>(text)?.into(),
        (None, true) => Value::Object(Default::default()),
        (None, false) => return Err(CliError::NoInput),
    };

    let ctx = EvalContext::new(&parser, &schema, &data).with_source(&options.expression);
    let result = evaluate(&ast, &ctx)?;
    Ok(CheckResult::Success(result.into()))
}
