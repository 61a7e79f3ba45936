use std::collections::HashMap;

use tracing::debug;

use crate::{
    ast::{AstKind, AstNode, Binding},
    error::{ErrorKind, EvalError, Failure},
    grammar::{Args, Grammar},
    options::ParserOptions,
    parser::Parser,
    schema::{SchemaMap, Violation, validate},
    value::Value,
};

/// Everything one evaluation reads: caller data, the grammar holding the
/// eval rules, and the schema the data must satisfy.
///
/// Built per call and borrowed for its duration; nothing is retained.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    data: &'a Value,
    grammar: &'a Grammar,
    schema: &'a SchemaMap,
    /// Parsed source, for line/column/snippet in errors
    source: Option<&'a str>,
    options: ParserOptions,
}

impl<'a> EvalContext<'a> {
    pub fn new(parser: &'a Parser, schema: &'a SchemaMap, data: &'a Value) -> Self {
        EvalContext {
            data,
            grammar: parser.grammar(),
            schema,
            source: None,
            options: *parser.options(),
        }
    }

    pub fn with_grammar(grammar: &'a Grammar, schema: &'a SchemaMap, data: &'a Value) -> Self {
        EvalContext {
            data,
            grammar,
            schema,
            source: None,
            options: ParserOptions::default(),
        }
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn data(&self) -> &'a Value {
        self.data
    }

    pub fn schema(&self) -> &'a SchemaMap {
        self.schema
    }

    fn error(&self, failure: Failure) -> EvalError {
        debug!(kind = %failure.kind, offset = failure.offset, "evaluation failed");
        EvalError::from_failure(failure, self.source, self.options.snippet_radius)
    }
}

/// Evaluates `ast` against the context's data.
///
/// The data is validated against the schema and every field the expression
/// reads is checked for presence before any eval rule runs, so a rule never
/// sees data of the wrong shape.
pub fn evaluate(ast: &AstNode, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    debug!(expression = %ast, "evaluating");

    if let Err(violations) = validate(ctx.data, ctx.schema) {
        let offset = violation_offset(ast, &violations);
        let summary: Vec<String> = violations.iter().map(ToString::to_string).collect();
        let failure = Failure::new(
            ErrorKind::DataTypeViolation,
            offset,
            format!("data does not match schema: {}", summary.join("; ")),
        );
        return Err(ctx.error(failure).with_violations(violations));
    }

    for (path, span) in ast.identifiers() {
        if ctx.data.lookup(path).is_some() {
            continue;
        }
        let admits_undefined = ctx
            .schema
            .resolve(path)
            .is_some_and(|entry| entry.descriptor().admits(&Value::Undefined));
        if !admits_undefined {
            return Err(ctx.error(Failure::new(
                ErrorKind::MissingData,
                span.start,
                format!("missing data for `{}`", path.join(".")),
            )));
        }
    }

    eval_node(ast, ctx).map_err(|failure| ctx.error(failure))
}

fn eval_node(node: &AstNode, ctx: &EvalContext<'_>) -> Result<Value, Failure> {
    match node.kind() {
        AstKind::Literal(value) => Ok(value.clone()),
        AstKind::Identifier(path) => Ok(ctx.data.lookup(path).cloned().unwrap_or(Value::Undefined)),
        AstKind::Node { name, bindings } => {
            let offset = node.span().start;
            let Some(definition) = ctx.grammar.node(name) else {
                return Err(Failure::new(
                    ErrorKind::NotImplemented,
                    offset,
                    format!("no node named `{name}` in this grammar"),
                ));
            };
            let Some(rule) = &definition.eval_rule else {
                return Err(Failure::new(
                    ErrorKind::NotImplemented,
                    offset,
                    format!("`{name}` has no eval rule"),
                ));
            };

            let mut values = HashMap::with_capacity(bindings.len());
            for (key, binding) in bindings {
                let value = match binding {
                    Binding::Node(child) => eval_node(child, ctx)?,
                    Binding::Literal(value) => value.clone(),
                };
                values.insert(key.clone(), value);
            }

            rule(&Args::new(values))
                .map_err(|e| Failure::new(ErrorKind::RuleFailed, offset, format!("`{name}`: {e}")))
        }
    }
}

/// Offset of the first identifier that reads a violating field, else the
/// start of the expression.
fn violation_offset(ast: &AstNode, violations: &[Violation]) -> usize {
    let reads = |path: &[String], violation: &Violation| {
        let dotted = path.join(".");
        dotted == violation.path
            || dotted.starts_with(&format!("{}.", violation.path))
            || violation.path.starts_with(&format!("{dotted}."))
    };
    ast.identifiers()
        .into_iter()
        .find(|(path, _)| violations.iter().any(|v| reads(*path, v)))
        .map_or(ast.span().start, |(_, span)| span.start)
}
