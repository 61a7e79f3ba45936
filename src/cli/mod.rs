//! CLI support for grammar-kit
//!
//! Provides programmatic access to the `grammar-kit` binary's commands over
//! the standard node library, for embedding in other tools.

mod check;
mod describe;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use describe::{describe_grammar, render_pattern};

use std::io;

use thiserror::Error;

use crate::{BuildError, EvalError, Location, ParseError, SchemaError};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("invalid grammar: {0}")]
    Build(#[from] BuildError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("no data provided; use --data or pipe JSON to stdin")]
    NoInput,
}

impl CliError {
    /// A caret diagnostic for positioned errors.
    pub fn diagnostic(&self, radius: usize) -> Option<String> {
        match self {
            CliError::Parse(e) => Some(render_caret(
                &e.kind().to_string(),
                e.message(),
                e.location(),
                radius,
            )),
            CliError::Eval(e) => {
                let mut out =
                    render_caret(&e.kind().to_string(), e.message(), e.location(), radius);
                for violation in e.violations() {
                    out.push_str(&format!("  = {violation}\n"));
                }
                Some(out)
            }
            _ => None,
        }
    }
}

/// Renders a located failure with the snippet and a caret under the column:
///
/// ```text
/// error[TypeMismatch]: `add` expects number, found string
///   --> line 1, column 5
///    |
///    | 1 + 'a'
///    |     ^
/// ```
pub fn render_caret(kind: &str, message: &str, location: &Location, radius: usize) -> String {
    let caret = (location.column - 1).min(radius);
    let mut out = format!(
        "error[{kind}]: {message}\n  --> line {}, column {}\n",
        location.line, location.column
    );
    if !location.snippet.is_empty() {
        out.push_str("   |\n");
        out.push_str(&format!("   | {}\n", location.snippet));
        out.push_str(&format!("   | {}^\n", " ".repeat(caret)));
    }
    out
}
