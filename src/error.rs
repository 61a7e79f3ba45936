//! Positioned diagnostics for parse and evaluation failures.
//!
//! The parser and evaluator raise raw failures carrying a byte offset. They
//! are turned into [`ParseError`] / [`EvalError`] against the source text,
//! which adds the 1-based line and column and a snippet of the surrounding
//! line. Rendering (carets, colors) is left to callers.

use std::fmt;

use thiserror::Error;

use crate::schema::Violation;

/// Failure taxonomy shared by parsing and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No atom or node matched at the position
    NoMatch,
    /// An operand matched but violated a declared type constraint
    TypeMismatch,
    /// A string literal was not closed before end of input
    UnterminatedString,
    /// An unknown escape sequence inside a string literal
    InvalidEscape,
    /// A `(` without its `)`, or a stray `)`
    UnbalancedParen,
    /// An identifier absent from the schema
    UnknownIdentifier,
    /// Sub-expressions nested deeper than the configured limit
    NestingTooDeep,
    /// A field the expression reads is absent from the data
    MissingData,
    /// Data does not satisfy the schema
    DataTypeViolation,
    /// The node has no eval rule
    NotImplemented,
    /// An eval rule returned an error
    RuleFailed,
}

impl ErrorKind {
    /// Failures that end a parse even inside a speculative alternative.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::UnterminatedString | ErrorKind::InvalidEscape | ErrorKind::NestingTooDeep
        )
    }

    pub(crate) fn specificity(self) -> u8 {
        match self {
            ErrorKind::NoMatch => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoMatch => "NoMatch",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::UnterminatedString => "UnterminatedString",
            ErrorKind::InvalidEscape => "InvalidEscape",
            ErrorKind::UnbalancedParen => "UnbalancedParen",
            ErrorKind::UnknownIdentifier => "UnknownIdentifier",
            ErrorKind::NestingTooDeep => "NestingTooDeep",
            ErrorKind::MissingData => "MissingData",
            ErrorKind::DataTypeViolation => "DataTypeViolation",
            ErrorKind::NotImplemented => "NotImplemented",
            ErrorKind::RuleFailed => "RuleFailed",
        };
        f.write_str(name)
    }
}

/// Where a failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Byte offset into the source
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
    /// The surrounding source line, clipped around the column
    pub snippet: String,
}

impl Location {
    pub fn locate(source: &str, offset: usize, radius: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }

        let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[offset..].find('\n').map_or(source.len(), |i| offset + i);
        let line = source[..line_start].matches('\n').count() + 1;
        let column = source[line_start..offset].chars().count() + 1;

        let text = &source[line_start..line_end];
        let skip = (column - 1).saturating_sub(radius);
        let snippet: String = text
            .chars()
            .skip(skip)
            .take(radius * 2 + 1)
            .collect();

        Location {
            offset,
            line,
            column,
            snippet,
        }
    }

    /// A location without source text to measure against.
    pub fn bare(offset: usize) -> Self {
        Location {
            offset,
            line: 1,
            column: offset + 1,
            snippet: String::new(),
        }
    }
}

/// An unlocated failure raised while parsing or evaluating.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    pub offset: usize,
}

impl Failure {
    pub fn new(kind: ErrorKind, offset: usize, message: impl Into<String>) -> Self {
        Failure {
            kind,
            message: message.into(),
            offset,
        }
    }

    /// Whether `self` should be reported instead of `other`.
    pub fn outranks(&self, other: &Failure) -> bool {
        self.offset > other.offset
            || (self.offset == other.offset && self.kind.specificity() > other.kind.specificity())
    }
}

/// A failed parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    kind: ErrorKind,
    message: String,
    location: Location,
}

impl ParseError {
    pub(crate) fn from_failure(failure: Failure, source: &str, radius: usize) -> Self {
        ParseError {
            kind: failure.kind,
            message: failure.message,
            location: Location::locate(source, failure.offset, radius),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn offset(&self) -> usize {
        self.location.offset
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    pub fn column(&self) -> usize {
        self.location.column
    }

    pub fn snippet(&self) -> &str {
        &self.location.snippet
    }
}

/// A failed evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at line {}, column {}: {message}", .location.line, .location.column)]
pub struct EvalError {
    kind: ErrorKind,
    message: String,
    location: Location,
    violations: Vec<Violation>,
}

impl EvalError {
    pub(crate) fn from_failure(failure: Failure, source: Option<&str>, radius: usize) -> Self {
        let location = match source {
            Some(source) => Location::locate(source, failure.offset, radius),
            None => Location::bare(failure.offset),
        };
        EvalError {
            kind: failure.kind,
            message: failure.message,
            location,
            violations: Vec::new(),
        }
    }

    pub(crate) fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn offset(&self) -> usize {
        self.location.offset
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    pub fn column(&self) -> usize {
        self.location.column
    }

    pub fn snippet(&self) -> &str {
        &self.location.snippet
    }

    /// Every schema violation, for `DataTypeViolation` errors.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

#[test]
fn test_locate_second_line() {
    let location = Location::locate("1 +\n  foo", 6, 40);
    assert_eq!(location.line, 2);
    assert_eq!(location.column, 3);
    assert_eq!(location.snippet, "  foo");
}
