use std::fmt;

use super::map::{SchemaEntry, SchemaMap};
use crate::Value;

/// A single mismatch between caller data and the declared schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted field path
    pub path: String,
    /// The descriptor the value had to satisfy
    pub expected: String,
    /// Short description of the offending value
    pub found: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} must be {} (was {})", self.path, self.expected, self.found)
    }
}

/// Checks `data` against `schema`, collecting every violation.
///
/// Fields absent from `data` are not violations; the evaluator reports them
/// as missing data only when an expression actually reads them.
pub fn validate(data: &Value, schema: &SchemaMap) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    validate_at(data, schema, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn validate_at(data: &Value, schema: &SchemaMap, prefix: &str, out: &mut Vec<Violation>) {
    let Value::Object(fields) = data else {
        out.push(Violation {
            path: if prefix.is_empty() { "$".to_string() } else { prefix.to_string() },
            expected: "object".to_string(),
            found: describe(data),
        });
        return;
    };

    for (name, entry) in schema.iter() {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        let Some(value) = fields.get(name) else {
            continue;
        };
        match entry {
            SchemaEntry::Type(descriptor) => {
                if !descriptor.admits(value) {
                    out.push(Violation {
                        path,
                        expected: descriptor.to_string(),
                        found: describe(value),
                    });
                }
            }
            SchemaEntry::Nested(inner) => validate_at(value, inner, &path, out),
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Integer(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::String(s) if s.chars().count() <= 24 => format!("{s:?}"),
        Value::Boolean(b) => b.to_string(),
        other => other.kind_name().to_string(),
    }
}
