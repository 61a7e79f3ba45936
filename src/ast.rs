//! # Abstract Syntax Tree
//!
//! Parsing produces a tree of [`AstNode`]s. Every node carries the name of
//! the definition that matched (or a built-in literal/identifier form), its
//! named bindings, its resolved output schema and its source span.
//!
//! Nodes are immutable once built. The evaluator borrows them and dispatches
//! on the node name through the grammar's side table; the tree itself holds
//! no behavior.
//!
//! `Display` renders a compact s-expression, handy in tests and logs:
//!
//! ```text
//! add(left: 1, right: mul(left: 2, right: 3))
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::schema::TypeDescriptor;
use crate::value::Value;

/// Byte range in the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The value captured by a named pattern element.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Node(AstNode),
    /// A literal matcher's decoded value; passed to eval rules unchanged
    Literal(Value),
}

impl Binding {
    pub fn output_schema(&self) -> TypeDescriptor {
        match self {
            Binding::Node(node) => node.output_schema.clone(),
            Binding::Literal(value) => TypeDescriptor::of_value(value),
        }
    }

    pub fn as_node(&self) -> Option<&AstNode> {
        match self {
            Binding::Node(node) => Some(node),
            Binding::Literal(_) => None,
        }
    }
}

pub type Bindings = BTreeMap<String, Binding>;

#[derive(Debug, Clone, PartialEq)]
pub enum AstKind {
    /// Number, string or keyword literal
    Literal(Value),

    /// Schema field reference; more than one segment for dotted paths
    Identifier(Vec<String>),

    /// A match of a registry definition
    Node { name: String, bindings: Bindings },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    kind: AstKind,
    output_schema: TypeDescriptor,
    span: Span,
    depth: usize,
}

impl AstNode {
    pub(crate) fn literal(value: Value, span: Span) -> Self {
        let output_schema = TypeDescriptor::of_value(&value);
        AstNode {
            kind: AstKind::Literal(value),
            output_schema,
            span,
            depth: 1,
        }
    }

    pub(crate) fn identifier(path: Vec<String>, output_schema: TypeDescriptor, span: Span) -> Self {
        AstNode {
            kind: AstKind::Identifier(path),
            output_schema,
            span,
            depth: 1,
        }
    }

    pub(crate) fn node(
        name: String,
        bindings: Bindings,
        output_schema: TypeDescriptor,
        span: Span,
    ) -> Self {
        let depth = 1 + bindings
            .values()
            .filter_map(Binding::as_node)
            .map(AstNode::depth)
            .max()
            .unwrap_or(0);
        AstNode {
            kind: AstKind::Node { name, bindings },
            output_schema,
            span,
            depth,
        }
    }

    /// The same node covering `span`; used to widen a parenthesized
    /// expression over its parentheses.
    pub(crate) fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn kind(&self) -> &AstKind {
        &self.kind
    }

    pub fn output_schema(&self) -> &TypeDescriptor {
        &self.output_schema
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Definition name of a registry node; `None` for literals and identifiers.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            AstKind::Node { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        match &self.kind {
            AstKind::Node { bindings, .. } => bindings.get(name),
            _ => None,
        }
    }

    /// Child node bound under `name`.
    pub fn child(&self, name: &str) -> Option<&AstNode> {
        self.binding(name).and_then(Binding::as_node)
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match &self.kind {
            AstKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Every identifier in the tree with its span, in source order.
    pub fn identifiers(&self) -> Vec<(&[String], Span)> {
        let mut found = Vec::new();
        self.collect_identifiers(&mut found);
        found.sort_by_key(|(_, span)| span.start);
        found
    }

    fn collect_identifiers<'a>(&'a self, found: &mut Vec<(&'a [String], Span)>) {
        match &self.kind {
            AstKind::Identifier(path) => found.push((path, self.span)),
            AstKind::Node { bindings, .. } => {
                for binding in bindings.values() {
                    if let Binding::Node(child) = binding {
                        child.collect_identifiers(found);
                    }
                }
            }
            AstKind::Literal(_) => {}
        }
    }

    /// Nesting depth; a leaf has depth 1. Fixed when the node is built, so
    /// reading it never walks the tree.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "{s:?}"),
        Value::Integer(n) => write!(f, "{n}"),
        Value::Float(n) => write!(f, "{n:?}"),
        Value::Boolean(b) => write!(f, "{b}"),
        other => write!(f, "{}", other.kind_name()),
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AstKind::Literal(value) => fmt_value(f, value),
            AstKind::Identifier(path) => write!(f, "{}", path.join(".")),
            AstKind::Node { name, bindings } => {
                write!(f, "{name}(")?;
                for (i, (key, binding)) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: ")?;
                    match binding {
                        Binding::Node(node) => write!(f, "{node}")?,
                        Binding::Literal(value) => fmt_value(f, value)?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}
