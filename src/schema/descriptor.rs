use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::Value;

/// A parsed type descriptor.
///
/// Descriptors are written as strings (`"number >= 0"`, `"string.email"`,
/// `"(number | string)[]"`) and are used both for schema fields and for the
/// output schema of parsed nodes. [`fmt::Display`] renders the canonical
/// spelling, which is what [`crate::AstNode::output_schema`] reports.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// The `unknown` sentinel. Accepts every value.
    Unknown,

    /// A primitive kind with an optional subtype and bounds
    Primitive(Primitive),

    /// A literal unit type such as `'asc'`, `42` or `true`
    Literal(Value),

    /// `T[]`, with optional length bounds
    Array {
        element: Box<TypeDescriptor>,
        length: Bounds,
    },

    /// `A | B | ...`. Never nested and never shorter than two members.
    Union(Vec<TypeDescriptor>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Number,
    String,
    Boolean,
    Null,
    Undefined,
    Object,
}

impl Kind {
    fn keyword(self) -> &'static str {
        match self {
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Boolean => "boolean",
            Kind::Null => "null",
            Kind::Undefined => "undefined",
            Kind::Object => "object",
        }
    }

    fn bounded(self) -> bool {
        matches!(self, Kind::Number | Kind::String)
    }
}

/// Refinements written as `kind.subtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtype {
    Integer,
    Email,
    Url,
    Uuid,
    Date,
    Alpha,
    Alphanumeric,
}

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+\S*$").unwrap());
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});
static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").unwrap());
static ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]*$").unwrap());
static ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]*$").unwrap());

impl Subtype {
    fn from_name(kind: Kind, name: &str) -> Option<Subtype> {
        match (kind, name) {
            (Kind::Number, "integer") => Some(Subtype::Integer),
            (Kind::String, "email") => Some(Subtype::Email),
            (Kind::String, "url") => Some(Subtype::Url),
            (Kind::String, "uuid") => Some(Subtype::Uuid),
            (Kind::String, "date") => Some(Subtype::Date),
            (Kind::String, "alpha") => Some(Subtype::Alpha),
            (Kind::String, "alphanumeric") => Some(Subtype::Alphanumeric),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Subtype::Integer => "integer",
            Subtype::Email => "email",
            Subtype::Url => "url",
            Subtype::Uuid => "uuid",
            Subtype::Date => "date",
            Subtype::Alpha => "alpha",
            Subtype::Alphanumeric => "alphanumeric",
        }
    }

    fn pattern(self) -> Option<&'static Regex> {
        match self {
            Subtype::Integer => None,
            Subtype::Email => Some(&EMAIL),
            Subtype::Url => Some(&URL),
            Subtype::Uuid => Some(&UUID),
            Subtype::Date => Some(&DATE),
            Subtype::Alpha => Some(&ALPHA),
            Subtype::Alphanumeric => Some(&ALPHANUMERIC),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub limit: f64,
    pub inclusive: bool,
}

/// Lower/upper limits on a number's value or a string's/array's length.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn admits(&self, x: f64) -> bool {
        let above = self
            .lower
            .is_none_or(|b| x > b.limit || (x == b.limit && b.inclusive));
        let below = self
            .upper
            .is_none_or(|b| x < b.limit || (x == b.limit && b.inclusive));
        above && below
    }

    /// Every quantity admitted by `other` is admitted by `self`.
    pub fn implied_by(&self, other: &Bounds) -> bool {
        let lower = match (self.lower, other.lower) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => {
                b.limit > a.limit || (b.limit == a.limit && (a.inclusive || !b.inclusive))
            }
        };
        let upper = match (self.upper, other.upper) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => {
                b.limit < a.limit || (b.limit == a.limit && (a.inclusive || !b.inclusive))
            }
        };
        lower && upper
    }

    fn fmt_around(&self, f: &mut fmt::Formatter<'_>, base: &str) -> fmt::Result {
        match (self.lower, self.upper) {
            (None, None) => write!(f, "{base}"),
            (Some(l), Some(u)) if l == u && l.inclusive => {
                write!(f, "{base} == {}", fmt_number(l.limit))
            }
            (Some(l), Some(u)) => write!(
                f,
                "{} {} {base} {} {}",
                fmt_number(l.limit),
                if l.inclusive { "<=" } else { "<" },
                if u.inclusive { "<=" } else { "<" },
                fmt_number(u.limit)
            ),
            (Some(l), None) => write!(
                f,
                "{base} {} {}",
                if l.inclusive { ">=" } else { ">" },
                fmt_number(l.limit)
            ),
            (None, Some(u)) => write!(
                f,
                "{base} {} {}",
                if u.inclusive { "<=" } else { "<" },
                fmt_number(u.limit)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: Kind,
    pub subtype: Option<Subtype>,
    pub bounds: Bounds,
}

impl Primitive {
    pub fn plain(kind: Kind) -> Self {
        Primitive {
            kind,
            subtype: None,
            bounds: Bounds::default(),
        }
    }

    fn admits(&self, value: &Value) -> bool {
        match self.kind {
            Kind::Number => {
                let Some(n) = value.as_float() else {
                    return false;
                };
                let integral = match value {
                    Value::Integer(_) => true,
                    _ => n.fract() == 0.0,
                };
                (self.subtype != Some(Subtype::Integer) || integral) && self.bounds.admits(n)
            }
            Kind::String => {
                let Some(s) = value.as_str() else {
                    return false;
                };
                let pattern_ok = self
                    .subtype
                    .and_then(Subtype::pattern)
                    .is_none_or(|re| re.is_match(s));
                pattern_ok && self.bounds.admits(s.chars().count() as f64)
            }
            Kind::Boolean => matches!(value, Value::Boolean(_)),
            Kind::Null => matches!(value, Value::Null),
            Kind::Undefined => matches!(value, Value::Undefined),
            Kind::Object => matches!(value, Value::Object(_)),
        }
    }
}

/// Error returned when a descriptor string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type descriptor `{text}` at offset {offset}: {reason}")]
pub struct DescriptorError {
    pub text: String,
    pub offset: usize,
    pub reason: String,
}

impl TypeDescriptor {
    pub fn parse(text: &str) -> Result<TypeDescriptor, DescriptorError> {
        let mut parser = DescriptorParser { text, pos: 0 };
        let descriptor = parser.union()?;
        parser.skip_whitespace();
        if parser.pos < text.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(descriptor)
    }

    pub fn primitive(kind: Kind) -> Self {
        TypeDescriptor::Primitive(Primitive::plain(kind))
    }

    pub fn number() -> Self {
        Self::primitive(Kind::Number)
    }

    pub fn string() -> Self {
        Self::primitive(Kind::String)
    }

    pub fn boolean() -> Self {
        Self::primitive(Kind::Boolean)
    }

    pub fn object() -> Self {
        Self::primitive(Kind::Object)
    }

    /// Builds a union, flattening nested unions. One member collapses to itself.
    pub fn union(members: Vec<TypeDescriptor>) -> Self {
        let mut flat = Vec::with_capacity(members.len());
        for member in members {
            match member {
                TypeDescriptor::Union(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => TypeDescriptor::Unknown,
            1 => flat.remove(0),
            _ => TypeDescriptor::Union(flat),
        }
    }

    /// The descriptor a literal value carries as an output schema.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::primitive(Kind::Null),
            Value::Undefined => Self::primitive(Kind::Undefined),
            Value::Boolean(_) => Self::boolean(),
            Value::Integer(_) | Value::Float(_) => Self::number(),
            Value::String(_) => Self::string(),
            Value::Array(_) => TypeDescriptor::Array {
                element: Box::new(TypeDescriptor::Unknown),
                length: Bounds::default(),
            },
            Value::Object(_) => Self::object(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeDescriptor::Unknown)
    }

    /// Members of a union, or the descriptor itself.
    pub fn members(&self) -> &[TypeDescriptor] {
        match self {
            TypeDescriptor::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    /// Whether a runtime value satisfies this descriptor.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            TypeDescriptor::Unknown => true,
            TypeDescriptor::Primitive(p) => p.admits(value),
            TypeDescriptor::Literal(expected) => expected.same_as(value),
            TypeDescriptor::Array { element, length } => match value {
                Value::Array(items) => {
                    length.admits(items.len() as f64) && items.iter().all(|v| element.admits(v))
                }
                _ => false,
            },
            TypeDescriptor::Union(members) => members.iter().any(|m| m.admits(value)),
        }
    }

    /// Whether every value described by `other` is described by `self`.
    ///
    /// An `unknown` on either side is accepted: nothing can be proven about
    /// it at parse time.
    pub fn accepts(&self, other: &TypeDescriptor) -> bool {
        use TypeDescriptor::*;
        match (self, other) {
            (Unknown, _) | (_, Unknown) => true,
            (_, Union(members)) => members.iter().all(|m| self.accepts(m)),
            (Union(members), o) => members.iter().any(|m| m.accepts(o)),
            (Primitive(p), Primitive(q)) => {
                p.kind == q.kind
                    && (p.subtype.is_none() || p.subtype == q.subtype)
                    && p.bounds.implied_by(&q.bounds)
            }
            (Primitive(p), Literal(v)) => p.admits(v),
            (Literal(a), Literal(b)) => a.same_as(b),
            (
                Array { element, length },
                Array {
                    element: other_element,
                    length: other_length,
                },
            ) => element.accepts(other_element) && length.implied_by(other_length),
            _ => false,
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeDescriptor::parse(s)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Unknown => write!(f, "unknown"),
            TypeDescriptor::Primitive(p) => {
                let base = match p.subtype {
                    Some(sub) => format!("{}.{}", p.kind.keyword(), sub.name()),
                    None => p.kind.keyword().to_string(),
                };
                p.bounds.fmt_around(f, &base)
            }
            TypeDescriptor::Literal(value) => fmt_literal(f, value),
            TypeDescriptor::Array { element, length } => {
                let grouped = match element.as_ref() {
                    TypeDescriptor::Union(_) => true,
                    TypeDescriptor::Primitive(p) => !p.bounds.is_empty(),
                    TypeDescriptor::Array { length, .. } => !length.is_empty(),
                    _ => false,
                };
                let base = if grouped {
                    format!("({element})[]")
                } else {
                    format!("{element}[]")
                };
                length.fmt_around(f, &base)
            }
            TypeDescriptor::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn fmt_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => {
            write!(f, "'")?;
            for ch in s.chars() {
                match ch {
                    '\'' => write!(f, "\\'")?,
                    '\\' => write!(f, "\\\\")?,
                    c => write!(f, "{c}")?,
                }
            }
            write!(f, "'")
        }
        Value::Integer(n) => write!(f, "{n}"),
        Value::Float(n) => write!(f, "{}", fmt_number(*n)),
        Value::Boolean(b) => write!(f, "{b}"),
        other => write!(f, "{}", other.kind_name()),
    }
}

#[derive(Clone, Copy)]
enum BoundOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

struct DescriptorParser<'a> {
    text: &'a str,
    pos: usize,
}

impl DescriptorParser<'_> {
    fn error(&self, reason: &str) -> DescriptorError {
        DescriptorError {
            text: self.text.to_string(),
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn union(&mut self) -> Result<TypeDescriptor, DescriptorError> {
        let mut members = vec![self.term()?];
        while self.eat("|") {
            members.push(self.term()?);
        }
        Ok(TypeDescriptor::union(members))
    }

    fn starts_number(&self) -> bool {
        let mut chars = self.rest().chars();
        match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn term(&mut self) -> Result<TypeDescriptor, DescriptorError> {
        self.skip_whitespace();
        if self.starts_number() {
            let (limit, literal) = self.number()?;
            self.skip_whitespace();
            let Some(op) = self.bound_op() else {
                return Ok(TypeDescriptor::Literal(literal));
            };
            let lower_inclusive = match op {
                BoundOp::Lt => false,
                BoundOp::Le => true,
                _ => return Err(self.error("range bounds must use `<` or `<=`")),
            };
            let mut base = self.postfix()?;
            set_bound(
                &mut base,
                Bound {
                    limit,
                    inclusive: lower_inclusive,
                },
                true,
            )
            .map_err(|reason| self.error(reason))?;
            self.skip_whitespace();
            match self.bound_op() {
                Some(op @ (BoundOp::Lt | BoundOp::Le)) => {
                    let inclusive = matches!(op, BoundOp::Le);
                    self.skip_whitespace();
                    let (upper, _) = self.number()?;
                    set_bound(&mut base, Bound { limit: upper, inclusive }, false)
                        .map_err(|reason| self.error(reason))?;
                }
                Some(_) => return Err(self.error("range bounds must use `<` or `<=`")),
                None => {}
            }
            return Ok(base);
        }

        let mut base = self.postfix()?;
        self.skip_whitespace();
        if let Some(op) = self.bound_op() {
            self.skip_whitespace();
            let (limit, _) = self.number()?;
            let result = match op {
                BoundOp::Gt => set_bound(&mut base, Bound { limit, inclusive: false }, true),
                BoundOp::Ge => set_bound(&mut base, Bound { limit, inclusive: true }, true),
                BoundOp::Lt => set_bound(&mut base, Bound { limit, inclusive: false }, false),
                BoundOp::Le => set_bound(&mut base, Bound { limit, inclusive: true }, false),
                BoundOp::Eq => set_bound(&mut base, Bound { limit, inclusive: true }, true)
                    .and_then(|_| set_bound(&mut base, Bound { limit, inclusive: true }, false)),
            };
            result.map_err(|reason| self.error(reason))?;
        }
        Ok(base)
    }

    fn bound_op(&mut self) -> Option<BoundOp> {
        let op = [
            ("<=", BoundOp::Le),
            (">=", BoundOp::Ge),
            ("==", BoundOp::Eq),
            ("<", BoundOp::Lt),
            (">", BoundOp::Gt),
        ]
        .into_iter()
        .find(|(text, _)| self.rest().starts_with(text))?;
        self.pos += op.0.len();
        Some(op.1)
    }

    fn postfix(&mut self) -> Result<TypeDescriptor, DescriptorError> {
        let mut base = self.primary()?;
        while self.eat("[]") {
            base = TypeDescriptor::Array {
                element: Box::new(base),
                length: Bounds::default(),
            };
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<TypeDescriptor, DescriptorError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.union()?;
                if !self.eat(")") {
                    return Err(self.error("expected `)`"));
                }
                Ok(inner)
            }
            Some(quote @ ('\'' | '"')) => self.quoted(quote),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            Some(_) if self.starts_number() => {
                let (_, literal) = self.number()?;
                Ok(TypeDescriptor::Literal(literal))
            }
            Some(_) => Err(self.error("expected a type")),
            None => Err(self.error("unexpected end of descriptor")),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<TypeDescriptor, DescriptorError> {
        let text = self.text;
        let body_start = self.pos + quote.len_utf8();
        let mut literal = String::new();
        let mut escaped = false;
        let mut end = None;
        for (i, ch) in text[body_start..].char_indices() {
            if escaped {
                literal.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                end = Some(body_start + i + ch.len_utf8());
                break;
            } else {
                literal.push(ch);
            }
        }
        match end {
            Some(end) => {
                self.pos = end;
                Ok(TypeDescriptor::Literal(Value::String(literal)))
            }
            None => Err(self.error("unterminated string literal")),
        }
    }

    fn keyword(&mut self) -> Result<TypeDescriptor, DescriptorError> {
        let text = self.text;
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_'))
            .unwrap_or(self.rest().len());
        let word = &text[start..start + len];
        let (head, sub) = match word.split_once('.') {
            Some((head, sub)) => (head, Some(sub)),
            None => (word, None),
        };
        let kind = match head {
            "unknown" if sub.is_none() => {
                self.pos += len;
                return Ok(TypeDescriptor::Unknown);
            }
            "true" | "false" if sub.is_none() => {
                self.pos += len;
                return Ok(TypeDescriptor::Literal(Value::Boolean(head == "true")));
            }
            "number" => Kind::Number,
            "string" => Kind::String,
            "boolean" => Kind::Boolean,
            "null" => Kind::Null,
            "undefined" => Kind::Undefined,
            "object" => Kind::Object,
            _ => return Err(self.error(&format!("unknown type `{word}`"))),
        };
        let subtype = match sub {
            Some(name) => Some(
                Subtype::from_name(kind, name)
                    .ok_or_else(|| self.error(&format!("unknown subtype `{word}`")))?,
            ),
            None => None,
        };
        self.pos += len;
        Ok(TypeDescriptor::Primitive(Primitive {
            kind,
            subtype,
            bounds: Bounds::default(),
        }))
    }

    fn number(&mut self) -> Result<(f64, Value), DescriptorError> {
        let source = self.text;
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
            .map_or(self.rest().len(), |(i, _)| i);
        let text = &source[start..start + len];
        let value: f64 = text.parse().map_err(|_| self.error("invalid number"))?;
        self.pos += len;
        let literal = match text.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Float(value),
        };
        Ok((value, literal))
    }
}

fn set_bound(target: &mut TypeDescriptor, bound: Bound, lower: bool) -> Result<(), &'static str> {
    let bounds = match target {
        TypeDescriptor::Primitive(p) if p.kind.bounded() => &mut p.bounds,
        TypeDescriptor::Array { length, .. } => length,
        _ => return Err("bounds apply only to number, string and array types"),
    };
    let slot = if lower {
        &mut bounds.lower
    } else {
        &mut bounds.upper
    };
    if slot.is_some() {
        return Err("duplicate bound");
    }
    *slot = Some(bound);
    Ok(())
}

#[test]
fn test_canonical_spelling() {
    for text in [
        "number",
        "number >= 0",
        "0 <= number < 100",
        "string.email",
        "string == 3",
        "(number | string)[]",
        "'asc' | 'desc'",
        "boolean | null",
    ] {
        let parsed = TypeDescriptor::parse(text).unwrap();
        assert_eq!(parsed.to_string(), text);
    }
}

#[test]
fn test_spacing_is_normalized() {
    let parsed = TypeDescriptor::parse("number>=0").unwrap();
    assert_eq!(parsed.to_string(), "number >= 0");
}
