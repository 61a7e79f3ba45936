use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::Value;

/// How tightly a node binds.
///
/// Numeric levels ascend from loosest to tightest; `Atom` binds tighter than
/// any numeric level. The derived ordering follows that rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Level(u32),
    Atom,
}

impl Precedence {
    /// The next tighter precedence, used for non-leading `lhs` operands.
    pub fn tighter(self) -> Precedence {
        match self {
            Precedence::Level(n) => n.checked_add(1).map_or(Precedence::Atom, Precedence::Level),
            Precedence::Atom => Precedence::Atom,
        }
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precedence::Level(n) => write!(f, "{n}"),
            Precedence::Atom => write!(f, "atom"),
        }
    }
}

/// Operand matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Leading: the already-built left operand. Elsewhere: a sub-expression
    /// at strictly tighter precedence (left associativity).
    Lhs,
    /// A sub-expression at the node's own precedence (right associativity)
    Rhs,
    /// A full sub-expression at any precedence
    Expr,
}

/// Fixed keyword literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Null,
    True,
    False,
    Undefined,
}

impl Keyword {
    pub const ALL: [Keyword; 4] = [
        Keyword::Null,
        Keyword::True,
        Keyword::False,
        Keyword::Undefined,
    ];

    pub fn text(self) -> &'static str {
        match self {
            Keyword::Null => "null",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Undefined => "undefined",
        }
    }

    pub fn value(self) -> Value {
        match self {
            Keyword::Null => Value::Null,
            Keyword::True => Value::Boolean(true),
            Keyword::False => Value::Boolean(false),
            Keyword::Undefined => Value::Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
    /// An identifier resolved against the schema
    Identifier,
    Keyword(Keyword),
}

/// One element of a node's pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    Literal {
        kind: LiteralKind,
        bind: Option<String>,
    },

    /// Exact text, matched verbatim
    Text(String),

    Operand {
        role: Role,
        /// Type descriptor the operand's output schema must satisfy
        constraint: Option<String>,
        bind: Option<String>,
    },

    /// A group matched zero or one time
    Optional(Vec<PatternElement>),
}

impl PatternElement {
    pub fn text(token: impl Into<String>) -> Self {
        PatternElement::Text(token.into())
    }

    pub fn lhs() -> Self {
        Self::operand(Role::Lhs)
    }

    pub fn rhs() -> Self {
        Self::operand(Role::Rhs)
    }

    pub fn expr() -> Self {
        Self::operand(Role::Expr)
    }

    pub fn operand(role: Role) -> Self {
        PatternElement::Operand {
            role,
            constraint: None,
            bind: None,
        }
    }

    pub fn literal(kind: LiteralKind) -> Self {
        PatternElement::Literal { kind, bind: None }
    }

    pub fn number() -> Self {
        Self::literal(LiteralKind::Number)
    }

    pub fn string() -> Self {
        Self::literal(LiteralKind::String)
    }

    pub fn identifier() -> Self {
        Self::literal(LiteralKind::Identifier)
    }

    pub fn keyword(keyword: Keyword) -> Self {
        Self::literal(LiteralKind::Keyword(keyword))
    }

    pub fn optional(elements: Vec<PatternElement>) -> Self {
        PatternElement::Optional(elements)
    }

    /// Names the match. Has no effect on text and optional elements.
    pub fn bind(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            PatternElement::Literal { bind, .. } | PatternElement::Operand { bind, .. } => {
                *bind = Some(name.into());
            }
            PatternElement::Text(_) | PatternElement::Optional(_) => {}
        }
        self
    }

    /// Constrains an operand's type. Has no effect on other elements.
    pub fn constrain(mut self, descriptor: impl Into<String>) -> Self {
        if let PatternElement::Operand { constraint, .. } = &mut self {
            *constraint = Some(descriptor.into());
        }
        self
    }
}

/// How a node's output schema is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultType {
    /// A descriptor string; `"unknown"` behaves like [`ResultType::Sole`]
    Fixed(String),
    /// The output schema of the node's only binding
    Sole,
    /// The sorted union of the named bindings' output schemas
    Union(Vec<String>),
}

impl ResultType {
    pub fn fixed(descriptor: impl Into<String>) -> Self {
        ResultType::Fixed(descriptor.into())
    }

    pub fn union<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResultType::Union(names.into_iter().map(Into::into).collect())
    }
}

/// Errors an eval rule can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("missing binding `{0}`")]
    MissingBinding(String),

    #[error("binding `{name}` must be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Failed(String),
}

impl RuleError {
    pub fn new(message: impl Into<String>) -> Self {
        RuleError::Failed(message.into())
    }
}

/// Resolved bindings handed to an eval rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: HashMap<String, Value>,
}

impl Args {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Args { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, name: &str) -> Result<&Value, RuleError> {
        self.values
            .get(name)
            .ok_or_else(|| RuleError::MissingBinding(name.to_string()))
    }

    pub fn number(&self, name: &str) -> Result<f64, RuleError> {
        let value = self.value(name)?;
        value.as_float().ok_or_else(|| wrong_type(name, "number", value))
    }

    pub fn boolean(&self, name: &str) -> Result<bool, RuleError> {
        let value = self.value(name)?;
        value.as_bool().ok_or_else(|| wrong_type(name, "boolean", value))
    }

    pub fn string(&self, name: &str) -> Result<&str, RuleError> {
        let value = self.value(name)?;
        value.as_str().ok_or_else(|| wrong_type(name, "string", value))
    }
}

fn wrong_type(name: &str, expected: &'static str, value: &Value) -> RuleError {
    RuleError::WrongType {
        name: name.to_string(),
        expected,
        found: value.kind_name(),
    }
}

/// A node's evaluation function. Rules are expected to be pure.
pub type EvalRule = Arc<dyn Fn(&Args) -> Result<Value, RuleError> + Send + Sync>;

/// One grammar rule.
#[derive(Clone)]
pub struct NodeDefinition {
    pub name: String,
    pub pattern: Vec<PatternElement>,
    pub precedence: Precedence,
    pub result_type: ResultType,
    pub eval_rule: Option<EvalRule>,
}

impl NodeDefinition {
    /// A node with an `unknown` result type and no eval rule.
    pub fn new(
        name: impl Into<String>,
        precedence: Precedence,
        pattern: Vec<PatternElement>,
    ) -> Self {
        NodeDefinition {
            name: name.into(),
            pattern,
            precedence,
            result_type: ResultType::fixed("unknown"),
            eval_rule: None,
        }
    }

    /// `left <op> right`, both operands parsed as `lhs` (left associative).
    pub fn infix(
        name: impl Into<String>,
        level: u32,
        op: &str,
        operand_type: Option<&str>,
    ) -> Self {
        let operand = |bind: &str| {
            let element = PatternElement::lhs().bind(bind);
            match operand_type {
                Some(descriptor) => element.constrain(descriptor),
                None => element,
            }
        };
        Self::new(
            name,
            Precedence::Level(level),
            vec![operand("left"), PatternElement::text(op), operand("right")],
        )
    }

    pub fn returns(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn eval<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, RuleError> + Send + Sync + 'static,
    {
        self.eval_rule = Some(Arc::new(rule));
        self
    }
}

impl fmt::Debug for NodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("precedence", &self.precedence)
            .field("result_type", &self.result_type)
            .field("eval_rule", &self.eval_rule.is_some())
            .finish()
    }
}
