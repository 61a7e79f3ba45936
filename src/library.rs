//! A ready-made expression language built from the public registry API.
//!
//! | level | nodes                                  | associativity |
//! |-------|----------------------------------------|---------------|
//! | 1     | `c ? a : b`                            | right         |
//! | 2     | `\|\|`, `??`                           | left          |
//! | 3     | `&&`                                   | left          |
//! | 4     | `==`, `!=`                             | left          |
//! | 5     | `<`, `<=`, `>`, `>=`                   | left          |
//! | 6     | `+` (numbers), `+` (strings), `-`      | left          |
//! | 7     | `*`, `/`, `%`                          | left          |
//! | 8     | prefix `-`, prefix `!`                 | right         |
//! | 9     | `**`                                   | right         |
//!
//! Arithmetic runs through `rust_decimal` so `0.1 + 0.2` is `0.3`, and a
//! whole result is an integer. Both sides of the ternary are evaluated before
//! the choice is made.

use std::cmp::Ordering;

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    grammar::{Args, BuildError, NodeDefinition, PatternElement, Precedence, ResultType, RuleError},
    parser::Parser,
    value::Value,
};

/// A parser over [`standard_nodes`].
pub fn standard_parser() -> Result<Parser, BuildError> {
    Parser::new(standard_nodes())
}

pub fn standard_nodes() -> Vec<NodeDefinition> {
    vec![
        NodeDefinition::new(
            "ternary",
            Precedence::Level(1),
            vec![
                PatternElement::lhs().constrain("boolean").bind("condition"),
                PatternElement::text("?"),
                PatternElement::expr().bind("then"),
                PatternElement::text(":"),
                PatternElement::rhs().bind("else"),
            ],
        )
        .returns(ResultType::union(["then", "else"]))
        .eval(|args| {
            let branch = if args.boolean("condition")? { "then" } else { "else" };
            Ok(args.value(branch)?.clone())
        }),
        NodeDefinition::infix("or", 2, "||", Some("boolean"))
            .returns(ResultType::fixed("boolean"))
            .eval(|args| Ok(Value::Boolean(args.boolean("left")? || args.boolean("right")?))),
        NodeDefinition::infix("coalesce", 2, "??", None)
            .returns(ResultType::union(["left", "right"]))
            .eval(|args| {
                let left = args.value("left")?;
                if left.is_nullish() {
                    Ok(args.value("right")?.clone())
                } else {
                    Ok(left.clone())
                }
            }),
        NodeDefinition::infix("and", 3, "&&", Some("boolean"))
            .returns(ResultType::fixed("boolean"))
            .eval(|args| Ok(Value::Boolean(args.boolean("left")? && args.boolean("right")?))),
        NodeDefinition::infix("eq", 4, "==", None)
            .returns(ResultType::fixed("boolean"))
            .eval(|args| Ok(Value::Boolean(args.value("left")?.same_as(args.value("right")?)))),
        NodeDefinition::infix("ne", 4, "!=", None)
            .returns(ResultType::fixed("boolean"))
            .eval(|args| Ok(Value::Boolean(!args.value("left")?.same_as(args.value("right")?)))),
        comparison("lt", "<", Ordering::is_lt),
        comparison("le", "<=", Ordering::is_le),
        comparison("gt", ">", Ordering::is_gt),
        comparison("ge", ">=", Ordering::is_ge),
        NodeDefinition::infix("add", 6, "+", Some("number"))
            .returns(ResultType::fixed("number"))
            .eval(|args| arithmetic(args, |a, b| a.checked_add(b), |a, b| a + b)),
        NodeDefinition::infix("concat", 6, "+", Some("string"))
            .returns(ResultType::fixed("string"))
            .eval(|args| Ok(format!("{}{}", args.string("left")?, args.string("right")?).into())),
        NodeDefinition::infix("sub", 6, "-", Some("number"))
            .returns(ResultType::fixed("number"))
            .eval(|args| arithmetic(args, |a, b| a.checked_sub(b), |a, b| a - b)),
        NodeDefinition::infix("mul", 7, "*", Some("number"))
            .returns(ResultType::fixed("number"))
            .eval(|args| arithmetic(args, |a, b| a.checked_mul(b), |a, b| a * b)),
        NodeDefinition::infix("div", 7, "/", Some("number"))
            .returns(ResultType::fixed("number"))
            .eval(|args| {
                if args.number("right")? == 0.0 {
                    return Err(RuleError::new("division by zero"));
                }
                arithmetic(args, |a, b| a.checked_div(b), |a, b| a / b)
            }),
        NodeDefinition::infix("mod", 7, "%", Some("number"))
            .returns(ResultType::fixed("number"))
            .eval(|args| {
                if args.number("right")? == 0.0 {
                    return Err(RuleError::new("modulo by zero"));
                }
                arithmetic(args, |a, b| a.checked_rem(b), |a, b| a % b)
            }),
        NodeDefinition::new(
            "neg",
            Precedence::Level(8),
            vec![
                PatternElement::text("-"),
                PatternElement::rhs().constrain("number").bind("operand"),
            ],
        )
        .returns(ResultType::fixed("number"))
        .eval(|args| match args.value("operand")? {
            Value::Integer(n) => Ok(n
                .checked_neg()
                .map_or(Value::Float(-(*n as f64)), Value::Integer)),
            _ => Ok(Value::Float(-args.number("operand")?)),
        }),
        NodeDefinition::new(
            "not",
            Precedence::Level(8),
            vec![
                PatternElement::text("!"),
                PatternElement::rhs().constrain("boolean").bind("operand"),
            ],
        )
        .returns(ResultType::fixed("boolean"))
        .eval(|args| Ok(Value::Boolean(!args.boolean("operand")?))),
        NodeDefinition::new(
            "pow",
            Precedence::Level(9),
            vec![
                PatternElement::lhs().constrain("number").bind("left"),
                PatternElement::text("**"),
                PatternElement::rhs().constrain("number").bind("right"),
            ],
        )
        .returns(ResultType::fixed("number"))
        .eval(power),
    ]
}

fn comparison(name: &str, op: &str, test: fn(Ordering) -> bool) -> NodeDefinition {
    NodeDefinition::infix(name, 5, op, Some("number | string"))
        .returns(ResultType::fixed("boolean"))
        .eval(move |args| {
            let ordering = match (args.value("left")?, args.value("right")?) {
                (Value::String(a), Value::String(b)) => a.cmp(b),
                (a, b) if a.is_number() && b.is_number() => args
                    .number("left")?
                    .partial_cmp(&args.number("right")?)
                    .ok_or_else(|| RuleError::new("cannot compare NaN"))?,
                (a, b) => {
                    return Err(RuleError::new(format!(
                        "cannot compare {} with {}",
                        a.kind_name(),
                        b.kind_name()
                    )));
                }
            };
            Ok(Value::Boolean(test(ordering)))
        })
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}

fn from_decimal(d: Decimal) -> Option<Value> {
    if d.is_integer()
        && let Some(n) = d.to_i64()
    {
        return Some(Value::Integer(n));
    }
    d.to_f64().map(Value::Float)
}

/// Exact decimal arithmetic, falling back to floats when a value does not
/// fit a `Decimal` or the operation overflows.
fn arithmetic(
    args: &Args,
    exact: fn(Decimal, Decimal) -> Option<Decimal>,
    approx: fn(f64, f64) -> f64,
) -> Result<Value, RuleError> {
    let (left, right) = (args.value("left")?, args.value("right")?);
    if let (Some(a), Some(b)) = (to_decimal(left), to_decimal(right))
        && let Some(result) = exact(a, b).and_then(from_decimal)
    {
        return Ok(result);
    }
    Ok(Value::Float(approx(args.number("left")?, args.number("right")?)))
}

fn power(args: &Args) -> Result<Value, RuleError> {
    if let (Value::Integer(base), Value::Integer(exponent)) =
        (args.value("left")?, args.value("right")?)
        && let Ok(exponent) = u32::try_from(*exponent)
        && let Some(n) = base.checked_pow(exponent)
    {
        return Ok(Value::Integer(n));
    }
    Ok(Value::Float(args.number("left")?.powf(args.number("right")?)))
}
