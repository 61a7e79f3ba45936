//! Build a small expression language from declarative node definitions,
//! parse input against a field schema and evaluate the tree over data.
//!
//! ```
//! use grammar_kit::{EvalContext, SchemaMap, Value, evaluate, library};
//!
//! let parser = library::standard_parser().unwrap();
//! let schema = SchemaMap::new().field("price", "number >= 0").unwrap();
//! let ast = parser.parse_complete("price * 2 + 1", &schema).unwrap();
//! assert_eq!(ast.output_schema().to_string(), "number");
//!
//! let data: Value = serde_json::json!({ "price": 20 }).into();
//! let ctx = EvalContext::new(&parser, &schema, &data);
//! assert_eq!(evaluate(&ast, &ctx).unwrap(), Value::Integer(41));
//! ```
pub mod ast;
pub mod cli;
mod convert;
pub mod error;
pub mod evaluator;
pub mod grammar;
pub mod lexer;
pub mod library;
pub mod options;
pub mod parser;
pub mod resolve;
pub mod schema;
pub mod value;

pub use ast::{AstKind, AstNode, Binding, Span};
pub use error::{ErrorKind, EvalError, Location, ParseError};
pub use evaluator::{EvalContext, evaluate};
pub use grammar::{
    Args, BuildError, Grammar, Keyword, LiteralKind, NodeDefinition, PatternElement, Precedence,
    ResultType, Role, RuleError,
};
pub use options::ParserOptions;
pub use parser::{Parsed, Parser, build_parser};
pub use schema::{SchemaEntry, SchemaError, SchemaMap, TypeDescriptor, Violation};
pub use value::Value;
