//! # Node registry and grammar builder
//!
//! A language is declared as an ordered list of [`NodeDefinition`]s. Each
//! definition names a pattern, a precedence and a result-type policy, and may
//! carry an eval rule:
//!
//! ```text
//! add   := lhs:number "+" lhs:number     level 6, returns number
//! pow   := lhs:number "^" rhs:number     level 8, returns number
//! group := "(" expr ")"                  atom,    returns its sole binding
//! ```
//!
//! [`Grammar::build`] validates the registry and indexes it by precedence.
//!
//! - **[node]** - definitions, pattern elements, result types, eval rules
//! - **[builder]** - compilation and validation
pub mod builder;
pub mod node;

pub use builder::{BuildError, Grammar};
pub use node::{
    Args, EvalRule, Keyword, LiteralKind, NodeDefinition, PatternElement, Precedence, ResultType,
    Role, RuleError,
};
