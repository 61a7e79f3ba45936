use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use super::node::{LiteralKind, NodeDefinition, PatternElement, Precedence, ResultType, Role};
use crate::schema::{DescriptorError, TypeDescriptor};

/// Errors raised while compiling a node registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("node `{0}` is defined more than once")]
    DuplicateName(String),

    #[error("node `{0}` has an empty pattern or optional group")]
    EmptyPattern(String),

    #[error("node `{0}` starts with an operand that would re-enter its own precedence")]
    LeftRecursive(String),

    #[error("node `{0}` starts with an optional group")]
    LeadingOptional(String),

    #[error("node `{0}` can match without consuming input")]
    NonConsuming(String),

    #[error("node `{name}`: {source}")]
    InvalidType {
        name: String,
        #[source]
        source: DescriptorError,
    },

    #[error("node `{name}` binds `{binding}` more than once")]
    DuplicateBinding { name: String, binding: String },

    #[error("node `{name}` computes a union over unknown binding `{binding}`")]
    UnknownBinding { name: String, binding: String },

    #[error("node `{0}` computes a union over fewer than two bindings")]
    InvalidUnion(String),
}

/// A pattern element with its constraint compiled.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Element {
    Literal {
        kind: LiteralKind,
        bind: Option<String>,
    },
    Text(String),
    Operand {
        role: Role,
        constraint: Option<TypeDescriptor>,
        bind: Option<String>,
    },
    Optional(Vec<Element>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompiledResult {
    Fixed(TypeDescriptor),
    Sole,
    Union(Vec<String>),
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledNode {
    pub def: NodeDefinition,
    pub elements: Vec<Element>,
    pub result: CompiledResult,
}

impl CompiledNode {
    /// Leading `lhs`: the node extends an already-parsed left operand.
    pub fn is_infix(&self) -> bool {
        matches!(self.elements.first(), Some(Element::Operand { role: Role::Lhs, .. }))
    }
}

#[derive(Debug, Clone)]
struct Level {
    precedence: u32,
    infix: Vec<usize>,
}

/// A compiled node registry, indexed by precedence.
///
/// Immutable once built; the parser shares it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Grammar {
    nodes: Vec<CompiledNode>,
    by_name: HashMap<String, usize>,
    /// Ascending numeric levels, infix nodes in registry order
    levels: Vec<Level>,
    /// Atom-level nodes in registry order
    atoms: Vec<usize>,
    /// Numeric-level nodes that do not start with an operand, ascending
    /// level then registry order
    prefix: Vec<usize>,
    /// Every exact-text token, longest first
    tokens: Vec<String>,
}

/// Built-in parenthesis tokens.
pub(crate) const OPEN_PAREN: &str = "(";
pub(crate) const CLOSE_PAREN: &str = ")";

impl Grammar {
    pub fn build(nodes: Vec<NodeDefinition>) -> Result<Grammar, BuildError> {
        let mut compiled = Vec::with_capacity(nodes.len());
        let mut by_name = HashMap::new();
        let mut tokens: HashSet<String> = [OPEN_PAREN, CLOSE_PAREN].map(String::from).into();

        for (index, def) in nodes.into_iter().enumerate() {
            if by_name.insert(def.name.clone(), index).is_some() {
                return Err(BuildError::DuplicateName(def.name));
            }
            let node = compile_node(def)?;
            collect_tokens(&node.elements, &mut tokens);
            compiled.push(node);
        }

        let mut by_level: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut prefix_by_level: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut atoms = Vec::new();
        for (index, node) in compiled.iter().enumerate() {
            match node.def.precedence {
                Precedence::Atom => atoms.push(index),
                Precedence::Level(level) if node.is_infix() => {
                    by_level.entry(level).or_default().push(index)
                }
                Precedence::Level(level) => {
                    by_level.entry(level).or_default();
                    prefix_by_level.entry(level).or_default().push(index)
                }
            }
        }

        let levels: Vec<Level> = by_level
            .into_iter()
            .map(|(precedence, infix)| Level { precedence, infix })
            .collect();
        let prefix = prefix_by_level.into_values().flatten().collect();

        let mut tokens: Vec<String> = tokens.into_iter().collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        debug!(
            nodes = compiled.len(),
            levels = levels.len(),
            atoms = atoms.len(),
            tokens = tokens.len(),
            "built grammar"
        );

        Ok(Grammar {
            nodes: compiled,
            by_name,
            levels,
            atoms,
            prefix,
            tokens,
        })
    }

    /// Definition lookup by name.
    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.by_name.get(name).map(|&i| &self.nodes[i].def)
    }

    /// Definitions in registry order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.nodes.iter().map(|node| &node.def)
    }

    /// Numeric precedence levels, ascending.
    pub fn levels(&self) -> Vec<u32> {
        self.levels.iter().map(|level| level.precedence).collect()
    }

    /// Definitions active at one precedence, registry order.
    pub fn nodes_at(&self, precedence: Precedence) -> Vec<&NodeDefinition> {
        self.nodes
            .iter()
            .filter(|node| node.def.precedence == precedence)
            .map(|node| &node.def)
            .collect()
    }

    /// Every exact-text token the grammar can match, longest first.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub(crate) fn compiled(&self, index: usize) -> &CompiledNode {
        &self.nodes[index]
    }

    pub(crate) fn atom_nodes(&self) -> &[usize] {
        &self.atoms
    }

    pub(crate) fn prefix_nodes(&self) -> &[usize] {
        &self.prefix
    }

    /// Infix candidates at or above `min`, ascending level then registry order.
    pub(crate) fn infix_from(&self, min: Precedence) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.levels
            .iter()
            .filter(move |level| Precedence::Level(level.precedence) >= min)
            .flat_map(|level| level.infix.iter().map(move |&i| (level.precedence, i)))
    }
}

fn compile_node(def: NodeDefinition) -> Result<CompiledNode, BuildError> {
    let name = def.name.clone();
    let first = match def.pattern.first() {
        Some(first) => first,
        None => return Err(BuildError::EmptyPattern(name)),
    };

    match (first, def.precedence) {
        (PatternElement::Optional(_), _) => return Err(BuildError::LeadingOptional(name)),
        (PatternElement::Operand { role: Role::Lhs, .. }, Precedence::Level(_)) => {
            let consumes = def.pattern[1..]
                .iter()
                .any(|element| !matches!(element, PatternElement::Optional(_)));
            if !consumes {
                return Err(BuildError::NonConsuming(name));
            }
        }
        (PatternElement::Operand { .. }, _) => return Err(BuildError::LeftRecursive(name)),
        _ => {}
    }

    let mut bindings = Vec::new();
    let elements = compile_elements(&name, &def.pattern, &mut bindings)?;

    let result = match &def.result_type {
        ResultType::Fixed(text) => {
            let descriptor = TypeDescriptor::parse(text).map_err(|source| BuildError::InvalidType {
                name: name.clone(),
                source,
            })?;
            if descriptor.is_unknown() {
                CompiledResult::Sole
            } else {
                CompiledResult::Fixed(descriptor)
            }
        }
        ResultType::Sole => CompiledResult::Sole,
        ResultType::Union(names) => {
            if names.len() < 2 {
                return Err(BuildError::InvalidUnion(name));
            }
            if let Some(missing) = names.iter().find(|n| !bindings.contains(n)) {
                return Err(BuildError::UnknownBinding {
                    name,
                    binding: missing.clone(),
                });
            }
            CompiledResult::Union(names.clone())
        }
    };

    Ok(CompiledNode {
        def,
        elements,
        result,
    })
}

fn compile_elements(
    name: &str,
    pattern: &[PatternElement],
    bindings: &mut Vec<String>,
) -> Result<Vec<Element>, BuildError> {
    let mut elements = Vec::with_capacity(pattern.len());
    for element in pattern {
        let compiled = match element {
            PatternElement::Literal { kind, bind } => {
                record_binding(name, bind, bindings)?;
                Element::Literal {
                    kind: *kind,
                    bind: bind.clone(),
                }
            }
            PatternElement::Text(token) => {
                if token.is_empty() {
                    return Err(BuildError::NonConsuming(name.to_string()));
                }
                Element::Text(token.clone())
            }
            PatternElement::Operand {
                role,
                constraint,
                bind,
            } => {
                record_binding(name, bind, bindings)?;
                let constraint = match constraint {
                    Some(text) => Some(TypeDescriptor::parse(text).map_err(|source| {
                        BuildError::InvalidType {
                            name: name.to_string(),
                            source,
                        }
                    })?),
                    None => None,
                };
                Element::Operand {
                    role: *role,
                    constraint,
                    bind: bind.clone(),
                }
            }
            PatternElement::Optional(group) => {
                if group.is_empty() {
                    return Err(BuildError::EmptyPattern(name.to_string()));
                }
                if group.iter().all(|e| matches!(e, PatternElement::Optional(_))) {
                    return Err(BuildError::NonConsuming(name.to_string()));
                }
                Element::Optional(compile_elements(name, group, bindings)?)
            }
        };
        elements.push(compiled);
    }
    Ok(elements)
}

fn record_binding(
    name: &str,
    bind: &Option<String>,
    bindings: &mut Vec<String>,
) -> Result<(), BuildError> {
    if let Some(binding) = bind {
        if bindings.contains(binding) {
            return Err(BuildError::DuplicateBinding {
                name: name.to_string(),
                binding: binding.clone(),
            });
        }
        bindings.push(binding.clone());
    }
    Ok(())
}

fn collect_tokens(elements: &[Element], tokens: &mut HashSet<String>) {
    for element in elements {
        match element {
            Element::Text(token) => {
                tokens.insert(token.clone());
            }
            Element::Optional(group) => collect_tokens(group, tokens),
            _ => {}
        }
    }
}
