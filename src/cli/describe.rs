//! Human-readable grammar listings

use crate::{Grammar, LiteralKind, PatternElement, Precedence, ResultType, Role};

/// One line per node, loosest level first, atoms last:
///
/// ```text
/// level 6
///   add      lhs:number as left "+" lhs:number as right  -> number
/// ```
pub fn describe_grammar(grammar: &Grammar) -> String {
    let mut sections: Vec<Precedence> =
        grammar.levels().into_iter().map(Precedence::Level).collect();
    sections.push(Precedence::Atom);

    let width = grammar.nodes().map(|node| node.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for precedence in sections {
        let nodes = grammar.nodes_at(precedence);
        if nodes.is_empty() {
            continue;
        }
        out.push_str(&format!("level {precedence}\n"));
        for node in nodes {
            let result = match &node.result_type {
                ResultType::Fixed(descriptor) => descriptor.clone(),
                ResultType::Sole => "sole binding".to_string(),
                ResultType::Union(names) => format!("union of {}", names.join(", ")),
            };
            out.push_str(&format!(
                "  {:width$}  {}  -> {result}\n",
                node.name,
                render_pattern(&node.pattern)
            ));
        }
    }
    out
}

pub fn render_pattern(pattern: &[PatternElement]) -> String {
    pattern.iter().map(render_element).collect::<Vec<_>>().join(" ")
}

fn render_element(element: &PatternElement) -> String {
    let (base, bind) = match element {
        PatternElement::Text(token) => return format!("{token:?}"),
        PatternElement::Optional(group) => return format!("[{}]", render_pattern(group)),
        PatternElement::Literal { kind, bind } => {
            let base = match kind {
                LiteralKind::Number => "number".to_string(),
                LiteralKind::String => "string".to_string(),
                LiteralKind::Identifier => "identifier".to_string(),
                LiteralKind::Keyword(keyword) => keyword.text().to_string(),
            };
            (base, bind)
        }
        PatternElement::Operand {
            role,
            constraint,
            bind,
        } => {
            let role = match role {
                Role::Lhs => "lhs",
                Role::Rhs => "rhs",
                Role::Expr => "expr",
            };
            let base = match constraint {
                Some(descriptor) => format!("{role}:{descriptor}"),
                None => role.to_string(),
            };
            (base, bind)
        }
    };
    match bind {
        Some(name) => format!("{base} as {name}"),
        None => base,
    }
}
