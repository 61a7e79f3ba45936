// tests/grammar_tests.rs

use grammar_kit::library;
use grammar_kit::{BuildError, Grammar, NodeDefinition, PatternElement, Precedence, ResultType};
use pretty_assertions::assert_eq;

fn text(token: &str) -> PatternElement {
    PatternElement::text(token)
}

fn build(nodes: Vec<NodeDefinition>) -> Result<Grammar, BuildError> {
    Grammar::build(nodes)
}

// ============================================================================
// Build errors
// ============================================================================

#[test]
fn test_duplicate_name() {
    let err = build(vec![
        NodeDefinition::infix("add", 1, "+", None),
        NodeDefinition::infix("add", 2, "plus", None),
    ])
    .unwrap_err();
    assert_eq!(err, BuildError::DuplicateName("add".to_string()));
}

#[test]
fn test_empty_pattern() {
    let err = build(vec![NodeDefinition::new("nothing", Precedence::Atom, vec![])]).unwrap_err();
    assert_eq!(err, BuildError::EmptyPattern("nothing".to_string()));
}

#[test]
fn test_empty_optional_group() {
    let err = build(vec![NodeDefinition::new(
        "hollow",
        Precedence::Atom,
        vec![text("#"), PatternElement::optional(vec![])],
    )])
    .unwrap_err();
    assert_eq!(err, BuildError::EmptyPattern("hollow".to_string()));
}

#[test]
fn test_leading_rhs_is_left_recursive() {
    let err = build(vec![NodeDefinition::new(
        "loop",
        Precedence::Level(1),
        vec![PatternElement::rhs(), text("!")],
    )])
    .unwrap_err();
    assert_eq!(err, BuildError::LeftRecursive("loop".to_string()));
}

#[test]
fn test_leading_expr_is_left_recursive() {
    let err = build(vec![NodeDefinition::new(
        "loop",
        Precedence::Level(3),
        vec![PatternElement::expr(), text("?")],
    )])
    .unwrap_err();
    assert_eq!(err, BuildError::LeftRecursive("loop".to_string()));
}

#[test]
fn test_atom_starting_with_operand() {
    let err = build(vec![NodeDefinition::new(
        "tight",
        Precedence::Atom,
        vec![PatternElement::lhs(), text("!")],
    )])
    .unwrap_err();
    assert_eq!(err, BuildError::LeftRecursive("tight".to_string()));
}

#[test]
fn test_leading_optional() {
    let err = build(vec![NodeDefinition::new(
        "maybe",
        Precedence::Atom,
        vec![PatternElement::optional(vec![text("~")]), PatternElement::number()],
    )])
    .unwrap_err();
    assert_eq!(err, BuildError::LeadingOptional("maybe".to_string()));
}

#[test]
fn test_lhs_followed_only_by_optionals() {
    let err = build(vec![NodeDefinition::new(
        "postfix",
        Precedence::Level(4),
        vec![PatternElement::lhs(), PatternElement::optional(vec![text("!")])],
    )])
    .unwrap_err();
    assert_eq!(err, BuildError::NonConsuming("postfix".to_string()));
}

#[test]
fn test_empty_text_token() {
    let err =
        build(vec![NodeDefinition::new("blank", Precedence::Atom, vec![text("")])]).unwrap_err();
    assert_eq!(err, BuildError::NonConsuming("blank".to_string()));
}

#[test]
fn test_invalid_constraint() {
    let err = build(vec![NodeDefinition::infix("add", 1, "+", Some("numbr"))]).unwrap_err();
    assert!(matches!(err, BuildError::InvalidType { ref name, .. } if name == "add"));
}

#[test]
fn test_invalid_result_type() {
    let err = build(vec![
        NodeDefinition::infix("add", 1, "+", None).returns(ResultType::fixed("number |")),
    ])
    .unwrap_err();
    assert!(matches!(err, BuildError::InvalidType { .. }));
}

#[test]
fn test_duplicate_binding() {
    let err = build(vec![NodeDefinition::new(
        "pair",
        Precedence::Atom,
        vec![
            text("<"),
            PatternElement::expr().bind("x"),
            text(","),
            PatternElement::expr().bind("x"),
            text(">"),
        ],
    )])
    .unwrap_err();
    assert_eq!(
        err,
        BuildError::DuplicateBinding {
            name: "pair".to_string(),
            binding: "x".to_string()
        }
    );
}

#[test]
fn test_duplicate_binding_inside_optional() {
    let err = build(vec![NodeDefinition::new(
        "range",
        Precedence::Atom,
        vec![
            text("range"),
            PatternElement::number().bind("n"),
            PatternElement::optional(vec![text(".."), PatternElement::number().bind("n")]),
        ],
    )])
    .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateBinding { .. }));
}

#[test]
fn test_union_over_unknown_binding() {
    let err = build(vec![
        NodeDefinition::infix("either", 1, "|", None)
            .returns(ResultType::union(["left", "middle"])),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        BuildError::UnknownBinding {
            name: "either".to_string(),
            binding: "middle".to_string()
        }
    );
}

#[test]
fn test_union_of_one() {
    let err = build(vec![
        NodeDefinition::infix("either", 1, "|", None).returns(ResultType::union(["left"])),
    ])
    .unwrap_err();
    assert_eq!(err, BuildError::InvalidUnion("either".to_string()));
}

#[test]
fn test_error_messages_name_the_node() {
    let err = BuildError::LeftRecursive("loop".to_string());
    assert_eq!(
        err.to_string(),
        "node `loop` starts with an operand that would re-enter its own precedence"
    );
}

// ============================================================================
// Levels and lookup
// ============================================================================

#[test]
fn test_standard_levels_ascend() {
    let grammar = build(library::standard_nodes()).unwrap();
    assert_eq!(grammar.levels(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn test_registry_order_within_a_level() {
    let grammar = build(library::standard_nodes()).unwrap();
    let names: Vec<&str> = grammar
        .nodes_at(Precedence::Level(6))
        .into_iter()
        .map(|node| node.name.as_str())
        .collect();
    assert_eq!(names, vec!["add", "concat", "sub"]);
}

#[test]
fn test_node_lookup() {
    let grammar = build(library::standard_nodes()).unwrap();
    let pow = grammar.node("pow").unwrap();
    assert_eq!(pow.precedence, Precedence::Level(9));
    assert!(pow.eval_rule.is_some());
    assert!(grammar.node("nope").is_none());
}

#[test]
fn test_tokens_longest_first() {
    let grammar = build(library::standard_nodes()).unwrap();
    let tokens = grammar.tokens();
    assert!(tokens.windows(2).all(|pair| pair[0].len() >= pair[1].len()));
    for expected in ["**", "??", "<=", "(", ")", "!"] {
        assert!(tokens.iter().any(|t| t == expected), "missing {expected}");
    }
}

#[test]
fn test_atom_level_sorts_after_numeric_levels() {
    assert!(Precedence::Atom > Precedence::Level(u32::MAX));
    assert_eq!(Precedence::Level(3).tighter(), Precedence::Level(4));
    assert_eq!(Precedence::Level(u32::MAX).tighter(), Precedence::Atom);
}
