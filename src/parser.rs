use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    ast::{AstNode, Binding, Bindings, Span},
    error::{ErrorKind, Failure, ParseError},
    grammar::{
        BuildError, Grammar, Keyword, LiteralKind, NodeDefinition, Precedence, Role,
        builder::{CLOSE_PAREN, CompiledNode, Element, OPEN_PAREN},
    },
    lexer::{LexError, Lexer},
    options::ParserOptions,
    resolve,
    schema::{SchemaEntry, SchemaMap},
};

/// Compiles `nodes` and returns a parser over the resulting grammar.
pub fn build_parser(nodes: Vec<NodeDefinition>) -> Result<Parser, BuildError> {
    Parser::new(nodes)
}

/// A precedence-climbing parser over a compiled [`Grammar`].
///
/// The grammar is shared, never copied: cloning a parser or handing its
/// grammar to an evaluation context only bumps a reference count. Each
/// [`Parser::parse`] call keeps its state on the stack, so one parser can
/// serve many threads.
#[derive(Debug, Clone)]
pub struct Parser {
    grammar: Arc<Grammar>,
    options: ParserOptions,
}

/// A successful parse and whatever input it left unconsumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<'s> {
    pub ast: AstNode,
    /// Unconsumed input, leading whitespace skipped
    pub rest: &'s str,
}

impl Parsed<'_> {
    pub fn is_complete(&self) -> bool {
        self.rest.is_empty()
    }
}

impl Parser {
    pub fn new(nodes: Vec<NodeDefinition>) -> Result<Self, BuildError> {
        Ok(Self::from_grammar(Arc::new(Grammar::build(nodes)?)))
    }

    pub fn from_grammar(grammar: Arc<Grammar>) -> Self {
        Parser {
            grammar,
            options: ParserOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn shared_grammar(&self) -> Arc<Grammar> {
        Arc::clone(&self.grammar)
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses one expression from the start of `input`.
    ///
    /// Trailing input that does not extend the expression is returned in
    /// [`Parsed::rest`] rather than treated as an error.
    pub fn parse<'s>(&self, input: &'s str, schema: &SchemaMap) -> Result<Parsed<'s>, ParseError> {
        let mut state = self.state(input, schema);
        match state.parse_expr(Precedence::Level(0)) {
            Ok(ast) => {
                state.lexer.skip_whitespace();
                Ok(Parsed {
                    ast,
                    rest: state.lexer.rest(),
                })
            }
            Err(failure) => Err(self.located(failure, input)),
        }
    }

    /// Parses `input` as exactly one expression.
    pub fn parse_complete(&self, input: &str, schema: &SchemaMap) -> Result<AstNode, ParseError> {
        let mut state = self.state(input, schema);
        let ast = match state.parse_expr(Precedence::Level(0)) {
            Ok(ast) => ast,
            Err(failure) => return Err(self.located(failure, input)),
        };
        if state.lexer.at_end() {
            return Ok(ast);
        }

        let offset = state.lexer.position();
        let kind = if state.lexer.rest().starts_with(CLOSE_PAREN) {
            ErrorKind::UnbalancedParen
        } else {
            ErrorKind::NoMatch
        };
        let trailing = Failure::new(
            kind,
            offset,
            format!("unexpected {} after expression", state.lexer.describe_next()),
        );
        let failure = match state.furthest.take() {
            Some(recorded)
                if recorded.offset > offset
                    || (recorded.kind != ErrorKind::NoMatch
                        && recorded.offset >= ast.span().start) =>
            {
                recorded
            }
            _ => trailing,
        };
        Err(self.located(failure, input))
    }

    fn state<'p, 's>(&'p self, input: &'s str, schema: &'p SchemaMap) -> ParseState<'p, 's> {
        ParseState {
            grammar: &self.grammar,
            schema,
            lexer: Lexer::new(input),
            max_depth: self.options.max_depth,
            depth: 0,
            furthest: None,
        }
    }

    fn located(&self, failure: Failure, input: &str) -> ParseError {
        debug!(kind = %failure.kind, offset = failure.offset, "parse failed");
        ParseError::from_failure(failure, input, self.options.snippet_radius)
    }
}

impl From<LexError> for Failure {
    fn from(e: LexError) -> Self {
        Failure::new(e.kind, e.offset, e.message)
    }
}

type Step<T> = Result<T, Failure>;

/// Progress through one candidate's pattern.
#[derive(Default)]
struct MatchState {
    bindings: Bindings,
    committed: bool,
    start: Option<usize>,
}

impl MatchState {
    fn note_start(&mut self, offset: usize) {
        self.start.get_or_insert(offset);
    }
}

/// A fully matched candidate, before its node is assembled.
struct Matched {
    bindings: Bindings,
    start: usize,
    end: usize,
}

struct ParseState<'p, 's> {
    grammar: &'p Grammar,
    schema: &'p SchemaMap,
    lexer: Lexer<'s>,
    max_depth: usize,
    depth: usize,
    /// Furthest failure seen in abandoned alternatives
    furthest: Option<Failure>,
}

impl ParseState<'_, '_> {
    fn record(&mut self, failure: Failure) {
        let replace = match &self.furthest {
            Some(current) => failure.outranks(current),
            None => true,
        };
        if replace {
            self.furthest = Some(failure);
        }
    }

    /// The failure to report: `failure`, unless an abandoned alternative got
    /// further.
    fn fail(&mut self, failure: Failure) -> Failure {
        if failure.kind.is_fatal() {
            return failure;
        }
        match self.furthest.take() {
            Some(recorded) if !failure.outranks(&recorded) && recorded.offset > failure.offset => {
                self.furthest = Some(recorded.clone());
                recorded
            }
            previous => {
                self.furthest = previous;
                failure
            }
        }
    }

    fn parse_expr(&mut self, min: Precedence) -> Step<AstNode> {
        self.depth += 1;
        let result = if self.depth > self.max_depth {
            self.lexer.skip_whitespace();
            Err(self.too_deep(self.lexer.position()))
        } else {
            self.climb(min)
        };
        self.depth -= 1;
        result
    }

    fn climb(&mut self, min: Precedence) -> Step<AstNode> {
        let grammar = self.grammar;
        let mut left = self.parse_atom()?;

        'climb: loop {
            for (level, index) in grammar.infix_from(min) {
                let node = grammar.compiled(index);
                let matched = self.match_node(node, Precedence::Level(level), Some(&left))?;
                if let Some(matched) = matched {
                    left = self.finish(node, matched, Some(left))?;
                    continue 'climb;
                }
            }
            return Ok(left);
        }
    }

    fn parse_atom(&mut self) -> Step<AstNode> {
        let grammar = self.grammar;
        self.lexer.skip_whitespace();
        let start = self.lexer.position();

        for &index in grammar.atom_nodes() {
            let node = grammar.compiled(index);
            if let Some(matched) = self.match_node(node, Precedence::Atom, None)? {
                return self.finish(node, matched, None);
            }
        }

        if let Some(open) = self.lexer.match_text(OPEN_PAREN, grammar.tokens()) {
            let inner = self.parse_expr(Precedence::Level(0))?;
            let Some(close) = self.lexer.match_text(CLOSE_PAREN, grammar.tokens()) else {
                let found = self.lexer.describe_next();
                return Err(self.fail(Failure::new(
                    ErrorKind::UnbalancedParen,
                    open.start,
                    format!("unclosed `(`: expected `)`, found {found}"),
                )));
            };
            return Ok(inner.with_span(Span::new(open.start, close.end)));
        }

        if let Some((value, span)) = self.lexer.read_number() {
            return Ok(AstNode::literal(value, span));
        }
        if let Some((text, span)) = self.lexer.read_string()? {
            return Ok(AstNode::literal(text.into(), span));
        }
        for keyword in Keyword::ALL {
            if let Some(span) = self.lexer.match_keyword(keyword) {
                return Ok(AstNode::literal(keyword.value(), span));
            }
        }

        for &index in grammar.prefix_nodes() {
            let node = grammar.compiled(index);
            if let Some(matched) = self.match_node(node, node.def.precedence, None)? {
                return self.finish(node, matched, None);
            }
        }

        match self.read_identifier() {
            Ok(Some(identifier)) => Ok(identifier),
            Ok(None) => {
                let found = self.lexer.describe_next();
                Err(self.fail(Failure::new(
                    ErrorKind::NoMatch,
                    start,
                    format!("expected an expression, found {found}"),
                )))
            }
            Err(failure) => Err(self.fail(failure)),
        }
    }

    /// A schema field reference, following dotted segments into nested maps.
    fn read_identifier(&mut self) -> Step<Option<AstNode>> {
        let Some((name, span)) = self.lexer.read_identifier() else {
            return Ok(None);
        };
        let Some(mut entry) = self.schema.get(&name) else {
            return Err(Failure::new(
                ErrorKind::UnknownIdentifier,
                span.start,
                format!("unknown identifier `{name}`"),
            ));
        };
        let mut path = vec![name];
        let mut end = span.end;

        while let SchemaEntry::Nested(inner) = entry {
            let Some((segment, segment_span)) = self.lexer.read_path_segment() else {
                break;
            };
            match inner.get(&segment) {
                Some(next) => {
                    entry = next;
                    path.push(segment);
                    end = segment_span.end;
                }
                None => {
                    return Err(Failure::new(
                        ErrorKind::UnknownIdentifier,
                        segment_span.start + 1,
                        format!("unknown field `{segment}` in `{}`", path.join(".")),
                    ));
                }
            }
        }

        Ok(Some(AstNode::identifier(
            path,
            entry.descriptor(),
            Span::new(span.start, end),
        )))
    }

    /// Tries one candidate. `Ok(None)` leaves the input untouched.
    fn match_node(
        &mut self,
        node: &CompiledNode,
        precedence: Precedence,
        left: Option<&AstNode>,
    ) -> Step<Option<Matched>> {
        let start = self.lexer.position();
        let elements = match left {
            Some(left) => {
                if let Some(Element::Operand {
                    constraint: Some(constraint),
                    ..
                }) = node.elements.first()
                    && !constraint.accepts(left.output_schema())
                {
                    self.note_left_mismatch(node, left, constraint.to_string());
                    return Ok(None);
                }
                &node.elements[1..]
            }
            None => &node.elements[..],
        };

        let mut state = MatchState::default();
        match self.match_elements(node, precedence, elements, &mut state) {
            Ok(true) => Ok(Some(Matched {
                bindings: state.bindings,
                start: state.start.unwrap_or(start),
                end: self.lexer.position(),
            })),
            Ok(false) => {
                self.lexer.reset(start);
                Ok(None)
            }
            Err(failure) if failure.kind.is_fatal() || state.committed => Err(self.fail(failure)),
            Err(failure) => {
                self.record(failure);
                self.lexer.reset(start);
                Ok(None)
            }
        }
    }

    /// Records a left-operand constraint failure, but only when the node's
    /// operator is actually present; otherwise the node was never a candidate.
    fn note_left_mismatch(&mut self, node: &CompiledNode, left: &AstNode, expected: String) {
        let Some(Element::Text(token)) = node.elements.get(1) else {
            return;
        };
        let position = self.lexer.position();
        let present = self.lexer.match_text(token, self.grammar.tokens()).is_some();
        self.lexer.reset(position);
        if present {
            self.record(Failure::new(
                ErrorKind::TypeMismatch,
                left.span().start,
                format!(
                    "`{}` expects its left operand to be {expected}, found {}",
                    node.def.name,
                    left.output_schema()
                ),
            ));
        }
    }

    fn match_elements(
        &mut self,
        node: &CompiledNode,
        precedence: Precedence,
        elements: &[Element],
        state: &mut MatchState,
    ) -> Step<bool> {
        for element in elements {
            if !self.match_element(node, precedence, element, state)? {
                if state.committed {
                    let found = self.lexer.describe_next();
                    return Err(Failure::new(
                        ErrorKind::NoMatch,
                        self.lexer.position(),
                        format!(
                            "`{}` expected {}, found {found}",
                            node.def.name,
                            describe(element)
                        ),
                    ));
                }
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn match_element(
        &mut self,
        node: &CompiledNode,
        precedence: Precedence,
        element: &Element,
        state: &mut MatchState,
    ) -> Step<bool> {
        match element {
            Element::Text(token) => match self.lexer.match_text(token, self.grammar.tokens()) {
                Some(span) => {
                    state.note_start(span.start);
                    state.committed = true;
                    Ok(true)
                }
                None => Ok(false),
            },
            Element::Literal { kind, bind } => match self.match_literal(*kind)? {
                Some((binding, span)) => {
                    state.note_start(span.start);
                    if let Some(name) = bind {
                        state.bindings.insert(name.clone(), binding);
                    }
                    Ok(true)
                }
                None => Ok(false),
            },
            Element::Operand {
                role,
                constraint,
                bind,
            } => {
                let min = match role {
                    Role::Lhs => precedence.tighter(),
                    Role::Rhs => precedence,
                    Role::Expr => Precedence::Level(0),
                };
                let operand = self.parse_expr(min)?;
                if let Some(constraint) = constraint
                    && !constraint.accepts(operand.output_schema())
                {
                    return Err(Failure::new(
                        ErrorKind::TypeMismatch,
                        operand.span().start,
                        format!(
                            "`{}` expects {constraint}, found {}",
                            node.def.name,
                            operand.output_schema()
                        ),
                    ));
                }
                state.note_start(operand.span().start);
                if let Some(name) = bind {
                    state.bindings.insert(name.clone(), Binding::Node(operand));
                }
                Ok(true)
            }
            Element::Optional(group) => {
                let position = self.lexer.position();
                let mut inner = MatchState::default();
                match self.match_elements(node, precedence, group, &mut inner) {
                    Ok(true) => {
                        if let Some(start) = inner.start {
                            state.note_start(start);
                        }
                        state.committed |= inner.committed;
                        state.bindings.extend(inner.bindings);
                    }
                    Ok(false) => self.lexer.reset(position),
                    Err(failure) if failure.kind.is_fatal() || inner.committed => {
                        state.committed = true;
                        return Err(failure);
                    }
                    Err(failure) => {
                        self.record(failure);
                        self.lexer.reset(position);
                    }
                }
                Ok(true)
            }
        }
    }

    fn match_literal(&mut self, kind: LiteralKind) -> Step<Option<(Binding, Span)>> {
        let matched = match kind {
            LiteralKind::Number => self
                .lexer
                .read_number()
                .map(|(value, span)| (Binding::Literal(value), span)),
            LiteralKind::String => self
                .lexer
                .read_string()?
                .map(|(text, span)| (Binding::Literal(text.into()), span)),
            LiteralKind::Keyword(keyword) => self
                .lexer
                .match_keyword(keyword)
                .map(|span| (Binding::Literal(keyword.value()), span)),
            LiteralKind::Identifier => self.read_identifier()?.map(|node| {
                let span = node.span();
                (Binding::Node(node), span)
            }),
        };
        Ok(matched)
    }

    fn finish(
        &self,
        node: &CompiledNode,
        matched: Matched,
        left: Option<AstNode>,
    ) -> Step<AstNode> {
        let mut bindings = matched.bindings;
        let mut start = matched.start;
        if let Some(left) = left {
            start = left.span().start;
            if let Some(Element::Operand { bind: Some(name), .. }) = node.elements.first() {
                bindings.insert(name.clone(), Binding::Node(left));
            }
        }
        let output_schema = resolve::output_schema(&node.result, &bindings);
        trace!(
            node = %node.def.name,
            start,
            end = matched.end,
            schema = %output_schema,
            "matched node"
        );
        let ast = AstNode::node(
            node.def.name.clone(),
            bindings,
            output_schema,
            Span::new(start, matched.end),
        );
        // Left-associative chains grow the tree without re-entering
        // `parse_expr`, so the tree depth is bounded here as well.
        if ast.depth() > self.max_depth {
            return Err(self.too_deep(start));
        }
        Ok(ast)
    }

    fn too_deep(&self, offset: usize) -> Failure {
        Failure::new(
            ErrorKind::NestingTooDeep,
            offset,
            format!("expression nested deeper than {} levels", self.max_depth),
        )
    }
}

fn describe(element: &Element) -> String {
    match element {
        Element::Text(token) => format!("`{token}`"),
        Element::Literal { kind, .. } => match kind {
            LiteralKind::Number => "a number".to_string(),
            LiteralKind::String => "a string".to_string(),
            LiteralKind::Identifier => "an identifier".to_string(),
            LiteralKind::Keyword(keyword) => format!("`{}`", keyword.text()),
        },
        Element::Operand { .. } => "an expression".to_string(),
        Element::Optional(group) => group.first().map_or_else(String::new, describe),
    }
}
