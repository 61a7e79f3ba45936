//! Atom matchers over the raw input.
//!
//! The parser drives the lexer on demand: every `read_*`/`match_*` call skips
//! insignificant whitespace, then either consumes one token and returns it or
//! leaves the position untouched. Positions are byte offsets.

use thiserror::Error;

use crate::ast::Span;
use crate::error::ErrorKind;
use crate::grammar::Keyword;
use crate::value::Value;

/// A lexical failure inside a string literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LexError {
    pub kind: ErrorKind,
    pub offset: usize,
    pub message: String,
}

pub struct Lexer<'s> {
    input: &'s str,
    position: usize,
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

impl<'s> Lexer<'s> {
    pub fn new(input: &'s str) -> Self {
        Lexer { input, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Rewinds (or advances) to a position previously returned by
    /// [`Lexer::position`].
    pub fn reset(&mut self, position: usize) {
        self.position = position;
    }

    pub fn input(&self) -> &'s str {
        self.input
    }

    pub fn rest(&self) -> &'s str {
        &self.input[self.position..]
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if matches!(ch, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// True once only whitespace remains.
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.position >= self.input.len()
    }

    fn digits(&mut self) -> usize {
        let mut count = 0;
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            count += 1;
        }
        count
    }

    /// `-?digits(.digits)?([eE][+-]?digits)?`
    pub fn read_number(&mut self) -> Option<(Value, Span)> {
        self.skip_whitespace();
        let start = self.position;

        if self.current_char() == Some('-') {
            self.advance();
        }
        if self.digits() == 0 {
            self.position = start;
            return None;
        }

        let mut is_float = false;
        if self.current_char() == Some('.')
            && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.advance();
            self.digits();
        }
        if matches!(self.current_char(), Some('e' | 'E')) {
            let exponent_start = self.position;
            self.advance();
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance();
            }
            if self.digits() == 0 {
                self.position = exponent_start;
            } else {
                is_float = true;
            }
        }

        let text = &self.input[start..self.position];
        let integer = if is_float { None } else { text.parse::<i64>().ok() };
        let value = match integer {
            Some(n) => Value::Integer(n),
            None => match text.parse::<f64>() {
                Ok(n) => Value::Float(n),
                Err(_) => {
                    self.position = start;
                    return None;
                }
            },
        };
        Some((value, Span::new(start, self.position)))
    }

    /// A single- or double-quoted string, escapes decoded.
    ///
    /// `Ok(None)` when no quote starts here.
    pub fn read_string(&mut self) -> Result<Option<(String, Span)>, LexError> {
        self.skip_whitespace();
        let start = self.position;
        let quote = match self.current_char() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Ok(None),
        };
        self.advance();

        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(Some((result, Span::new(start, self.position))));
                }
                '\\' => {
                    let escape_start = self.position;
                    self.advance();
                    let decoded = match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('/') => '/',
                        Some('u') => {
                            self.advance();
                            result.push(self.read_unicode_escape(escape_start)?);
                            continue;
                        }
                        Some(other) => {
                            return Err(LexError {
                                kind: ErrorKind::InvalidEscape,
                                offset: escape_start,
                                message: format!("invalid escape sequence `\\{other}`"),
                            });
                        }
                        None => break,
                    };
                    result.push(decoded);
                    self.advance();
                }
                c => {
                    result.push(c);
                    self.advance();
                }
            }
        }

        Err(LexError {
            kind: ErrorKind::UnterminatedString,
            offset: start,
            message: format!("unterminated string: missing closing {quote}"),
        })
    }

    fn hex4(&mut self, escape_start: usize) -> Result<u32, LexError> {
        let digits = self.rest().get(..4).filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()));
        match digits.and_then(|d| u32::from_str_radix(d, 16).ok()) {
            Some(code) => {
                self.position += 4;
                Ok(code)
            }
            None => Err(LexError {
                kind: ErrorKind::InvalidEscape,
                offset: escape_start,
                message: "`\\u` must be followed by four hex digits".to_string(),
            }),
        }
    }

    fn read_unicode_escape(&mut self, escape_start: usize) -> Result<char, LexError> {
        let high = self.hex4(escape_start)?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if !self.rest().starts_with("\\u") {
                return Err(lone_surrogate(escape_start));
            }
            self.position += 2;
            let low = self.hex4(escape_start)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(lone_surrogate(escape_start));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code).ok_or_else(|| lone_surrogate(escape_start))
    }

    /// A Unicode-letter-led run of letters, digits and underscores.
    pub fn read_identifier(&mut self) -> Option<(String, Span)> {
        self.skip_whitespace();
        let start = self.position;
        if !self.current_char().is_some_and(char::is_alphabetic) {
            return None;
        }
        while self.current_char().is_some_and(is_ident_char) {
            self.advance();
        }
        Some((self.input[start..self.position].to_string(), Span::new(start, self.position)))
    }

    /// `.segment` directly after an identifier, for dotted paths.
    pub fn read_path_segment(&mut self) -> Option<(String, Span)> {
        let start = self.position;
        if self.current_char() != Some('.') || !self.peek_char(1).is_some_and(char::is_alphabetic) {
            return None;
        }
        self.advance();
        let segment_start = self.position;
        while self.current_char().is_some_and(is_ident_char) {
            self.advance();
        }
        Some((
            self.input[segment_start..self.position].to_string(),
            Span::new(start, self.position),
        ))
    }

    pub fn match_keyword(&mut self, keyword: Keyword) -> Option<Span> {
        self.skip_whitespace();
        let text = keyword.text();
        if self.rest().starts_with(text) && self.boundary_after(text) {
            let start = self.position;
            self.position += text.len();
            Some(Span::new(start, self.position))
        } else {
            None
        }
    }

    /// Matches `token` verbatim unless a longer registered token that
    /// extends it also matches here.
    pub fn match_text(&mut self, token: &str, tokens: &[String]) -> Option<Span> {
        self.skip_whitespace();
        if !self.matches_here(token) {
            return None;
        }
        let shadowed = tokens
            .iter()
            .any(|t| t.len() > token.len() && t.starts_with(token) && self.matches_here(t));
        if shadowed {
            return None;
        }
        let start = self.position;
        self.position += token.len();
        Some(Span::new(start, self.position))
    }

    fn matches_here(&self, token: &str) -> bool {
        self.rest().starts_with(token) && self.boundary_after(token)
    }

    /// Word-like tokens must not run into a following identifier character.
    fn boundary_after(&self, token: &str) -> bool {
        let ends_word = token.chars().last().is_some_and(is_ident_char);
        let next = self.rest()[token.len()..].chars().next();
        !(ends_word && next.is_some_and(is_ident_char))
    }

    /// Short description of what comes next, for error messages.
    pub fn describe_next(&mut self) -> String {
        self.skip_whitespace();
        match self.rest().chars().next() {
            None => "end of input".to_string(),
            Some(_) => {
                let token: String = self
                    .rest()
                    .chars()
                    .take_while(|c| !c.is_whitespace())
                    .take(12)
                    .collect();
                format!("`{token}`")
            }
        }
    }
}

fn lone_surrogate(offset: usize) -> LexError {
    LexError {
        kind: ErrorKind::InvalidEscape,
        offset,
        message: "invalid unicode escape: unpaired surrogate".to_string(),
    }
}

#[test]
fn test_keywords_respect_word_boundaries() {
    let mut lexer = Lexer::new("  truely");
    assert_eq!(lexer.match_keyword(Keyword::True), None);
    assert_eq!(lexer.read_identifier().map(|(s, _)| s), Some("truely".to_string()));
}

#[test]
fn test_longest_token_wins() {
    let tokens = vec!["==".to_string(), "=".to_string()];
    let mut lexer = Lexer::new("== 1");
    assert_eq!(lexer.match_text("=", &tokens), None);
    assert_eq!(lexer.match_text("==", &tokens), Some(Span::new(0, 2)));
}
