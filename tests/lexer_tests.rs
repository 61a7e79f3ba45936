// tests/lexer_tests.rs

use grammar_kit::ast::Span;
use grammar_kit::error::ErrorKind;
use grammar_kit::grammar::Keyword;
use grammar_kit::lexer::Lexer;
use grammar_kit::value::Value;
use rstest::rstest;

// ============================================================================
// Numbers
// ============================================================================

#[rstest]
#[case("42", Value::Integer(42))]
#[case("-7", Value::Integer(-7))]
#[case("3.25", Value::Float(3.25))]
#[case("-0.5", Value::Float(-0.5))]
#[case("1e3", Value::Float(1000.0))]
#[case("2.5E-1", Value::Float(0.25))]
#[case("99999999999999999999", Value::Float(1e20))]
fn test_numbers(#[case] input: &str, #[case] expected: Value) {
    let mut lexer = Lexer::new(input);
    let (value, span) = lexer.read_number().unwrap();
    assert_eq!(value, expected);
    assert_eq!(span, Span::new(0, input.len()));
}

#[test]
fn test_number_stops_at_trailing_dot() {
    let mut lexer = Lexer::new("1..5");
    assert_eq!(lexer.read_number().map(|(v, _)| v), Some(Value::Integer(1)));
    assert_eq!(lexer.rest(), "..5");
}

#[test]
fn test_exponent_without_digits_is_not_consumed() {
    let mut lexer = Lexer::new("2e");
    assert_eq!(lexer.read_number().map(|(v, _)| v), Some(Value::Integer(2)));
    assert_eq!(lexer.rest(), "e");
}

#[test]
fn test_lone_minus_is_not_a_number() {
    let mut lexer = Lexer::new("- 1");
    assert_eq!(lexer.read_number(), None);
    assert_eq!(lexer.position(), 0);
}

// ============================================================================
// Strings
// ============================================================================

#[rstest]
#[case(r#""hello""#, "hello")]
#[case("'single'", "single")]
#[case(r#""a\nb\tc""#, "a\nb\tc")]
#[case(r#"'it\'s'"#, "it's")]
#[case(r#""say \"hi\"""#, "say \"hi\"")]
#[case(r#""back\\slash\/""#, "back\\slash/")]
#[case(r#""caf\u00e9""#, "café")]
#[case(r#""\ud83d\ude00""#, "😀")]
#[case(r#""  spaced  ""#, "  spaced  ")]
fn test_string_escapes(#[case] input: &str, #[case] expected: &str) {
    let mut lexer = Lexer::new(input);
    let (text, span) = lexer.read_string().unwrap().unwrap();
    assert_eq!(text, expected);
    assert_eq!(span, Span::new(0, input.len()));
}

#[test]
fn test_unterminated_string_reports_opening_quote() {
    let mut lexer = Lexer::new("  'abc");
    let err = lexer.read_string().unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedString);
    assert_eq!(err.offset, 2);
}

#[test]
fn test_invalid_escape() {
    let mut lexer = Lexer::new(r#""a\qb""#);
    let err = lexer.read_string().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidEscape);
    assert_eq!(err.offset, 2);
}

#[test]
fn test_unpaired_surrogate() {
    let mut lexer = Lexer::new(r#""\ud83d""#);
    assert_eq!(lexer.read_string().unwrap_err().kind, ErrorKind::InvalidEscape);
}

#[test]
fn test_no_string_here() {
    let mut lexer = Lexer::new("abc");
    assert_eq!(lexer.read_string(), Ok(None));
}

// ============================================================================
// Identifiers, keywords and tokens
// ============================================================================

#[test]
fn test_unicode_identifier() {
    let mut lexer = Lexer::new("  naïve_1 + 2");
    let (name, span) = lexer.read_identifier().unwrap();
    assert_eq!(name, "naïve_1");
    assert_eq!(span.start, 2);
    assert_eq!(lexer.rest(), " + 2");
}

#[rstest]
#[case("_private")]
#[case("1abc")]
#[case("+")]
fn test_not_an_identifier(#[case] input: &str) {
    let mut lexer = Lexer::new(input);
    assert_eq!(lexer.read_identifier(), None);
}

#[test]
fn test_path_segment() {
    let mut lexer = Lexer::new("user.age");
    lexer.read_identifier().unwrap();
    let (segment, span) = lexer.read_path_segment().unwrap();
    assert_eq!(segment, "age");
    assert_eq!(span, Span::new(4, 8));
}

#[test]
fn test_keyword_match() {
    let mut lexer = Lexer::new("null ?? 1");
    assert_eq!(lexer.match_keyword(Keyword::True), None);
    assert_eq!(lexer.match_keyword(Keyword::Null), Some(Span::new(0, 4)));
}

#[test]
fn test_word_tokens_respect_boundaries() {
    let tokens = vec!["and".to_string()];
    let mut lexer = Lexer::new("andy");
    assert_eq!(lexer.match_text("and", &tokens), None);

    let mut lexer = Lexer::new("and x");
    assert_eq!(lexer.match_text("and", &tokens), Some(Span::new(0, 3)));
}

#[test]
fn test_symbol_tokens_need_no_boundary() {
    let tokens = vec!["+".to_string()];
    let mut lexer = Lexer::new("+x");
    assert_eq!(lexer.match_text("+", &tokens), Some(Span::new(0, 1)));
}

#[test]
fn test_shorter_token_loses_to_longer() {
    let tokens = vec!["**".to_string(), "*".to_string()];
    let mut lexer = Lexer::new("** 2");
    assert_eq!(lexer.match_text("*", &tokens), None);
    assert_eq!(lexer.match_text("**", &tokens), Some(Span::new(0, 2)));

    let mut lexer = Lexer::new("* 2");
    assert_eq!(lexer.match_text("*", &tokens), Some(Span::new(0, 1)));
}

#[test]
fn test_whitespace_skipping() {
    let mut lexer = Lexer::new("\t\r\n 5");
    assert_eq!(lexer.read_number().map(|(_, s)| s), Some(Span::new(4, 5)));
    assert!(lexer.at_end());
}

#[test]
fn test_describe_next() {
    let mut lexer = Lexer::new("   ");
    assert_eq!(lexer.describe_next(), "end of input");
    let mut lexer = Lexer::new(" ? 1");
    assert_eq!(lexer.describe_next(), "`?`");
}
