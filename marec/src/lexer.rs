//! Lexical analysis for Mare.
//!
//! The lexer folds the character stream into tokens. Reserved words map to
//! dedicated kinds; any other printable ASCII character is passed through as
//! an [`TokenKind::Op`] token so user-defined operators tokenise uniformly.
//! `#` starts a line comment, and `->` wins over a bare `-` by longest match.
//!
//! Numeric literals are classified here as well: a floating form (a `.` or an
//! `f`/`F` suffix) becomes `float` or `double`, and an integer form is tagged
//! with the narrowest signed width whose range contains the value.
//!
//! # Example
//!
//! ```rust
//! use marec::{Lexer, TokenKind};
//!
//! let tokens: Vec<_> = Lexer::new("fn main() -> void { }").map(|t| t.kind).collect();
//! assert_eq!(tokens[0], TokenKind::Fn);
//! assert_eq!(tokens[1], TokenKind::Ident);
//! assert_eq!(tokens[4], TokenKind::Arrow);
//! ```

use crate::span::{LineIndex, Span};
use logos::Logos;

/// Token kinds for the Mare lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
pub enum TokenKind {
    // ============================================================
    // Keywords
    // ============================================================
    #[token("fn")]
    Fn,
    #[token("extern")]
    Extern,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("return")]
    #[token("ret")]
    Return,
    #[token("binary")]
    Binary,
    #[token("unary")]
    Unary,
    #[token("var")]
    Var,

    /// Reserved for a future capture construct; always rejected by the parser.
    #[token("grab")]
    Grab,

    // ============================================================
    // Type keywords
    // ============================================================
    #[token("void")]
    Void,
    #[token("double")]
    Double,
    #[token("float")]
    #[token("flt")]
    Float,
    #[token("i8")]
    I8,
    #[token("i16")]
    I16,
    #[token("i32")]
    I32,
    #[token("i64")]
    #[token("int")]
    I64,
    #[token("string")]
    String,

    // ============================================================
    // Literals and identifiers
    // ============================================================
    /// Identifier: `[A-Za-z_][A-Za-z0-9_]*` (keywords take precedence).
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    /// Numeric literal: digits with at most one `.`, optional `f`/`F` suffix.
    #[regex(r"[0-9]+\.?[0-9]*[fF]?")]
    #[regex(r"\.[0-9]+[fF]?")]
    Number,

    /// String literal; escapes are captured raw and processed by the parser.
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLit,

    // ============================================================
    // Structural tokens
    // ============================================================
    #[token("->")]
    Arrow,

    /// Any other printable ASCII character, passed through literally.
    /// Operators (built-in and user-defined) and all punctuation arrive here.
    #[regex(r"[!$-/:-@\[-\^`{-~]")]
    Op,

    /// End of file marker (appended by the `Lexer` wrapper, not by logos).
    Eof,

    /// Lexer error (unterminated string, stray byte).
    Error,
}

impl TokenKind {
    /// A human-readable description of the token kind for diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            TokenKind::Fn => "keyword `fn`",
            TokenKind::Extern => "keyword `extern`",
            TokenKind::If => "keyword `if`",
            TokenKind::Then => "keyword `then`",
            TokenKind::Else => "keyword `else`",
            TokenKind::For => "keyword `for`",
            TokenKind::In => "keyword `in`",
            TokenKind::Return => "keyword `return`",
            TokenKind::Binary => "keyword `binary`",
            TokenKind::Unary => "keyword `unary`",
            TokenKind::Var => "keyword `var`",
            TokenKind::Grab => "reserved keyword `grab`",
            TokenKind::Void => "keyword `void`",
            TokenKind::Double => "keyword `double`",
            TokenKind::Float => "keyword `float`",
            TokenKind::I8 => "keyword `i8`",
            TokenKind::I16 => "keyword `i16`",
            TokenKind::I32 => "keyword `i32`",
            TokenKind::I64 => "keyword `i64`",
            TokenKind::String => "keyword `string`",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::StringLit => "string literal",
            TokenKind::Arrow => "`->`",
            TokenKind::Op => "operator",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "invalid character",
        }
    }

    /// Whether this token can begin a typed parameter in a prototype.
    pub fn starts_param(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Double
                | TokenKind::Float
                | TokenKind::I8
                | TokenKind::I16
                | TokenKind::I32
                | TokenKind::I64
                | TokenKind::String
        )
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The lexer for Mare source code.
///
/// Yields spanned tokens and a single trailing [`TokenKind::Eof`].
#[derive(Clone)]
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    line_index: LineIndex,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            line_index: LineIndex::new(source),
            finished: false,
        }
    }

    /// The source text covered by a span.
    pub fn slice(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }

    fn spanned(&self, kind: TokenKind) -> Token {
        let range = self.inner.span();
        let (line, col) = self.line_index.line_col(range.start);
        Token::new(kind, Span::new(range.start, range.end, line, col))
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(Ok(kind)) => Some(self.spanned(kind)),
            Some(Err(())) => Some(self.spanned(TokenKind::Error)),
            None => {
                self.finished = true;
                let end = self.source.len();
                let (line, col) = self.line_index.line_col(end);
                Some(Token::new(TokenKind::Eof, Span::new(end, end, line, col)))
            }
        }
    }
}

// ============================================================
// Numeric literal classification
// ============================================================

/// The tagged value carried by a number token, in the narrowest fitting type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl NumberValue {
    /// The source type this value was tagged with.
    pub fn ty(&self) -> crate::ast::Ty {
        use crate::ast::Ty;
        match self {
            NumberValue::I8(_) => Ty::I8,
            NumberValue::I16(_) => Ty::I16,
            NumberValue::I32(_) => Ty::I32,
            NumberValue::I64(_) => Ty::I64,
            NumberValue::F32(_) => Ty::Float,
            NumberValue::F64(_) => Ty::Double,
        }
    }

    /// Extract an operator precedence in `[1, 100]`, truncating floating forms.
    pub fn as_operator_precedence(&self) -> Option<u32> {
        match *self {
            NumberValue::I8(v) => in_precedence_range(v as i64),
            NumberValue::I16(v) => in_precedence_range(v as i64),
            NumberValue::I32(v) => in_precedence_range(v as i64),
            NumberValue::I64(v) => in_precedence_range(v),
            NumberValue::F32(v) if (1.0..=100.0).contains(&v) => Some(v as u32),
            NumberValue::F64(v) if (1.0..=100.0).contains(&v) => Some(v as u32),
            _ => None,
        }
    }
}

fn in_precedence_range(v: i64) -> Option<u32> {
    if (1..=100).contains(&v) {
        Some(v as u32)
    } else {
        None
    }
}

/// A numeric literal that could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberLitError {
    /// The literal did not parse as a number at all.
    Malformed,
    /// An integer literal outside the i64 range.
    OutOfRange,
}

/// Classify the text of a number token.
///
/// Floating forms (containing `.` or carrying an `f`/`F` suffix) become
/// `float` when suffixed and `double` otherwise. Integer forms are parsed
/// as signed 64-bit and tagged with the narrowest width that holds them.
pub fn classify_number(text: &str) -> Result<NumberValue, NumberLitError> {
    let (digits, has_f_suffix) = match text.strip_suffix(['f', 'F']) {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let is_float_like = digits.contains('.');

    if has_f_suffix {
        let value = digits.parse::<f32>().map_err(|_| NumberLitError::Malformed)?;
        return Ok(NumberValue::F32(value));
    }
    if is_float_like {
        let value = digits.parse::<f64>().map_err(|_| NumberLitError::Malformed)?;
        return Ok(NumberValue::F64(value));
    }

    let value = digits.parse::<i64>().map_err(|_| NumberLitError::OutOfRange)?;
    Ok(if let Ok(v) = i8::try_from(value) {
        NumberValue::I8(v)
    } else if let Ok(v) = i16::try_from(value) {
        NumberValue::I16(v)
    } else if let Ok(v) = i32::try_from(value) {
        NumberValue::I32(v)
    } else {
        NumberValue::I64(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    fn lex_text(source: &str) -> Vec<(TokenKind, String)> {
        let lexer = Lexer::new(source);
        let source_copy = source.to_string();
        lexer
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| (t.kind, source_copy[t.span.start..t.span.end].to_string()))
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("fn extern if then else for in return binary unary var"),
            vec![
                TokenKind::Fn,
                TokenKind::Extern,
                TokenKind::If,
                TokenKind::Then,
                TokenKind::Else,
                TokenKind::For,
                TokenKind::In,
                TokenKind::Return,
                TokenKind::Binary,
                TokenKind::Unary,
                TokenKind::Var,
            ]
        );
    }

    #[test]
    fn test_keyword_aliases() {
        assert_eq!(lex("ret"), vec![TokenKind::Return]);
        assert_eq!(lex("int"), vec![TokenKind::I64]);
        assert_eq!(lex("flt"), vec![TokenKind::Float]);
    }

    #[test]
    fn test_type_keywords() {
        assert_eq!(
            lex("void double float i8 i16 i32 i64 string"),
            vec![
                TokenKind::Void,
                TokenKind::Double,
                TokenKind::Float,
                TokenKind::I8,
                TokenKind::I16,
                TokenKind::I32,
                TokenKind::I64,
                TokenKind::String,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            lex("foo _bar baz42 iffy"),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_arrow_vs_minus() {
        assert_eq!(
            lex_text("- -> -->"),
            vec![
                (TokenKind::Op, "-".into()),
                (TokenKind::Arrow, "->".into()),
                (TokenKind::Op, "-".into()),
                (TokenKind::Arrow, "->".into()),
            ]
        );
    }

    #[test]
    fn test_operator_chars() {
        assert_eq!(
            lex("( ) { } , ; = < > + * / | ! ^"),
            vec![TokenKind::Op; 15]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(lex("fn # comment to end of line\nvar"), vec![
            TokenKind::Fn,
            TokenKind::Var,
        ]);
        assert_eq!(lex("# only a comment"), vec![]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex_text(r#""hello" "a\"b" "two\nlines""#),
            vec![
                (TokenKind::StringLit, r#""hello""#.into()),
                (TokenKind::StringLit, r#""a\"b""#.into()),
                (TokenKind::StringLit, r#""two\nlines""#.into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let kinds = lex(r#""no closing quote"#);
        assert!(kinds.contains(&TokenKind::Error));
    }

    #[test]
    fn test_number_shapes() {
        assert_eq!(
            lex_text("1 3.14 3f 3.14f .5 40"),
            vec![
                (TokenKind::Number, "1".into()),
                (TokenKind::Number, "3.14".into()),
                (TokenKind::Number, "3f".into()),
                (TokenKind::Number, "3.14f".into()),
                (TokenKind::Number, ".5".into()),
                (TokenKind::Number, "40".into()),
            ]
        );
    }

    #[test]
    fn test_span_positions() {
        let tokens: Vec<_> = Lexer::new("fn main").collect();
        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 2);
        assert_eq!(tokens[1].span.start, 3);
        assert_eq!(tokens[1].span.end, 7);
        assert_eq!(tokens[1].span.start_line, 1);
        assert_eq!(tokens[1].span.start_col, 4);
    }

    #[test]
    fn test_integer_width_choice() {
        assert_eq!(classify_number("3"), Ok(NumberValue::I8(3)));
        assert_eq!(classify_number("127"), Ok(NumberValue::I8(127)));
        assert_eq!(classify_number("128"), Ok(NumberValue::I16(128)));
        assert_eq!(classify_number("32767"), Ok(NumberValue::I16(32767)));
        assert_eq!(classify_number("32768"), Ok(NumberValue::I32(32768)));
        assert_eq!(classify_number("2147483647"), Ok(NumberValue::I32(2147483647)));
        assert_eq!(classify_number("2147483648"), Ok(NumberValue::I64(2147483648)));
        assert_eq!(
            classify_number("9223372036854775807"),
            Ok(NumberValue::I64(i64::MAX))
        );
    }

    #[test]
    fn test_integer_out_of_range() {
        assert_eq!(
            classify_number("9223372036854775808"),
            Err(NumberLitError::OutOfRange)
        );
    }

    #[test]
    fn test_float_suffix() {
        assert_eq!(classify_number("3.14"), Ok(NumberValue::F64(3.14)));
        assert_eq!(classify_number("3.14f"), Ok(NumberValue::F32(3.14)));
        assert_eq!(classify_number("3f"), Ok(NumberValue::F32(3.0)));
        assert_eq!(classify_number("3"), Ok(NumberValue::I8(3)));
    }

    #[test]
    fn test_precedence_extraction() {
        assert_eq!(NumberValue::I8(5).as_operator_precedence(), Some(5));
        assert_eq!(NumberValue::I8(100).as_operator_precedence(), Some(100));
        assert_eq!(NumberValue::I8(0).as_operator_precedence(), None);
        assert_eq!(NumberValue::I16(101).as_operator_precedence(), None);
        assert_eq!(NumberValue::F64(30.0).as_operator_precedence(), Some(30));
        assert_eq!(NumberValue::F64(0.5).as_operator_precedence(), None);
    }
}
