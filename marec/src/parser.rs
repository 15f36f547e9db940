//! Parser for Mare.
//!
//! A hand-written recursive descent parser with precedence climbing for
//! binary operators. The parser is strictly single-pass with one token of
//! lookahead; every production either consumes input or fails with a fatal
//! diagnostic.
//!
//! The parser owns the binary-operator precedence table. Parsing a
//! `binary` operator definition installs its precedence *before* the body
//! is parsed, so an operator may appear inside its own definition.
//!
//! # Example
//!
//! ```rust
//! use marec::Parser;
//!
//! let mut parser = Parser::new("fn add(i32 a, i32 b) -> i32 { a + b }");
//! let function = parser.parse_definition().expect("parse failed");
//! assert_eq!(function.proto.params.len(), 2);
//! ```


use std::collections::HashMap;

use crate::ast::*;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::lexer::{classify_number, Lexer, NumberLitError, Token, TokenKind};
use crate::span::Span;

type ParseResult<T> = Result<T, Diagnostic>;

/// Default precedence when a `binary` definition omits one.
const DEFAULT_BINARY_PRECEDENCE: u32 = 30;

/// The hint attached to malformed prototypes.
const PROTOTYPE_HINT: &str =
    "ensure function prototypes are declared as: fn name(type name, ...) -> return_type";

/// The Mare parser.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    source: &'src str,
    /// Current token (single lookahead).
    current: Token,
    /// Previous token, for span merging.
    previous: Token,
    /// Binary operator precedences, keyed by operator character.
    /// Mutated by user `binary` definitions; read on every climb step.
    binop_precedence: HashMap<char, i32>,
}

impl<'src> Parser<'src> {
    /// Create a parser and prime the first token.
    ///
    /// The default table is `<` `>` 10, `+` `-` 20, `*` 40, `/` 50, with
    /// assignment `=` binding loosest at 2.
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let eof = Token::new(TokenKind::Eof, Span::new(source.len(), source.len(), 1, 1));
        let current = lexer.next().unwrap_or(eof);

        let binop_precedence = HashMap::from([
            ('=', 2),
            ('<', 10),
            ('>', 10),
            ('+', 20),
            ('-', 20),
            ('*', 40),
            ('/', 50),
        ]);

        Self {
            lexer,
            source,
            current,
            previous: eof,
            binop_precedence,
        }
    }

    /// The mutable precedence table, shared with code generation so a failed
    /// operator definition can retract its installation.
    pub fn precedences_mut(&mut self) -> &mut HashMap<char, i32> {
        &mut self.binop_precedence
    }

    // ============================================================
    // Token handling
    // ============================================================

    /// The kind of the current token.
    pub fn current_kind(&self) -> TokenKind {
        self.current.kind
    }

    pub fn at_eof(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Whether the current token is the literal ASCII character `c`.
    pub fn at_op(&self, c: char) -> bool {
        self.op_char() == Some(c)
    }

    /// Advance to the next token, returning the one just consumed.
    pub fn bump(&mut self) -> Token {
        self.previous = self.current;
        if self.current.kind != TokenKind::Eof {
            let end = self.source.len();
            self.current = self.lexer.next().unwrap_or(Token::new(
                TokenKind::Eof,
                Span::new(end, end, self.previous.span.start_line, 1),
            ));
        }
        self.previous
    }

    fn text(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }

    fn current_text(&self) -> &'src str {
        self.text(&self.current.span)
    }

    /// The character carried by the current token, when it is an `Op`.
    fn op_char(&self) -> Option<char> {
        if self.current.kind == TokenKind::Op {
            self.current_text().chars().next()
        } else {
            None
        }
    }

    fn eat_op(&mut self, c: char) -> bool {
        if self.at_op(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, c: char) -> ParseResult<()> {
        if self.eat_op(c) {
            Ok(())
        } else {
            Err(self.expected(&format!("`{c}`")))
        }
    }

    fn expect_kind(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.current.kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(self.expected(kind.description()))
        }
    }

    /// Consume an identifier and return its text.
    fn expect_ident(&mut self, context: &str) -> ParseResult<String> {
        if self.current.kind == TokenKind::Ident {
            let name = self.current_text().to_string();
            self.bump();
            Ok(name)
        } else {
            Err(Diagnostic::error(
                format!("expected identifier {context}, found {}", self.found()),
                self.current.span,
            )
            .with_error_code(ErrorCode::ExpectedIdentifier))
        }
    }

    fn found(&self) -> String {
        match self.current.kind {
            TokenKind::Op => format!("`{}`", self.current_text()),
            kind => kind.description().to_string(),
        }
    }

    fn expected(&self, what: &str) -> Diagnostic {
        let code = if self.at_eof() {
            ErrorCode::UnexpectedEof
        } else {
            ErrorCode::UnexpectedToken
        };
        Diagnostic::error(
            format!("expected {what}, found {}", self.found()),
            self.current.span,
        )
        .with_error_code(code)
    }

    /// Precedence of the pending binary operator, or -1 to stop climbing.
    fn tok_precedence(&self) -> i32 {
        match self.op_char() {
            Some(c) => self.binop_precedence.get(&c).copied().unwrap_or(-1),
            None => -1,
        }
    }

    // ============================================================
    // Expressions
    // ============================================================

    /// expression ::= 'return' expression? | unary binoprhs
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        if self.current.kind == TokenKind::Return {
            return self.parse_return();
        }
        let lhs = self.parse_unary()?;
        self.parse_binop_rhs(0, lhs)
    }

    /// Climb binary operators binding at least as tightly as `min_prec`.
    fn parse_binop_rhs(&mut self, min_prec: i32, mut lhs: Expr) -> ParseResult<Expr> {
        loop {
            let tok_prec = self.tok_precedence();
            if tok_prec < min_prec {
                return Ok(lhs);
            }

            // Guaranteed present: tok_precedence only succeeds on Op tokens.
            let op = self.op_char().expect("binary operator token");
            self.bump();

            let mut rhs = self.parse_unary()?;

            // If the operator after rhs binds tighter, let it take rhs first.
            let next_prec = self.tok_precedence();
            if tok_prec < next_prec {
                rhs = self.parse_binop_rhs(tok_prec + 1, rhs)?;
            }

            let span = lhs.span.merge(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
    }

    /// unary ::= primary | op unary
    ///
    /// Any ASCII operator token other than `(` or `,` is taken as a unary
    /// operator; all unary operators are user-defined.
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        match self.op_char() {
            Some(op) if op != '(' && op != ',' => {
                let start = self.current.span;
                self.bump();
                let operand = self.parse_unary()?;
                let span = start.merge(operand.span);
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            _ => self.parse_primary(),
        }
    }

    /// primary ::= identifierexpr | numberexpr | parenexpr | ifexpr
    ///           | forexpr | varexpr | stringexpr
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.current.kind {
            TokenKind::Ident => self.parse_identifier_expr(),
            TokenKind::Number => self.parse_number_expr(),
            TokenKind::StringLit => self.parse_string_expr(),
            TokenKind::If => self.parse_if_expr(),
            TokenKind::For => self.parse_for_expr(),
            TokenKind::Var => self.parse_var_expr(),
            TokenKind::Op if self.at_op('(') => self.parse_paren_expr(),
            TokenKind::Grab => Err(Diagnostic::error(
                "`grab` is reserved and not yet usable",
                self.current.span,
            )
            .with_error_code(ErrorCode::ReservedKeyword)),
            TokenKind::Error => Err(self.lex_error()),
            _ => Err(Diagnostic::error(
                format!(
                    "unknown token when expecting an expression: found {}",
                    self.found()
                ),
                self.current.span,
            )
            .with_error_code(ErrorCode::ExpectedExpression)),
        }
    }

    fn lex_error(&self) -> Diagnostic {
        if self.current_text().starts_with('"') {
            Diagnostic::error("unterminated string literal", self.current.span)
                .with_error_code(ErrorCode::UnclosedString)
        } else {
            Diagnostic::error(
                format!("unexpected character `{}`", self.current_text()),
                self.current.span,
            )
            .with_error_code(ErrorCode::UnexpectedCharacter)
        }
    }

    /// numberexpr ::= number
    fn parse_number_expr(&mut self) -> ParseResult<Expr> {
        let span = self.current.span;
        let value = classify_number(self.current_text()).map_err(|err| match err {
            NumberLitError::Malformed => {
                Diagnostic::error("invalid number literal", span)
                    .with_error_code(ErrorCode::InvalidNumber)
            }
            NumberLitError::OutOfRange => {
                Diagnostic::error("integer literal out of range", span)
                    .with_error_code(ErrorCode::IntegerOutOfRange)
            }
        })?;
        self.bump();
        Ok(Expr::new(ExprKind::Number(value), span))
    }

    /// stringexpr ::= string-literal
    fn parse_string_expr(&mut self) -> ParseResult<Expr> {
        let span = self.current.span;
        let raw = self.current_text();
        let bytes = process_escapes(&raw[1..raw.len() - 1]);
        self.bump();
        Ok(Expr::new(ExprKind::Str(bytes), span))
    }

    /// parenexpr ::= '(' expression ')'
    fn parse_paren_expr(&mut self) -> ParseResult<Expr> {
        self.bump(); // eat '('
        let expr = self.parse_expression()?;
        self.expect_op(')')?;
        Ok(expr)
    }

    /// identifierexpr ::= identifier | identifier '(' expression* ')'
    fn parse_identifier_expr(&mut self) -> ParseResult<Expr> {
        let span = self.current.span;
        let name = self.current_text().to_string();
        self.bump();

        if !self.at_op('(') {
            return Ok(Expr::new(ExprKind::Variable(name), span));
        }

        self.bump(); // eat '('
        let mut args = Vec::new();
        if !self.at_op(')') {
            loop {
                args.push(self.parse_expression()?);
                if self.at_op(')') {
                    break;
                }
                if !self.at_op(',') {
                    return Err(self.expected("`)` or `,` in argument list"));
                }
                self.bump();
            }
        }
        let end = self.current.span;
        self.bump(); // eat ')'

        Ok(Expr::new(
            ExprKind::Call { callee: name, args },
            span.merge(end),
        ))
    }

    /// ifexpr ::= 'if' expression 'then' expression 'else' expression
    fn parse_if_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        self.bump(); // eat 'if'

        let cond = self.parse_expression()?;
        self.expect_kind(TokenKind::Then)?;
        let then_expr = self.parse_expression()?;
        self.expect_kind(TokenKind::Else)?;
        let else_expr = self.parse_expression()?;

        let span = start.merge(else_expr.span);
        Ok(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// forexpr ::= 'for' identifier '=' expr ',' expr (',' expr)? 'in' expression
    fn parse_for_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        self.bump(); // eat 'for'

        let var = self.expect_ident("after `for`")?;
        self.expect_op('=')?;
        let start_expr = self.parse_expression()?;
        self.expect_op(',')?;
        let end_expr = self.parse_expression()?;

        let step = if self.eat_op(',') {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        self.expect_kind(TokenKind::In)?;
        let body = self.parse_expression()?;

        let span = start.merge(body.span);
        Ok(Expr::new(
            ExprKind::For {
                var,
                start: Box::new(start_expr),
                end: Box::new(end_expr),
                step,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// varexpr ::= 'var' identifier '=' expression
    fn parse_var_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        self.bump(); // eat 'var'

        let name = self.expect_ident("after `var`")?;
        self.expect_op('=')?;
        let init = self.parse_expression()?;

        let span = start.merge(init.span);
        Ok(Expr::new(
            ExprKind::Var {
                name,
                init: Some(Box::new(init)),
            },
            span,
        ))
    }

    /// returnexpr ::= 'return' expression?
    ///
    /// The trailing `;`, if any, is left for the caller (the block).
    fn parse_return(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        self.bump(); // eat 'return'

        if self.at_op(';') || self.at_op('}') || self.at_eof() {
            return Ok(Expr::new(ExprKind::Return(None), start));
        }

        let lhs = self.parse_unary()?;
        let value = self.parse_binop_rhs(0, lhs)?;
        let span = start.merge(value.span);
        Ok(Expr::new(ExprKind::Return(Some(Box::new(value))), span))
    }

    /// block ::= (expression ';'?)* up to the matching '}' (or end of file).
    ///
    /// The opening `{` has already been consumed; the closing `}` is eaten.
    fn parse_block(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        let mut exprs = Vec::new();

        loop {
            if self.at_op('}') {
                self.bump();
                break;
            }
            if self.at_eof() {
                break;
            }

            exprs.push(self.parse_expression()?);

            if self.at_op(';') {
                self.bump();
            }
        }

        let span = start.merge(self.previous.span);
        Ok(Expr::new(ExprKind::Block(exprs), span))
    }

    // ============================================================
    // Prototypes and top-level forms
    // ============================================================

    /// One typed parameter: `[type] name`, with the type defaulting to
    /// `double` when omitted. `void` is not permitted here.
    fn parse_typed_argument(&mut self) -> ParseResult<Param> {
        let ty = match self.current.kind {
            TokenKind::Double | TokenKind::Ident => Ty::Double,
            TokenKind::Float => Ty::Float,
            TokenKind::I8 => Ty::I8,
            TokenKind::I16 => Ty::I16,
            TokenKind::I32 => Ty::I32,
            TokenKind::I64 => Ty::I64,
            TokenKind::String => Ty::Str,
            _ => {
                return Err(self
                    .expected("a parameter type or name in argument list")
                    .with_suggestion(PROTOTYPE_HINT))
            }
        };

        if self.current.kind != TokenKind::Ident {
            self.bump(); // eat the type token
        }

        if self.current.kind != TokenKind::Ident {
            return Err(Diagnostic::error(
                format!("expected argument name after type, found {}", self.found()),
                self.current.span,
            )
            .with_error_code(ErrorCode::ExpectedIdentifier)
            .with_suggestion(PROTOTYPE_HINT));
        }
        let name = self.current_text().to_string();
        self.bump();

        Ok(Param { name, ty })
    }

    fn parse_return_type(&mut self) -> ParseResult<Ty> {
        let ty = match self.current.kind {
            TokenKind::Void => Ty::Void,
            TokenKind::Double => Ty::Double,
            TokenKind::Float => Ty::Float,
            TokenKind::I8 => Ty::I8,
            TokenKind::I16 => Ty::I16,
            TokenKind::I32 => Ty::I32,
            TokenKind::I64 => Ty::I64,
            TokenKind::String => Ty::Str,
            _ => {
                return Err(Diagnostic::error(
                    format!("expected return type after `->`, found {}", self.found()),
                    self.current.span,
                )
                .with_error_code(ErrorCode::ExpectedType)
                .with_suggestion(PROTOTYPE_HINT))
            }
        };
        self.bump();
        Ok(ty)
    }

    /// prototype ::= name '(' params? ')' ('->' type)?
    ///             | 'unary' op '(' params? ')' ('->' type)?
    ///             | 'binary' op number? '(' params? ')' ('->' type)?
    pub fn parse_prototype(&mut self) -> ParseResult<Prototype> {
        let start = self.current.span;

        let (name, kind) = match self.current.kind {
            TokenKind::Ident => {
                let name = self.current_text().to_string();
                self.bump();
                (name, FnKind::Plain)
            }
            TokenKind::Unary => {
                self.bump();
                let Some(op) = self.op_char() else {
                    return Err(self
                        .expected("a unary operator character")
                        .with_suggestion(PROTOTYPE_HINT));
                };
                self.bump();
                (format!("{UNARY_OP_PREFIX}{op}"), FnKind::UnaryOp(op))
            }
            TokenKind::Binary => {
                self.bump();
                let Some(op) = self.op_char() else {
                    return Err(self
                        .expected("a binary operator character")
                        .with_suggestion(PROTOTYPE_HINT));
                };
                self.bump();

                let mut precedence = DEFAULT_BINARY_PRECEDENCE;
                if self.current.kind == TokenKind::Number {
                    let span = self.current.span;
                    let value = classify_number(self.current_text()).map_err(|_| {
                        Diagnostic::error("invalid precedence: must be 1..100", span)
                            .with_error_code(ErrorCode::InvalidPrecedence)
                    })?;
                    precedence = value.as_operator_precedence().ok_or_else(|| {
                        Diagnostic::error("invalid precedence: must be 1..100", span)
                            .with_error_code(ErrorCode::InvalidPrecedence)
                    })?;
                    self.bump();
                }

                (
                    format!("{BINARY_OP_PREFIX}{op}"),
                    FnKind::BinaryOp { op, precedence },
                )
            }
            _ => {
                return Err(Diagnostic::error(
                    format!("expected function name in prototype, found {}", self.found()),
                    self.current.span,
                )
                .with_error_code(ErrorCode::UnexpectedToken)
                .with_suggestion(PROTOTYPE_HINT))
            }
        };

        if !self.eat_op('(') {
            return Err(self
                .expected("`(` in prototype")
                .with_suggestion(PROTOTYPE_HINT));
        }

        let mut params = Vec::new();
        while self.current.kind.starts_param() {
            params.push(self.parse_typed_argument()?);
            if self.at_op(',') {
                self.bump();
            }
        }

        if !self.eat_op(')') {
            return Err(self
                .expected("`)` in argument declaration")
                .with_suggestion(PROTOTYPE_HINT));
        }

        let ret = if self.current.kind == TokenKind::Arrow {
            self.bump();
            self.parse_return_type()?
        } else {
            Ty::Void
        };

        if let Some(arity) = kind.arity() {
            if params.len() != arity {
                return Err(Diagnostic::error(
                    format!(
                        "invalid number of operands for operator: expected {arity}, found {}",
                        params.len()
                    ),
                    start.merge(self.previous.span),
                )
                .with_error_code(ErrorCode::InvalidOperatorArity));
            }
        }

        Ok(Prototype {
            name,
            params,
            ret,
            kind,
            span: start.merge(self.previous.span),
        })
    }

    /// definition ::= 'fn' prototype '{' block '}'
    pub fn parse_definition(&mut self) -> ParseResult<Function> {
        let start = self.current.span;
        self.bump(); // eat 'fn'

        let proto = self.parse_prototype()?;

        // Install the operator's precedence before the body parses, so the
        // operator can be used recursively inside its own definition.
        if let FnKind::BinaryOp { op, precedence } = proto.kind {
            self.binop_precedence.insert(op, precedence as i32);
        }

        if !self.eat_op('{') {
            return Err(self.expected("`{` to start function body"));
        }
        let body = self.parse_block()?;

        let span = start.merge(body.span);
        Ok(Function { proto, body, span })
    }

    /// external ::= 'extern' prototype
    ///
    /// Operator prototypes cannot be declared extern; only named functions.
    pub fn parse_extern(&mut self) -> ParseResult<Prototype> {
        self.bump(); // eat 'extern'

        if self.current.kind != TokenKind::Ident {
            return Err(Diagnostic::error(
                format!("expected function name after `extern`, found {}", self.found()),
                self.current.span,
            )
            .with_error_code(ErrorCode::ExpectedIdentifier)
            .with_suggestion(PROTOTYPE_HINT));
        }

        self.parse_prototype()
    }

    /// toplevelexpr ::= expression, wrapped in an anonymous void function.
    pub fn parse_top_level_expr(&mut self) -> ParseResult<Function> {
        let body = self.parse_expression()?;
        let span = body.span;
        Ok(Function {
            proto: Prototype {
                name: ANON_FN_NAME.to_string(),
                params: Vec::new(),
                ret: Ty::Void,
                kind: FnKind::Plain,
                span,
            },
            body,
            span,
        })
    }
}

// ============================================================
// String escape processing
// ============================================================

/// Process escape sequences in the raw contents of a string literal.
///
/// Recognised: `\n \r \t \b \f \v \0 \\ \"`, `\xHH` (two hex digits) and
/// `\uHHHH` (four hex digits, truncated to a single byte). Unrecognised or
/// malformed escapes are preserved verbatim.
pub fn process_escapes(raw: &str) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        match bytes[i + 1] {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'v' => out.push(0x0B),
            b'0' => out.push(0),
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            b'x' => {
                if let Some(value) = parse_hex(&bytes[i + 2..], 2) {
                    out.push(value as u8);
                    i += 4;
                    continue;
                }
                out.extend_from_slice(&bytes[i..i + 2]);
            }
            b'u' => {
                if let Some(value) = parse_hex(&bytes[i + 2..], 4) {
                    out.push((value & 0xFF) as u8);
                    i += 6;
                    continue;
                }
                out.extend_from_slice(&bytes[i..i + 2]);
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
        i += 2;
    }

    out
}

fn parse_hex(bytes: &[u8], digits: usize) -> Option<u32> {
    if bytes.len() < digits {
        return None;
    }
    let text = std::str::from_utf8(&bytes[..digits]).ok()?;
    u32::from_str_radix(text, 16).ok()
}
