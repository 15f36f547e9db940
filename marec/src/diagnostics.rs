//! Diagnostic reporting infrastructure.
//!
//! Every lex, parse, and emission failure is fatal: the first diagnostic
//! aborts the compilation with a non-zero exit. Diagnostics carry a
//! severity, an error code, the offending span, and optional suggestions;
//! the emitter loads the source line and underlines the span.
//!
//! # Error Codes
//!
//! - **E0001-E0099**: lexer errors
//! - **E0100-E0199**: parser errors
//! - **E0200-E0299**: emission (semantic) errors
//! - **E0300-E0399**: structural errors

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::span::Span;

/// Compiler error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // ============================================================
    // Lexer errors (E0001-E0099)
    // ============================================================
    /// Unexpected character in source.
    UnexpectedCharacter = 1,
    /// Unterminated string literal.
    UnclosedString = 2,
    /// Malformed numeric literal.
    InvalidNumber = 3,
    /// Integer literal outside the i64 range.
    IntegerOutOfRange = 4,

    // ============================================================
    // Parser errors (E0100-E0199)
    // ============================================================
    /// Unexpected token.
    UnexpectedToken = 100,
    /// Unexpected end of file.
    UnexpectedEof = 101,
    /// No expression starts with the current token.
    ExpectedExpression = 102,
    /// Expected an identifier.
    ExpectedIdentifier = 103,
    /// Expected a type name.
    ExpectedType = 104,
    /// Binary operator precedence outside `[1, 100]`.
    InvalidPrecedence = 105,
    /// Operator prototype with the wrong number of operands.
    InvalidOperatorArity = 106,
    /// Use of a reserved keyword.
    ReservedKeyword = 107,

    // ============================================================
    // Emission errors (E0200-E0299)
    // ============================================================
    /// Reference to a variable with no slot in scope.
    UnknownVariable = 200,
    /// Call to a function with no definition, extern, or prototype.
    UnknownFunction = 201,
    /// Call with the wrong number of arguments.
    ArgumentCountMismatch = 202,
    /// Assignment whose destination is not a variable.
    InvalidAssignmentTarget = 203,
    /// Condition or loop bound of a non-numeric type.
    UnsupportedConditionType = 204,
    /// Irreconcilable operand or arm types.
    MismatchedTypes = 205,
    /// Operator with no built-in meaning and no user definition.
    UnknownOperator = 206,
    /// Return shape does not match the declared return type.
    InvalidReturn = 207,
    /// Function failed IR verification.
    InvalidFunction = 208,
    /// Redefinition or conflicting signature.
    Redefinition = 209,
    /// A type that cannot be used in this position.
    UnsupportedType = 210,

    // ============================================================
    // Structural errors (E0300-E0399)
    // ============================================================
    /// No `fn main() -> void` in the program.
    MissingMain = 300,
}

impl ErrorCode {
    /// The formatted error code string (e.g. "E0200").
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// A help message suggesting how to fix the error, where one exists.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ErrorCode::UnclosedString => Some("add a closing `\"` to complete the string"),
            ErrorCode::InvalidPrecedence => {
                Some("operator precedence must be a number between 1 and 100")
            }
            ErrorCode::MissingMain => Some("define a top-level function: fn main() -> void"),
            _ => None,
        }
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Info,
}

impl Severity {
    fn to_report_kind(self) -> ReportKind<'static> {
        match self {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Note | Severity::Info => ReportKind::Advice,
        }
    }

    fn color(self) -> Color {
        match self {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
            Severity::Note => Color::Cyan,
            Severity::Info => Color::Blue,
        }
    }
}

/// A compiler diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// The error code (e.g. "E0200").
    pub code: Option<String>,
    pub message: String,
    /// The offending span. For emission errors this is the codegen cursor,
    /// which may differ from how far the lexer has already read.
    pub span: Span,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            span,
            suggestions: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            code: None,
            message: message.into(),
            span,
            suggestions: Vec::new(),
        }
    }

    /// Attach an error code, pulling in its canned help message if any.
    pub fn with_error_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code.as_str());
        if let Some(help) = code.help() {
            self.suggestions.push(help.to_string());
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Prints diagnostics to stderr with the offending line underlined.
pub struct DiagnosticEmitter<'a> {
    filename: &'a str,
    source: &'a str,
}

impl<'a> DiagnosticEmitter<'a> {
    pub fn new(filename: &'a str, source: &'a str) -> Self {
        Self { filename, source }
    }

    /// Emit a diagnostic to stderr.
    pub fn emit(&self, diagnostic: &Diagnostic) {
        let mut builder = Report::build(
            diagnostic.severity.to_report_kind(),
            self.filename,
            diagnostic.span.start,
        );

        let message = if let Some(code) = &diagnostic.code {
            format!("[{}] {}", code, diagnostic.message)
        } else {
            diagnostic.message.clone()
        };
        builder = builder.with_message(&message);

        // Underline at least one character, clamped to the source text.
        let start = diagnostic.span.start.min(self.source.len());
        let end = diagnostic
            .span
            .end
            .max(start + 1)
            .min(self.source.len())
            .max(start);
        builder = builder.with_label(
            Label::new((self.filename, start..end))
                .with_color(diagnostic.severity.color())
                .with_message(&diagnostic.message),
        );

        if !diagnostic.suggestions.is_empty() {
            builder = builder.with_help(diagnostic.suggestions.join("\n"));
        }

        let _ = builder
            .finish()
            .eprint((self.filename, Source::from(self.source)));
    }
}

/// Top-level compilation failure.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fatal source-level diagnostic (lex, parse, emission, structural).
    #[error("{}", .0.message)]
    Source(Diagnostic),

    /// A back-end failure (target machine, verification, object writing).
    #[error("{0}")]
    Backend(String),
}

impl From<Diagnostic> for CompileError {
    fn from(diagnostic: Diagnostic) -> Self {
        CompileError::Source(diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_formatting() {
        assert_eq!(ErrorCode::UnexpectedCharacter.as_str(), "E0001");
        assert_eq!(ErrorCode::UnknownVariable.as_str(), "E0200");
        assert_eq!(ErrorCode::MissingMain.as_str(), "E0300");
    }

    #[test]
    fn test_error_code_help_is_attached() {
        let diag = Diagnostic::error("missing required `main` function entry point", Span::dummy())
            .with_error_code(ErrorCode::MissingMain);
        assert_eq!(diag.code.as_deref(), Some("E0300"));
        assert_eq!(diag.suggestions.len(), 1);
    }
}
