//! Front end for schema source files.
//!
//! Schema files declare cubes, views, contexts and dashboard templates as
//! calls whose arguments are object literals:
//!
//! ```ignore
//! use cubeprop::dsl;
//!
//! let source = r#"
//!     cube(`Orders`, {
//!         sql: `SELECT * FROM orders WHERE ${FILTER_PARAMS.Orders.status.filter('status')}`,
//!
//!         measures: {
//!             count: { type: `count`, drillMembers: [id, createdAt] },
//!         },
//!
//!         dimensions: {
//!             status: { sql: `status`, type: `string` },
//!         },
//!     });
//! "#;
//!
//! let result = dsl::parse(source);
//! if let Some(program) = result.program {
//!     println!("Parsed {} statements", program.body.len());
//! }
//! for diag in &result.diagnostics {
//!     eprintln!("{}", diag);
//! }
//! ```
//!
//! Only the expression subset such files use is understood: literals,
//! template literals, arrays, objects, member access, calls, arrow functions
//! with expression bodies, and unary, binary and conditional operators.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::*;
pub use span::{Span, Spanned};

/// Result of parsing a schema source.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed program, if parsing succeeded.
    pub program: Option<Program>,
    /// Diagnostic messages (errors and warnings).
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// Returns true if parsing succeeded without errors.
    pub fn is_ok(&self) -> bool {
        self.program.is_some() && !self.has_errors()
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns only the error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The span in the source where the diagnostic applies.
    pub span: Span,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A fatal error that prevents compilation.
    Error,
    /// A warning that doesn't prevent compilation.
    Warning,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} (at {:?})", level, self.message, self.span)
    }
}

impl std::error::Error for Diagnostic {}

/// Parse a schema source string.
///
/// Returns a `ParseResult` containing the parsed program (if successful) and
/// any diagnostic messages.
pub fn parse(source: &str) -> ParseResult {
    use chumsky::error::Rich;
    use chumsky::input::Input;
    use chumsky::span::SimpleSpan;
    use chumsky::span::Span as _;
    use chumsky::Parser as _;

    // Step 1: Lexical analysis
    let (tokens, lex_errs) = lexer::lexer().parse(source).into_output_errors();

    let mut diagnostics: Vec<Diagnostic> = lex_errs
        .into_iter()
        .map(|e: Rich<'_, char>| {
            let span = e.span();
            Diagnostic::error(span.start()..span.end(), e.to_string())
        })
        .collect();

    let tokens: Vec<(lexer::Token<'_>, SimpleSpan)> = match tokens {
        Some(t) => t,
        None => {
            return ParseResult {
                program: None,
                diagnostics,
            };
        }
    };

    // Step 2: Parsing
    let len = source.len();
    let eoi: SimpleSpan = (len..len).into();
    let token_stream = tokens.as_slice().map(
        eoi,
        |(tok, span): &(lexer::Token<'_>, SimpleSpan)| (tok, span),
    );

    let (program, parse_errs) = parser::parser().parse(token_stream).into_output_errors();

    diagnostics.extend(
        parse_errs
            .into_iter()
            .map(|e: Rich<'_, lexer::Token<'_>, SimpleSpan>| {
                let span = e.span();
                Diagnostic::error(span.start()..span.end(), e.to_string())
            }),
    );

    ParseResult {
        program,
        diagnostics,
    }
}

/// Parse a single expression whose text starts at `offset` in a larger source.
///
/// Spans in the result and in the diagnostics are absolute, so template
/// substitutions report positions in the enclosing file.
pub fn parse_expression_at(source: &str, offset: usize) -> Result<Spanned<Expr>, Vec<Diagnostic>> {
    use chumsky::error::Rich;
    use chumsky::input::Input;
    use chumsky::prelude::end;
    use chumsky::span::SimpleSpan;
    use chumsky::span::Span as _;
    use chumsky::Parser as _;

    let tokens = lexer::lex(source).map_err(|errs| {
        errs.into_iter()
            .map(|e: Rich<'_, char>| {
                let span = e.span();
                Diagnostic::error(span.start() + offset..span.end() + offset, e.to_string())
            })
            .collect::<Vec<_>>()
    })?;

    let tokens: Vec<(lexer::Token<'_>, SimpleSpan)> = tokens
        .into_iter()
        .map(|(tok, span)| (tok, (span.start + offset..span.end + offset).into()))
        .collect();

    let stop = source.len() + offset;
    let eoi: SimpleSpan = (stop..stop).into();
    let token_stream = tokens.as_slice().map(
        eoi,
        |(tok, span): &(lexer::Token<'_>, SimpleSpan)| (tok, span),
    );

    let result = parser::expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .map(|e: Rich<'_, lexer::Token<'_>, SimpleSpan>| {
                    let span = e.span();
                    Diagnostic::error(span.start()..span.end(), e.to_string())
                })
                .collect()
        });
    result
}

/// Parse a schema source file.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be read.
pub fn parse_file(path: &std::path::Path) -> std::io::Result<ParseResult> {
    let source = std::fs::read_to_string(path)?;
    Ok(parse(&source))
}
