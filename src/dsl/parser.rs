//! Parser for schema source files using chumsky.
//!
//! Transforms the token stream from the lexer into the owned syntax tree in
//! [`super::ast`]. Template literal substitutions are parsed by re-entering
//! the expression parser on the substitution text.

use chumsky::input::ValueInput;
use chumsky::prelude::*;

use super::ast::*;
use super::lexer::{unescape, Token};
use super::span::Spanned;

/// Convert a SimpleSpan to our Span type (Range<usize>)
fn to_span(span: SimpleSpan) -> std::ops::Range<usize> {
    span.start..span.end
}

/// Left-fold one precedence level of binary operators.
fn fold_binary((head, rest): (Spanned<Expr>, Vec<(BinaryOp, Spanned<Expr>)>)) -> Spanned<Expr> {
    rest.into_iter().fold(head, |left, (op, right)| {
        let span = left.span.start..right.span.end;
        Spanned::new(
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    })
}

/// A postfix operation applied to a primary expression.
enum Postfix {
    Member(Spanned<String>),
    Index(Spanned<Expr>),
    Call(Vec<Spanned<Expr>>),
}

/// Create the main parser: a whole source file.
pub fn parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Program, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    let separators = just(Token::Semicolon).repeated();

    separators
        .clone()
        .ignore_then(
            expr_parser()
                .then_ignore(separators)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(end())
        .map(|body| Program { body })
}

/// Create a parser for a single expression.
pub fn expr_parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Spanned<Expr>, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    recursive(|expr| {
        // ==================================================================
        // Primary expressions
        // ==================================================================

        let ident = select! {
            Token::Ident(s) => s.to_string(),
        }
        .labelled("identifier");

        let literal = select! {
            Token::Str(s) => Expr::Str(unescape(s)),
            Token::Number(n) => Expr::Number(n.to_string()),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
        }
        .labelled("literal");

        // Substitution offsets are relative to the text after the backtick
        let template = select! {
            Token::Template(raw) => raw,
        }
        .try_map(|raw, span: SimpleSpan| {
            parse_template(raw, span.start + 1)
                .map(Expr::Template)
                .map_err(|msg| Rich::custom(span, msg))
        })
        .labelled("template literal");

        let items = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let array = items
            .clone()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Expr::Array);

        let key = choice((
            ident.clone().map(PropertyKey::Ident),
            select! {
                Token::Str(s) => PropertyKey::Str(unescape(s)),
                Token::Number(n) => PropertyKey::Number(n.to_string()),
            },
            expr.clone()
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .map(|e| PropertyKey::Computed(Box::new(e))),
        ))
        .map_with(|k, e| Spanned::new(k, to_span(e.span())));

        let keyed_property = key
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .map(|(key, value)| Property {
                key,
                value,
                shorthand: false,
            });

        // { name } is sugar for { name: name }
        let shorthand_property = ident.clone().map_with(|name, e| {
            let span = to_span(e.span());
            Property {
                key: Spanned::new(PropertyKey::Ident(name.clone()), span.clone()),
                value: Spanned::new(Expr::Ident(name), span),
                shorthand: true,
            }
        });

        let object = keyed_property
            .or(shorthand_property)
            .map_with(|p, e| Spanned::new(p, to_span(e.span())))
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(Expr::Object);

        let parenthesized = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let primary = choice((
            literal,
            template,
            ident.clone().map(Expr::Ident),
            array,
            object,
        ))
        .map_with(|value, e| Spanned::new(value, to_span(e.span())))
        .or(parenthesized)
        .boxed();

        // ==================================================================
        // Member access and calls: a.b, a[b], a(b)
        // ==================================================================

        let postfix = choice((
            just(Token::Dot)
                .ignore_then(
                    ident
                        .clone()
                        .map_with(|n, e| Spanned::new(n, to_span(e.span()))),
                )
                .map(Postfix::Member),
            expr.clone()
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .map(Postfix::Index),
            items
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .map(Postfix::Call),
        ))
        .map_with(|op, e| (op, to_span(e.span())));

        let member_or_call = primary
            .then(postfix.repeated().collect::<Vec<_>>())
            .map(|(head, ops)| {
                ops.into_iter().fold(head, |acc, (op, op_span)| {
                    let span = acc.span.start..op_span.end;
                    let value = match op {
                        Postfix::Member(name) => Expr::Member {
                            object: Box::new(acc),
                            property: Box::new(name.map(Expr::Ident)),
                            computed: false,
                        },
                        Postfix::Index(index) => Expr::Member {
                            object: Box::new(acc),
                            property: Box::new(index),
                            computed: true,
                        },
                        Postfix::Call(args) => Expr::Call {
                            callee: Box::new(acc),
                            args,
                        },
                    };
                    Spanned::new(value, span)
                })
            })
            .boxed();

        // ==================================================================
        // Operators
        // ==================================================================

        let unary_op = select! {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
        }
        .map_with(|op, e| (op, to_span(e.span())));

        let unary = unary_op
            .repeated()
            .collect::<Vec<_>>()
            .then(member_or_call)
            .map(|(ops, arg)| {
                ops.into_iter().rev().fold(arg, |acc, (op, op_span)| {
                    let span = op_span.start..acc.span.end;
                    Spanned::new(
                        Expr::Unary {
                            op,
                            arg: Box::new(acc),
                        },
                        span,
                    )
                })
            })
            .boxed();

        let product_op = select! {
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Rem,
        };
        let product = unary
            .clone()
            .then(product_op.then(unary).repeated().collect::<Vec<_>>())
            .map(fold_binary)
            .boxed();

        let sum_op = select! {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
        };
        let sum = product
            .clone()
            .then(sum_op.then(product).repeated().collect::<Vec<_>>())
            .map(fold_binary)
            .boxed();

        let comparison_op = select! {
            Token::Lt => BinaryOp::Lt,
            Token::Gt => BinaryOp::Gt,
            Token::LtEq => BinaryOp::LtEq,
            Token::GtEq => BinaryOp::GtEq,
        };
        let comparison = sum
            .clone()
            .then(comparison_op.then(sum).repeated().collect::<Vec<_>>())
            .map(fold_binary)
            .boxed();

        let equality_op = select! {
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::EqEqEq => BinaryOp::StrictEq,
            Token::NotEqEq => BinaryOp::StrictNotEq,
        };
        let equality = comparison
            .clone()
            .then(equality_op.then(comparison).repeated().collect::<Vec<_>>())
            .map(fold_binary)
            .boxed();

        let and = equality
            .clone()
            .then(
                just(Token::AndAnd)
                    .to(BinaryOp::And)
                    .then(equality)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let or_op = select! {
            Token::OrOr => BinaryOp::Or,
            Token::Nullish => BinaryOp::Nullish,
        };
        let or = and
            .clone()
            .then(or_op.then(and).repeated().collect::<Vec<_>>())
            .map(fold_binary)
            .boxed();

        let conditional = or
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(test, branches)| match branches {
                None => test,
                Some((consequent, alternate)) => {
                    let span = test.span.start..alternate.span.end;
                    Spanned::new(
                        Expr::Conditional {
                            test: Box::new(test),
                            consequent: Box::new(consequent),
                            alternate: Box::new(alternate),
                        },
                        span,
                    )
                }
            });

        // ==================================================================
        // Arrow functions: x => e, (a, b) => e
        // ==================================================================

        let param = ident.map_with(|n, e| Spanned::new(n, to_span(e.span())));

        let params = choice((
            param.clone().map(|p| vec![p]),
            param
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        ));

        let arrow = params
            .then_ignore(just(Token::FatArrow))
            .then(expr)
            .map_with(|(params, body), e| {
                Spanned::new(
                    Expr::Arrow {
                        params,
                        body: Box::new(body),
                    },
                    to_span(e.span()),
                )
            });

        // Arrow first: its parameter list would otherwise parse as an operand
        choice((arrow, conditional))
    })
}

/// Split raw template text into static chunks and parsed substitutions.
///
/// `base` is the absolute source offset of the first character of `raw`.
fn parse_template(raw: &str, base: usize) -> Result<Template, String> {
    let bytes = raw.as_bytes();
    let mut quasis = Vec::new();
    let mut exprs = Vec::new();
    let mut chunk_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let expr_start = i + 2;
                let expr_end = find_substitution_end(bytes, expr_start)
                    .ok_or_else(|| "unterminated `${` in template literal".to_string())?;

                let chunk = &raw[chunk_start..i];
                quasis.push(TemplateChunk {
                    raw: chunk.to_string(),
                    cooked: unescape(chunk),
                });

                let expr = super::parse_expression_at(&raw[expr_start..expr_end], base + expr_start)
                    .map_err(|diags| {
                        diags
                            .into_iter()
                            .next()
                            .map(|d| d.message)
                            .unwrap_or_else(|| "invalid template substitution".to_string())
                    })?;
                exprs.push(expr);

                i = expr_end + 1;
                chunk_start = i;
            }
            _ => i += 1,
        }
    }

    let tail = &raw[chunk_start.min(raw.len())..];
    quasis.push(TemplateChunk {
        raw: tail.to_string(),
        cooked: unescape(tail),
    });

    Ok(Template { quasis, exprs })
}

/// Find the `}` closing a substitution that starts at `start`.
///
/// Braces nest; quoted strings inside the substitution are skipped.
fn find_substitution_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}
