//! Lexer for schema source files.
//!
//! Converts source text into a sequence of tokens with span information.
//! Only the expression subset used by schema definitions is recognized.

use chumsky::prelude::*;

/// A token in a schema source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // ========================================================================
    // Keywords
    // ========================================================================
    True,
    False,
    Null,

    // ========================================================================
    // Literals
    // ========================================================================
    /// An identifier (not a keyword).
    Ident(&'src str),
    /// A single- or double-quoted string (raw contents without quotes).
    Str(&'src str),
    /// A number literal.
    Number(&'src str),
    /// A template literal (raw contents without backticks).
    Template(&'src str),

    // ========================================================================
    // Punctuation
    // ========================================================================
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `=>`
    FatArrow,

    // ========================================================================
    // Operators
    // ========================================================================
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `!`
    Bang,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`
    NotEq,
    /// `!==`
    NotEqEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `??`
    Nullish,
}

impl<'src> std::fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),

            Token::Ident(s) => write!(f, "{}", s),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Number(s) => write!(f, "{}", s),
            Token::Template(s) => write!(f, "`{}`", s),

            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::FatArrow => write!(f, "=>"),

            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Bang => write!(f, "!"),
            Token::EqEq => write!(f, "=="),
            Token::EqEqEq => write!(f, "==="),
            Token::NotEq => write!(f, "!="),
            Token::NotEqEq => write!(f, "!=="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Nullish => write!(f, "??"),
        }
    }
}

/// Map an identifier string to a keyword token or return Ident.
fn keyword_or_ident(s: &str) -> Token<'_> {
    match s {
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        _ => Token::Ident(s),
    }
}

/// Create a lexer for schema source text.
///
/// Returns a parser that tokenizes the input string into a sequence of
/// tokens with span information, skipping whitespace and comments.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    let ident = text::ident().map(keyword_or_ident);

    // A backslash escapes whatever follows it; unescaping happens later
    let escape = just('\\').then(any()).ignored();

    let double_quoted = just('"')
        .ignore_then(
            escape
                .clone()
                .or(none_of("\\\"\n").ignored())
                .repeated()
                .to_slice(),
        )
        .then_ignore(just('"'));

    let single_quoted = just('\'')
        .ignore_then(
            escape
                .clone()
                .or(none_of("\\'\n").ignored())
                .repeated()
                .to_slice(),
        )
        .then_ignore(just('\''));

    let string_lit = double_quoted.or(single_quoted).map(Token::Str);

    // Substitutions stay in the raw text; the parser splits them out
    let template = just('`')
        .ignore_then(escape.or(none_of("\\`").ignored()).repeated().to_slice())
        .then_ignore(just('`'))
        .map(Token::Template);

    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(Token::Number);

    // Multi-char operators first, longest match wins
    let operator = choice((
        just("===").to(Token::EqEqEq),
        just("!==").to(Token::NotEqEq),
        just("==").to(Token::EqEq),
        just("!=").to(Token::NotEq),
        just("=>").to(Token::FatArrow),
        just("<=").to(Token::LtEq),
        just(">=").to(Token::GtEq),
        just("&&").to(Token::AndAnd),
        just("||").to(Token::OrOr),
        just("??").to(Token::Nullish),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('!').to(Token::Bang),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('?').to(Token::Question),
    ));

    let punctuation = choice((
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
        just(';').to(Token::Semicolon),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        just(':').to(Token::Colon),
    ));

    let single_line_comment = just("//")
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();

    let multi_line_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .ignored();

    let comment = single_line_comment.or(multi_line_comment);

    let token = choice((ident, number, string_lit, template, operator, punctuation))
        .map_with(|tok, e| (tok, e.span()));

    token
        .padded_by(comment.padded().repeated())
        .padded()
        .repeated()
        .collect()
        .padded_by(comment.padded().repeated())
        .padded()
        .then_ignore(end())
}

/// Lex a source string into tokens.
///
/// Returns Ok with the token list on success, or Err with the lexer errors.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}

/// Resolve backslash escapes in the raw contents of a string or template chunk.
///
/// Handles the single-character escapes, `\xHH`, `\uHHHH` (joining surrogate
/// pairs), `\u{H..}` and line continuations. Other escapes yield the escaped
/// character itself, so `\$` becomes `$`. A malformed hex escape is kept
/// verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let Some(next) = after.chars().next() else {
            out.push('\\');
            return out;
        };
        let consumed = match next {
            'n' => push_one(&mut out, '\n'),
            't' => push_one(&mut out, '\t'),
            'r' => push_one(&mut out, '\r'),
            'b' => push_one(&mut out, '\u{8}'),
            'f' => push_one(&mut out, '\u{c}'),
            'v' => push_one(&mut out, '\u{b}'),
            '0' if !after[1..].starts_with(|c: char| c.is_ascii_digit()) => push_one(&mut out, '\0'),
            '\n' => 1,
            '\r' if after[1..].starts_with('\n') => 2,
            '\r' | '\u{2028}' | '\u{2029}' => next.len_utf8(),
            'x' => hex_escape(after, &mut out),
            'u' => unicode_escape(after, &mut out),
            other => push_one(&mut out, other),
        };
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

fn push_one(out: &mut String, c: char) -> usize {
    out.push(c);
    1
}

/// `x` followed by exactly two hex digits. Returns the bytes consumed.
fn hex_escape(after: &str, out: &mut String) -> usize {
    match after.get(1..3).and_then(|hex| parse_hex(hex, 2)).and_then(char::from_u32) {
        Some(c) => {
            out.push(c);
            3
        }
        None => push_verbatim(out, 'x'),
    }
}

/// `u{H..}` or `uHHHH`, with a following `\uHHHH` low surrogate joined.
fn unicode_escape(after: &str, out: &mut String) -> usize {
    if let Some(braced) = after[1..].strip_prefix('{') {
        let code = braced
            .find('}')
            .and_then(|end| parse_hex(&braced[..end], 6).map(|code| (code, end)));
        return match code.and_then(|(code, end)| char::from_u32(code).map(|c| (c, end))) {
            Some((c, end)) => {
                out.push(c);
                // `u{` + digits + `}`
                end + 3
            }
            None => push_verbatim(out, 'u'),
        };
    }

    let Some(high) = after.get(1..5).and_then(|hex| parse_hex(hex, 4)) else {
        return push_verbatim(out, 'u');
    };
    if (0xD800..0xDC00).contains(&high) {
        let low = after
            .get(5..7)
            .filter(|prefix| *prefix == "\\u")
            .and_then(|_| after.get(7..11))
            .and_then(|hex| parse_hex(hex, 4))
            .filter(|low| (0xDC00..0xE000).contains(low));
        if let Some(low) = low {
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            if let Some(c) = char::from_u32(code) {
                out.push(c);
                return 11;
            }
        }
    }
    out.push(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER));
    5
}

/// Keep a malformed escape as written: the backslash and its letter.
fn push_verbatim(out: &mut String, letter: char) -> usize {
    out.push('\\');
    out.push(letter);
    1
}

fn parse_hex(digits: &str, max_len: usize) -> Option<u32> {
    if digits.is_empty() || digits.len() > max_len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
