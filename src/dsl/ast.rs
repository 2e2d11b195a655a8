//! Syntax tree produced by the schema parser.
//!
//! This is the owned, span-annotated output of [`super::parser`]. It is
//! lowered into the arena [`crate::tree::Tree`] before any transpiler runs.

use serde::Serialize;

use crate::dsl::span::Spanned;

/// A parsed source file: a sequence of expression statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Spanned<Expr>>,
}

/// An expression in the schema subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Ident(String),
    /// String literal with escapes resolved.
    Str(String),
    Number(String),
    Bool(bool),
    Null,
    Template(Template),
    Array(Vec<Spanned<Expr>>),
    Object(Vec<Spanned<Property>>),
    /// `object.property` or `object[property]`.
    Member {
        object: Box<Spanned<Expr>>,
        property: Box<Spanned<Expr>>,
        computed: bool,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    /// Arrow function with an expression body.
    Arrow {
        params: Vec<Spanned<String>>,
        body: Box<Spanned<Expr>>,
    },
    Unary {
        op: UnaryOp,
        arg: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Conditional {
        test: Box<Spanned<Expr>>,
        consequent: Box<Spanned<Expr>>,
        alternate: Box<Spanned<Expr>>,
    },
}

/// A template literal split into static chunks and substitutions.
///
/// There is always exactly one more chunk than there are substitutions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub quasis: Vec<TemplateChunk>,
    pub exprs: Vec<Spanned<Expr>>,
}

/// A static part of a template literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateChunk {
    /// Source text as written.
    pub raw: String,
    /// Text with escapes resolved.
    pub cooked: String,
}

/// A property in an object literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: Spanned<PropertyKey>,
    pub value: Spanned<Expr>,
    /// Written as `{ name }` rather than `{ name: name }`.
    pub shorthand: bool,
}

/// The key of an object property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PropertyKey {
    Ident(String),
    Str(String),
    Number(String),
    /// `[expr]: value`
    Computed(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    And,
    Or,
    Nullish,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Nullish => "??",
        }
    }

    /// Binding strength; higher binds tighter. Operators sharing a level
    /// associate to the left.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or | BinaryOp::Nullish => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
