//! Lowering the parsed syntax tree into the arena tree.
//!
//! The syntax tree from [`crate::dsl`] owns its children; transpilers need
//! the arena form with parent links so they can rewrite slots in place.

use crate::dsl::ast;
use crate::dsl::span::Spanned;
use crate::tree::{NodeId, NodeKind, TemplateElement, Tree};

/// Lower a parsed program into a fresh tree.
pub fn lower_program(program: &ast::Program) -> Tree {
    let mut tree = Tree::new();
    for statement in &program.body {
        let id = lower_expr(&mut tree, statement);
        tree.push_statement(id);
    }
    if let (Some(first), Some(last)) = (program.body.first(), program.body.last()) {
        tree.set_root_span(first.span.start..last.span.end);
    }
    tree
}

/// Lower one expression, children first.
pub fn lower_expr(tree: &mut Tree, expr: &Spanned<ast::Expr>) -> NodeId {
    let span = Some(expr.span.clone());
    let kind = match &expr.value {
        ast::Expr::Ident(name) => NodeKind::Identifier { name: name.clone() },
        ast::Expr::Str(value) => NodeKind::StringLiteral {
            value: value.clone(),
        },
        ast::Expr::Number(raw) => NodeKind::NumericLiteral { raw: raw.clone() },
        ast::Expr::Bool(value) => NodeKind::BooleanLiteral { value: *value },
        ast::Expr::Null => NodeKind::NullLiteral,
        ast::Expr::Template(template) => NodeKind::TemplateLiteral {
            quasis: template
                .quasis
                .iter()
                .map(|chunk| TemplateElement {
                    raw: chunk.raw.clone(),
                    cooked: Some(chunk.cooked.clone()),
                })
                .collect(),
            expressions: lower_all(tree, &template.exprs),
        },
        ast::Expr::Array(elements) => NodeKind::ArrayExpression {
            elements: lower_all(tree, elements),
        },
        ast::Expr::Object(properties) => NodeKind::ObjectExpression {
            properties: properties
                .iter()
                .map(|property| lower_property(tree, property))
                .collect(),
        },
        ast::Expr::Member {
            object,
            property,
            computed,
        } => NodeKind::MemberExpression {
            object: lower_expr(tree, object),
            property: lower_expr(tree, property),
            computed: *computed,
        },
        ast::Expr::Call { callee, args } => NodeKind::CallExpression {
            callee: lower_expr(tree, callee),
            arguments: lower_all(tree, args),
        },
        ast::Expr::Arrow { params, body } => NodeKind::ArrowFunctionExpression {
            params: params
                .iter()
                .map(|param| {
                    tree.push(
                        NodeKind::Identifier {
                            name: param.value.clone(),
                        },
                        Some(param.span.clone()),
                    )
                })
                .collect(),
            body: lower_expr(tree, body),
        },
        ast::Expr::Unary { op, arg } => NodeKind::UnaryExpression {
            operator: *op,
            argument: lower_expr(tree, arg),
        },
        ast::Expr::Binary { op, left, right } => NodeKind::BinaryExpression {
            operator: *op,
            left: lower_expr(tree, left),
            right: lower_expr(tree, right),
        },
        ast::Expr::Conditional {
            test,
            consequent,
            alternate,
        } => NodeKind::ConditionalExpression {
            test: lower_expr(tree, test),
            consequent: lower_expr(tree, consequent),
            alternate: lower_expr(tree, alternate),
        },
    };
    tree.push(kind, span)
}

fn lower_all(tree: &mut Tree, exprs: &[Spanned<ast::Expr>]) -> Vec<NodeId> {
    exprs.iter().map(|e| lower_expr(tree, e)).collect()
}

fn lower_property(tree: &mut Tree, property: &Spanned<ast::Property>) -> NodeId {
    let key_span = Some(property.key.span.clone());
    let (key, computed) = match &property.key.value {
        ast::PropertyKey::Ident(name) => (
            tree.push(NodeKind::Identifier { name: name.clone() }, key_span),
            false,
        ),
        ast::PropertyKey::Str(value) => (
            tree.push(
                NodeKind::StringLiteral {
                    value: value.clone(),
                },
                key_span,
            ),
            false,
        ),
        ast::PropertyKey::Number(raw) => (
            tree.push(NodeKind::NumericLiteral { raw: raw.clone() }, key_span),
            false,
        ),
        ast::PropertyKey::Computed(expr) => (lower_expr(tree, expr), true),
    };
    let value = lower_expr(tree, &property.value.value);
    tree.push(
        NodeKind::ObjectProperty {
            key,
            value,
            computed,
            shorthand: property.shorthand,
        },
        Some(property.span.clone()),
    )
}
