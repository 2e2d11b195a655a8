//! Render a tree back to source text.
//!
//! Output is normalized rather than faithful: strings are double-quoted,
//! objects and arrays are printed on one line and parentheses are emitted
//! only where precedence requires them. Template literals keep their raw
//! chunks.

use super::{NodeId, NodeKind, Tree};
use crate::dsl::ast::UnaryOp;

/// Print the whole program, one `;`-terminated statement per line.
pub fn print(tree: &Tree) -> String {
    let mut out = String::new();
    for &statement in tree.statements() {
        print_statement(tree, statement, &mut out);
    }
    out
}

/// An object literal at statement start would read as a block.
fn print_statement(tree: &Tree, id: NodeId, out: &mut String) {
    if matches!(tree.kind(id), NodeKind::ObjectExpression { .. }) {
        out.push('(');
        print_node(tree, id, out);
        out.push(')');
    } else {
        print_node(tree, id, out);
    }
    out.push_str(";\n");
}

/// Print a single expression node.
pub fn print_expr(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    print_node(tree, id, &mut out);
    out
}

/// Binding strength of a node as an operand. Primary expressions bind
/// tightest.
fn precedence(kind: &NodeKind) -> u8 {
    match kind {
        NodeKind::ArrowFunctionExpression { .. } => 0,
        NodeKind::ConditionalExpression { .. } => 1,
        NodeKind::BinaryExpression { operator, .. } => 1 + operator.precedence(),
        NodeKind::UnaryExpression { .. } => 10,
        _ => 20,
    }
}

/// Print `id`, parenthesized when it binds looser than `min`.
fn print_operand(tree: &Tree, id: NodeId, min: u8, out: &mut String) {
    if precedence(tree.kind(id)) < min {
        out.push('(');
        print_node(tree, id, out);
        out.push(')');
    } else {
        print_node(tree, id, out);
    }
}

fn print_list(tree: &Tree, ids: &[NodeId], out: &mut String) {
    for (i, &id) in ids.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        print_node(tree, id, out);
    }
}

fn print_node(tree: &Tree, id: NodeId, out: &mut String) {
    match tree.kind(id) {
        NodeKind::Program { body } => {
            for &statement in body {
                print_statement(tree, statement, out);
            }
        }
        NodeKind::Identifier { name } => out.push_str(name),
        NodeKind::StringLiteral { value } => push_quoted(value, out),
        NodeKind::NumericLiteral { raw } => out.push_str(raw),
        NodeKind::BooleanLiteral { value } => out.push_str(if *value { "true" } else { "false" }),
        NodeKind::NullLiteral => out.push_str("null"),
        NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } => {
            out.push('`');
            for (i, quasi) in quasis.iter().enumerate() {
                out.push_str(&quasi.raw);
                if let Some(&expr) = expressions.get(i) {
                    out.push_str("${");
                    print_node(tree, expr, out);
                    out.push('}');
                }
            }
            out.push('`');
        }
        NodeKind::ArrayExpression { elements } => {
            out.push('[');
            print_list(tree, elements, out);
            out.push(']');
        }
        NodeKind::ObjectExpression { properties } => {
            if properties.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                print_list(tree, properties, out);
                out.push_str(" }");
            }
        }
        NodeKind::ObjectProperty {
            key,
            value,
            computed,
            shorthand,
        } => {
            // Shorthand only survives while the value is still the same name
            let key_name = tree.identifier_name(*key);
            if *shorthand && !*computed && key_name.is_some() && key_name == tree.identifier_name(*value) {
                print_node(tree, *key, out);
                return;
            }
            if *computed {
                out.push('[');
                print_node(tree, *key, out);
                out.push(']');
            } else {
                print_node(tree, *key, out);
            }
            out.push_str(": ");
            print_node(tree, *value, out);
        }
        NodeKind::MemberExpression {
            object,
            property,
            computed,
        } => {
            print_operand(tree, *object, 20, out);
            if *computed {
                out.push('[');
                print_node(tree, *property, out);
                out.push(']');
            } else {
                out.push('.');
                print_node(tree, *property, out);
            }
        }
        NodeKind::CallExpression { callee, arguments } => {
            print_operand(tree, *callee, 20, out);
            out.push('(');
            print_list(tree, arguments, out);
            out.push(')');
        }
        NodeKind::ArrowFunctionExpression { params, body } => {
            out.push('(');
            print_list(tree, params, out);
            out.push_str(") => ");
            // An object body would read as a block
            if matches!(tree.kind(*body), NodeKind::ObjectExpression { .. }) {
                out.push('(');
                print_node(tree, *body, out);
                out.push(')');
            } else {
                print_node(tree, *body, out);
            }
        }
        NodeKind::UnaryExpression { operator, argument } => {
            out.push_str(operator.as_str());
            // `- -x` must not collapse into the `--` token
            if let NodeKind::UnaryExpression { operator: inner, .. } = tree.kind(*argument) {
                if matches!(
                    (*operator, *inner),
                    (UnaryOp::Neg, UnaryOp::Neg) | (UnaryOp::Plus, UnaryOp::Plus)
                ) {
                    out.push(' ');
                }
            }
            print_operand(tree, *argument, 10, out);
        }
        NodeKind::BinaryExpression {
            operator,
            left,
            right,
        } => {
            let own = 1 + operator.precedence();
            print_operand(tree, *left, own, out);
            out.push(' ');
            out.push_str(operator.as_str());
            out.push(' ');
            // Left-associative: an equal-precedence right operand needs parens
            print_operand(tree, *right, own + 1, out);
        }
        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            print_operand(tree, *test, 2, out);
            out.push_str(" ? ");
            print_operand(tree, *consequent, 1, out);
            out.push_str(" : ");
            print_operand(tree, *alternate, 1, out);
        }
    }
}

fn push_quoted(value: &str, out: &mut String) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            other => out.push(other),
        }
    }
    out.push('"');
}
