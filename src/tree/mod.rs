//! Arena syntax tree shared by all transpilers.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. Every
//! node keeps a non-owning back-reference to its parent, so passes can ask
//! "which slot am I in" without holding borrows across the tree. Rewrites
//! replace a child slot in place; new nodes are appended and existing ids
//! stay valid.
//!
//! Node kinds and field names follow the ESTree/Babel shape that schema
//! compilers conventionally operate on.

pub mod printer;

use serde::Serialize;

use crate::dsl::ast::{BinaryOp, UnaryOp};
use crate::dsl::span::Span;

/// Stable index of a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    /// The node whose child slot holds this node; `None` for the root and
    /// for nodes not linked into the tree yet.
    pub parent: Option<NodeId>,
    /// Source span; synthesized nodes have none.
    pub span: Option<Span>,
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Program {
        body: Vec<NodeId>,
    },
    Identifier {
        name: String,
    },
    StringLiteral {
        value: String,
    },
    NumericLiteral {
        raw: String,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    TemplateLiteral {
        quasis: Vec<TemplateElement>,
        expressions: Vec<NodeId>,
    },
    ArrayExpression {
        elements: Vec<NodeId>,
    },
    ObjectExpression {
        properties: Vec<NodeId>,
    },
    ObjectProperty {
        key: NodeId,
        value: NodeId,
        computed: bool,
        shorthand: bool,
    },
    MemberExpression {
        object: NodeId,
        property: NodeId,
        computed: bool,
    },
    CallExpression {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    ArrowFunctionExpression {
        params: Vec<NodeId>,
        body: NodeId,
    },
    UnaryExpression {
        operator: UnaryOp,
        argument: NodeId,
    },
    BinaryExpression {
        operator: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    ConditionalExpression {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
}

/// A static chunk of a template literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateElement {
    pub raw: String,
    pub cooked: Option<String>,
}

impl NodeKind {
    /// Child ids in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Program { body } => body.clone(),
            NodeKind::Identifier { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::NumericLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::NullLiteral => Vec::new(),
            NodeKind::TemplateLiteral { expressions, .. } => expressions.clone(),
            NodeKind::ArrayExpression { elements } => elements.clone(),
            NodeKind::ObjectExpression { properties } => properties.clone(),
            NodeKind::ObjectProperty { key, value, .. } => vec![*key, *value],
            NodeKind::MemberExpression {
                object, property, ..
            } => vec![*object, *property],
            NodeKind::CallExpression { callee, arguments } => {
                std::iter::once(*callee).chain(arguments.iter().copied()).collect()
            }
            NodeKind::ArrowFunctionExpression { params, body } => {
                params.iter().copied().chain(std::iter::once(*body)).collect()
            }
            NodeKind::UnaryExpression { argument, .. } => vec![*argument],
            NodeKind::BinaryExpression { left, right, .. } => vec![*left, *right],
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => vec![*test, *consequent, *alternate],
        }
    }

    /// Mutable child slots in source order.
    fn child_slots_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            NodeKind::Program { body } => body.iter_mut().collect(),
            NodeKind::Identifier { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::NumericLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::NullLiteral => Vec::new(),
            NodeKind::TemplateLiteral { expressions, .. } => expressions.iter_mut().collect(),
            NodeKind::ArrayExpression { elements } => elements.iter_mut().collect(),
            NodeKind::ObjectExpression { properties } => properties.iter_mut().collect(),
            NodeKind::ObjectProperty { key, value, .. } => vec![key, value],
            NodeKind::MemberExpression {
                object, property, ..
            } => vec![object, property],
            NodeKind::CallExpression { callee, arguments } => {
                std::iter::once(callee).chain(arguments.iter_mut()).collect()
            }
            NodeKind::ArrowFunctionExpression { params, body } => {
                params.iter_mut().chain(std::iter::once(body)).collect()
            }
            NodeKind::UnaryExpression { argument, .. } => vec![argument],
            NodeKind::BinaryExpression { left, right, .. } => vec![left, right],
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => vec![test, consequent, alternate],
        }
    }

    /// Short kind name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::StringLiteral { .. } => "StringLiteral",
            NodeKind::NumericLiteral { .. } => "NumericLiteral",
            NodeKind::BooleanLiteral { .. } => "BooleanLiteral",
            NodeKind::NullLiteral => "NullLiteral",
            NodeKind::TemplateLiteral { .. } => "TemplateLiteral",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::ObjectExpression { .. } => "ObjectExpression",
            NodeKind::ObjectProperty { .. } => "ObjectProperty",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::ArrowFunctionExpression { .. } => "ArrowFunctionExpression",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
        }
    }
}

/// An arena of nodes rooted at a `Program`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding an empty program.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Program { body: Vec::new() },
                parent: None,
                span: None,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, linked or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Top-level statements of the program.
    pub fn statements(&self) -> &[NodeId] {
        match self.kind(self.root) {
            NodeKind::Program { body } => body,
            _ => &[],
        }
    }

    /// The name of an `Identifier` node.
    pub fn identifier_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Append a node and adopt its children.
    ///
    /// Children named by `kind` get their parent link pointed at the new
    /// node, so trees are built bottom-up.
    pub fn push(&mut self, kind: NodeKind, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            parent: None,
            span,
        });
        id
    }

    /// Append a statement to the program.
    pub fn push_statement(&mut self, statement: NodeId) {
        let root = self.root;
        if let NodeKind::Program { body } = &mut self.nodes[root.index()].kind {
            body.push(statement);
        }
        self.nodes[statement.index()].parent = Some(root);
    }

    /// Record the span covering the whole program.
    pub fn set_root_span(&mut self, span: Span) {
        let root = self.root;
        self.nodes[root.index()].span = Some(span);
    }

    /// Put `new` into the slot of `parent` that currently holds `old`.
    ///
    /// Returns false if `old` is not a child of `parent`; the tree is left
    /// unchanged in that case. `old` keeps its parent link until it is
    /// adopted elsewhere.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let replaced = match self.nodes[parent.index()]
            .kind
            .child_slots_mut()
            .into_iter()
            .find(|slot| **slot == old)
        {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        };
        if replaced {
            self.nodes[new.index()].parent = Some(parent);
        }
        replaced
    }

    /// Wrap `body` in a new arrow function taking `params`, in place.
    ///
    /// The arrow takes over the slot `body` occupied in its parent and
    /// `body` becomes the arrow's body. Nothing inside `body` changes.
    pub fn wrap_in_arrow<S: AsRef<str>>(&mut self, body: NodeId, params: &[S]) -> NodeId {
        let parent = self.parent(body);
        let params = params
            .iter()
            .map(|name| self.identifier(name.as_ref()))
            .collect();
        let arrow = self.push(NodeKind::ArrowFunctionExpression { params, body }, None);
        if let Some(parent) = parent {
            self.replace_child(parent, body, arrow);
        }
        arrow
    }

    /// Ids of `start` and all its descendants, depth-first pre-order.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    // ------------------------------------------------------------------------
    // Constructors for synthesized nodes
    // ------------------------------------------------------------------------

    pub fn identifier(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Identifier { name: name.into() }, None)
    }

    pub fn string_literal(&mut self, value: impl Into<String>) -> NodeId {
        self.push(
            NodeKind::StringLiteral {
                value: value.into(),
            },
            None,
        )
    }

    pub fn member(&mut self, object: NodeId, property: &str) -> NodeId {
        let property = self.identifier(property);
        self.push(
            NodeKind::MemberExpression {
                object,
                property,
                computed: false,
            },
            None,
        )
    }

    pub fn call(&mut self, callee: NodeId, arguments: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::CallExpression { callee, arguments }, None)
    }

    pub fn array(&mut self, elements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::ArrayExpression { elements }, None)
    }

    pub fn object(&mut self, properties: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::ObjectExpression { properties }, None)
    }

    /// An `ObjectProperty` with a plain identifier key.
    pub fn property(&mut self, key: &str, value: NodeId) -> NodeId {
        let key = self.identifier(key);
        self.push(
            NodeKind::ObjectProperty {
                key,
                value,
                computed: false,
                shorthand: false,
            },
            None,
        )
    }
}
