//! Free identifier collection for a single field value.

use std::collections::HashSet;

use serde::Serialize;

use crate::symbols::ResolveError;
use crate::tree::{NodeId, NodeKind, Tree};

/// Ordered, duplicate-free list of names, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KnownIdentifiers {
    names: Vec<String>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl KnownIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` unless already present. Returns true if it was added.
    pub fn push(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.names.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.names
    }
}

/// Collect identifiers under `expr` (inclusive) that `resolve` accepts.
///
/// The scan is depth-first pre-order. The property of a non-computed member
/// access (`b` in `a.b`) is a field name, not a variable, and is never
/// offered to `resolve`; computed properties (`a[b]`) are scanned like any
/// other expression. Each distinct name is resolved at most once.
pub fn collect_known_identifiers<F>(
    tree: &Tree,
    expr: NodeId,
    resolve: F,
) -> Result<KnownIdentifiers, ResolveError>
where
    F: Fn(&str) -> Result<bool, ResolveError>,
{
    let mut known = KnownIdentifiers::new();
    let mut rejected: HashSet<&str> = HashSet::new();

    for id in tree.descendants(expr) {
        let Some(name) = tree.identifier_name(id) else {
            continue;
        };
        if is_member_property(tree, id) || known.contains(name) || rejected.contains(name) {
            continue;
        }
        if resolve(name)? {
            known.push(name);
        } else {
            rejected.insert(name);
        }
    }

    Ok(known)
}

/// True if `id` sits in the property slot of a non-computed member access.
fn is_member_property(tree: &Tree, id: NodeId) -> bool {
    match tree.parent(id).map(|parent| tree.kind(parent)) {
        Some(NodeKind::MemberExpression {
            property,
            computed: false,
            ..
        }) => *property == id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;
    use crate::lowering::lower_program;
    use std::cell::RefCell;

    fn lower(source: &str) -> (Tree, NodeId) {
        let result = dsl::parse(source);
        assert!(result.is_ok(), "parse failed: {:?}", result.diagnostics);
        let tree = lower_program(result.program.as_ref().unwrap());
        let first = tree.statements()[0];
        (tree, first)
    }

    fn accept_all(_: &str) -> Result<bool, ResolveError> {
        Ok(true)
    }

    #[test]
    fn test_first_seen_order_without_duplicates() {
        let (tree, expr) = lower("[b, a, b]");
        let known = collect_known_identifiers(&tree, expr, accept_all).unwrap();
        assert_eq!(known.as_slice(), &["b", "a"]);
    }

    #[test]
    fn test_member_property_excluded() {
        let (tree, expr) = lower("x.y");
        let known = collect_known_identifiers(&tree, expr, accept_all).unwrap();
        assert_eq!(known.as_slice(), &["x"]);
    }

    #[test]
    fn test_computed_member_property_scanned() {
        let (tree, expr) = lower("x[y]");
        let known = collect_known_identifiers(&tree, expr, accept_all).unwrap();
        assert_eq!(known.as_slice(), &["x", "y"]);
    }

    #[test]
    fn test_chained_member_keeps_only_root() {
        let (tree, expr) = lower("CUBE.status.length");
        let known = collect_known_identifiers(&tree, expr, accept_all).unwrap();
        assert_eq!(known.as_slice(), &["CUBE"]);
    }

    #[test]
    fn test_resolver_filters() {
        let (tree, expr) = lower("`${CUBE}.amount > ${threshold} AND ${status}`");
        let known =
            collect_known_identifiers(&tree, expr, |name| Ok(name != "threshold")).unwrap();
        assert_eq!(known.as_slice(), &["CUBE", "status"]);
    }

    #[test]
    fn test_root_identifier_is_collected() {
        let (tree, expr) = lower("status");
        let known = collect_known_identifiers(&tree, expr, accept_all).unwrap();
        assert_eq!(known.into_vec(), vec!["status".to_string()]);
    }

    #[test]
    fn test_each_name_resolved_once() {
        let (tree, expr) = lower("[a, b, a, b, a]");
        let calls = RefCell::new(Vec::new());
        collect_known_identifiers(&tree, expr, |name| {
            calls.borrow_mut().push(name.to_string());
            Ok(name == "b")
        })
        .unwrap();
        assert_eq!(calls.into_inner(), vec!["a", "b"]);
    }

    #[test]
    fn test_resolver_error_propagates() {
        let (tree, expr) = lower("[a, USER_CONTEXT]");
        let err = collect_known_identifiers(&tree, expr, |name| {
            if name == "USER_CONTEXT" {
                Err(ResolveError::Lookup {
                    name: name.to_string(),
                    message: "boom".to_string(),
                })
            } else {
                Ok(true)
            }
        })
        .unwrap_err();
        assert!(matches!(err, ResolveError::Lookup { ref name, .. } if name == "USER_CONTEXT"));
    }

    #[test]
    fn test_no_identifiers() {
        let (tree, expr) = lower(r#""SELECT 1""#);
        let known = collect_known_identifiers(&tree, expr, accept_all).unwrap();
        assert!(known.is_empty());
    }
}
