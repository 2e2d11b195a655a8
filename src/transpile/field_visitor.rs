//! Rewriting of matched object properties into deferred closures.
//!
//! A property `sql: `${CUBE}.status = 'done'`` becomes
//! `sql: (CUBE) => `${CUBE}.status = 'done'``: the value is left exactly as
//! written and wrapped in an arrow whose parameters are the known symbols it
//! mentions, so a later evaluation stage can supply them by name.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;

use super::collector::collect_known_identifiers;
use super::TranspileError;
use crate::symbols::ResolveError;
use crate::tree::{NodeId, NodeKind, Tree};

static REFERENCE_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(sql|measureReferences|dimensionReferences|segmentReferences|timeDimensionReference|rollupReferences|drillMembers|drillMemberReferences|contextMembers|columns)$",
    )
    .unwrap()
});

static SHORT_REFERENCE_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^.*(measures|dimensions|segments|measure|dimension|segment|member|Measures|Dimensions|Segments|Measure|Dimension|Segment|Member)$",
    )
    .unwrap()
});

/// Selects which property keys are rewritten.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    /// The key equals this name.
    Exact(String),
    /// The key matches this expression.
    Pattern(Regex),
}

impl FieldMatcher {
    /// Fields of cube, view and context bodies that reference members.
    pub fn reference_fields() -> Self {
        FieldMatcher::Pattern(REFERENCE_FIELDS.clone())
    }

    /// Dashboard template fields, matched by name ending.
    pub fn short_reference_fields() -> Self {
        FieldMatcher::Pattern(SHORT_REFERENCE_FIELDS.clone())
    }

    /// Match any of `names` exactly.
    pub fn any_of<S: AsRef<str>>(names: &[S]) -> Result<Self, regex::Error> {
        let alternatives = alternation(names);
        Ok(FieldMatcher::Pattern(Regex::new(&format!("^({})$", alternatives))?))
    }

    /// Match any key ending in one of `suffixes`, either as written or
    /// starting a camelCase word (`measures` matches `someMeasures`).
    pub fn suffix_of<S: AsRef<str>>(suffixes: &[S]) -> Result<Self, regex::Error> {
        let mut forms: Vec<String> = Vec::new();
        for suffix in suffixes {
            let suffix = suffix.as_ref();
            forms.push(suffix.to_string());
            let camel = capitalize(suffix);
            if camel != suffix {
                forms.push(camel);
            }
        }
        let alternatives = alternation(&forms);
        Ok(FieldMatcher::Pattern(Regex::new(&format!("^.*({})$", alternatives))?))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            FieldMatcher::Exact(name) => name == key,
            FieldMatcher::Pattern(regex) => regex.is_match(key),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escaped alternatives; a class that matches nothing when `names` is empty.
fn alternation<S: AsRef<str>>(names: &[S]) -> String {
    if names.is_empty() {
        return r"[^\s\S]".to_string();
    }
    names
        .iter()
        .map(|name| regex::escape(name.as_ref()))
        .collect::<Vec<_>>()
        .join("|")
}

/// One property whose value was wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrittenField {
    /// The property key.
    pub field: String,
    /// The `ObjectProperty` node.
    pub property: NodeId,
    /// The new arrow function now in the property's value slot.
    pub closure: NodeId,
    /// Closure parameters, in order.
    pub params: Vec<String>,
}

/// Walks a subtree and wraps the values of matching properties.
pub struct FieldPatternVisitor<'m, F> {
    matcher: &'m FieldMatcher,
    resolve: F,
}

impl<'m, F> FieldPatternVisitor<'m, F>
where
    F: Fn(&str) -> Result<bool, ResolveError>,
{
    pub fn new(matcher: &'m FieldMatcher, resolve: F) -> Self {
        Self { matcher, resolve }
    }

    /// Rewrite every matching property under `body`, in pre-order.
    ///
    /// A rewritten value is not entered again, so the closure just created
    /// is never inspected. Properties that do not match are descended into.
    pub fn apply(&self, tree: &mut Tree, body: NodeId) -> Result<Vec<RewrittenField>, TranspileError> {
        let mut rewritten = Vec::new();
        let mut stack = vec![body];

        while let Some(id) = stack.pop() {
            if let Some((field, value)) = self.matching_property(tree, id) {
                let params = collect_known_identifiers(tree, value, &self.resolve)?.into_vec();
                let closure = tree.wrap_in_arrow(value, &params);
                trace!(field = %field, params = ?params, "wrapped field value");
                rewritten.push(RewrittenField {
                    field,
                    property: id,
                    closure,
                    params,
                });
                continue;
            }
            stack.extend(tree.children(id).into_iter().rev());
        }

        Ok(rewritten)
    }

    /// Key name and value of `id` if it is a property this visitor rewrites.
    fn matching_property(&self, tree: &Tree, id: NodeId) -> Option<(String, NodeId)> {
        let NodeKind::ObjectProperty {
            key,
            value,
            computed: false,
            ..
        } = tree.kind(id)
        else {
            return None;
        };
        let name = tree.identifier_name(*key)?;
        self.matcher
            .matches(name)
            .then(|| (name.to_string(), *value))
    }
}
