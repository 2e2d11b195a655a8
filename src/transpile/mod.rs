//! Source-to-source passes over the schema tree.
//!
//! A transpiler takes a lowered [`Tree`], rewrites it in place and reports
//! what it changed. [`CubePropContextTranspiler`] is the pass that turns
//! member-referencing fields of `cube`, `view`, `context` and
//! `dashboardTemplate` definitions into closures over the symbols they use:
//!
//! ```text
//! cube("Orders", { sql: `${CUBE}.status = 'done'` })
//!   ─▶ cube("Orders", { sql: (CUBE) => `${CUBE}.status = 'done'` })
//! ```

mod collector;
mod cube_prop_context;
mod field_visitor;

pub use collector::{collect_known_identifiers, KnownIdentifiers};
pub use cube_prop_context::{CallSiteKind, CubePropContextTranspiler};
pub use field_visitor::{FieldMatcher, FieldPatternVisitor, RewrittenField};

use serde::Serialize;

use crate::symbols::ResolveError;
use crate::tree::{NodeId, Tree};

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while transpiling.
#[derive(Debug, thiserror::Error)]
pub enum TranspileError {
    /// A symbol lookup failed; the resolver's error is passed through as is.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Invalid field pattern: {0}")]
    InvalidFieldPattern(#[from] regex::Error),
}

pub type TranspileResult<T> = Result<T, TranspileError>;

// ============================================================================
// Transpiler
// ============================================================================

/// A pass that rewrites a tree in place.
///
/// On error the tree holds whatever was rewritten before the failure.
pub trait Transpiler {
    fn transpile(&self, tree: &mut Tree) -> TranspileResult<TranspileReport>;
}

// ============================================================================
// Reports
// ============================================================================

/// What a transpiler changed, call site by call site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranspileReport {
    pub call_sites: Vec<CallSiteReport>,
}

impl TranspileReport {
    /// Total number of rewritten fields.
    pub fn rewritten_count(&self) -> usize {
        self.call_sites.iter().map(|site| site.fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.call_sites.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &RewrittenField> {
        self.call_sites.iter().flat_map(|site| site.fields.iter())
    }
}

/// A matched call site and the fields rewritten in its last argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSiteReport {
    pub kind: CallSiteKind,
    /// The `CallExpression` node.
    pub call: NodeId,
    /// Cube name taken from the first argument, if it was a literal.
    pub cube_name: Option<String>,
    pub fields: Vec<RewrittenField>,
}
