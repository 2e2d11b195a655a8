//! Closure rewriting for `cube`, `view`, `context` and `dashboardTemplate`.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::field_visitor::{FieldMatcher, FieldPatternVisitor, RewrittenField};
use super::{CallSiteReport, TranspileReport, TranspileResult, Transpiler};
use crate::config::TranspileSettings;
use crate::symbols::{CubeDictionary, CubeSymbols, ResolveError};
use crate::tree::{NodeId, NodeKind, Tree};

/// The definition functions whose bodies are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CallSiteKind {
    Cube,
    View,
    Context,
    DashboardTemplate,
}

impl CallSiteKind {
    pub fn from_callee(name: &str) -> Option<Self> {
        match name {
            "cube" => Some(CallSiteKind::Cube),
            "view" => Some(CallSiteKind::View),
            "context" => Some(CallSiteKind::Context),
            "dashboardTemplate" => Some(CallSiteKind::DashboardTemplate),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallSiteKind::Cube => "cube",
            CallSiteKind::View => "view",
            CallSiteKind::Context => "context",
            CallSiteKind::DashboardTemplate => "dashboardTemplate",
        }
    }
}

impl fmt::Display for CallSiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrites member-referencing fields into closures over known symbols.
///
/// `symbols` answers whether a name is a declared member, helper or
/// self-reference token; `cubes` answers whether a name is a registered
/// cube, which is what `extends` may refer to.
pub struct CubePropContextTranspiler<S, D> {
    symbols: S,
    cubes: D,
    reference_fields: FieldMatcher,
    short_reference_fields: FieldMatcher,
    extends_field: FieldMatcher,
}

impl<S, D> CubePropContextTranspiler<S, D>
where
    S: CubeSymbols,
    D: CubeDictionary,
{
    /// Transpiler with the built-in field lists.
    pub fn new(symbols: S, cubes: D) -> Self {
        Self {
            symbols,
            cubes,
            reference_fields: FieldMatcher::reference_fields(),
            short_reference_fields: FieldMatcher::short_reference_fields(),
            extends_field: FieldMatcher::Exact("extends".to_string()),
        }
    }

    /// Transpiler with field lists taken from `settings`.
    pub fn from_settings(symbols: S, cubes: D, settings: &TranspileSettings) -> TranspileResult<Self> {
        if settings.is_default() {
            return Ok(Self::new(symbols, cubes));
        }
        Ok(Self {
            symbols,
            cubes,
            reference_fields: FieldMatcher::any_of(&settings.reference_fields)?,
            short_reference_fields: FieldMatcher::suffix_of(&settings.short_reference_suffixes)?,
            extends_field: FieldMatcher::Exact(settings.extends_field.clone()),
        })
    }

    /// Resolution used by member-referencing fields.
    fn is_known_symbol(&self, cube_name: Option<&str>, name: &str) -> Result<bool, ResolveError> {
        Ok(self.symbols.resolve_symbol(cube_name, name)? || self.symbols.is_current_cube(name)?)
    }

    /// Rewrite the last argument of one matched call.
    fn rewrite_call_site(
        &self,
        tree: &mut Tree,
        kind: CallSiteKind,
        cube_name: Option<&str>,
        body: NodeId,
    ) -> TranspileResult<Vec<RewrittenField>> {
        let mut fields = Vec::new();
        match kind {
            CallSiteKind::Cube | CallSiteKind::View => {
                fields.extend(
                    FieldPatternVisitor::new(&self.reference_fields, |name: &str| {
                        self.is_known_symbol(cube_name, name)
                    })
                    .apply(tree, body)?,
                );
                fields.extend(
                    FieldPatternVisitor::new(&self.extends_field, |name: &str| {
                        self.cubes.resolve_cube(name)
                    })
                    .apply(tree, body)?,
                );
            }
            CallSiteKind::Context => {
                fields.extend(
                    FieldPatternVisitor::new(&self.reference_fields, |name: &str| {
                        self.is_known_symbol(None, name)
                    })
                    .apply(tree, body)?,
                );
            }
            CallSiteKind::DashboardTemplate => {
                fields.extend(
                    FieldPatternVisitor::new(&self.short_reference_fields, |name: &str| {
                        self.is_known_symbol(None, name)
                    })
                    .apply(tree, body)?,
                );
            }
        }
        Ok(fields)
    }
}

impl<S, D> Transpiler for CubePropContextTranspiler<S, D>
where
    S: CubeSymbols,
    D: CubeDictionary,
{
    /// Visit every call in the tree once, in pre-order.
    ///
    /// Children are read after a call has been rewritten, so definitions
    /// nested inside a rewritten value are still found.
    fn transpile(&self, tree: &mut Tree) -> TranspileResult<TranspileReport> {
        let mut report = TranspileReport::default();
        let mut stack = vec![tree.root()];

        while let Some(id) = stack.pop() {
            if let Some((kind, cube_name, body)) = match_call_site(tree, id) {
                let fields = self.rewrite_call_site(tree, kind, cube_name.as_deref(), body)?;
                debug!(
                    call = %id,
                    kind = %kind,
                    cube = cube_name.as_deref().unwrap_or("-"),
                    rewritten = fields.len(),
                    "rewrote call site"
                );
                report.call_sites.push(CallSiteReport {
                    kind,
                    call: id,
                    cube_name,
                    fields,
                });
            }
            stack.extend(tree.children(id).into_iter().rev());
        }

        Ok(report)
    }
}

/// Classify `id` as a call site: its kind, cube name hint and last argument.
///
/// Calls through anything but a plain name (`a.cube(...)`, `f()(...)`) and
/// calls without arguments are not call sites.
fn match_call_site(tree: &Tree, id: NodeId) -> Option<(CallSiteKind, Option<String>, NodeId)> {
    let NodeKind::CallExpression { callee, arguments } = tree.kind(id) else {
        return None;
    };
    let kind = CallSiteKind::from_callee(tree.identifier_name(*callee)?)?;
    let body = *arguments.last()?;
    let cube_name = match kind {
        CallSiteKind::Cube | CallSiteKind::View => cube_name_hint(tree, arguments[0]),
        CallSiteKind::Context | CallSiteKind::DashboardTemplate => None,
    };
    Some((kind, cube_name, body))
}

/// The literal cube name passed as a definition's first argument.
///
/// A template literal contributes its first static chunk. An empty name is
/// no name.
fn cube_name_hint(tree: &Tree, first: NodeId) -> Option<String> {
    let name = match tree.kind(first) {
        NodeKind::StringLiteral { value } => Some(value.clone()),
        NodeKind::TemplateLiteral { quasis, .. } => {
            quasis.first().and_then(|quasi| quasi.cooked.clone())
        }
        _ => None,
    };
    name.filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;
    use crate::lowering::lower_program;
    use crate::symbols::SchemaSymbols;
    use crate::transpile::TranspileError;
    use crate::tree::printer;

    fn lower(source: &str) -> Tree {
        let result = dsl::parse(source);
        assert!(result.is_ok(), "parse failed: {:?}", result.diagnostics);
        lower_program(result.program.as_ref().unwrap())
    }

    fn symbols() -> SchemaSymbols {
        SchemaSymbols::new()
            .with_cube("Orders", ["status", "count", "createdAt"])
            .with_cube("Users", ["id", "city"])
    }

    fn run(source: &str) -> (Tree, TranspileReport) {
        let symbols = symbols();
        let mut tree = lower(source);
        let report = CubePropContextTranspiler::new(&symbols, &symbols)
            .transpile(&mut tree)
            .unwrap();
        (tree, report)
    }

    #[test]
    fn test_call_site_kind_from_callee() {
        assert_eq!(CallSiteKind::from_callee("cube"), Some(CallSiteKind::Cube));
        assert_eq!(
            CallSiteKind::from_callee("dashboardTemplate"),
            Some(CallSiteKind::DashboardTemplate)
        );
        assert_eq!(CallSiteKind::from_callee("Cube"), None);
        assert_eq!(CallSiteKind::View.to_string(), "view");
    }

    #[test]
    fn test_cube_sql_gets_current_cube_param() {
        let (tree, report) = run("cube(\"Orders\", { sql: `${CUBE}.status = 'done'` })");
        assert_eq!(report.call_sites.len(), 1);
        assert_eq!(report.call_sites[0].kind, CallSiteKind::Cube);
        assert_eq!(report.call_sites[0].cube_name.as_deref(), Some("Orders"));
        assert_eq!(
            printer::print(&tree),
            "cube(\"Orders\", { sql: (CUBE) => `${CUBE}.status = 'done'` });\n"
        );
    }

    #[test]
    fn test_cube_scope_uses_hint() {
        let (_, report) = run(r#"cube("Orders", { measures: { c: { drillMembers: [status, id] } } })"#);
        let params: Vec<_> = report.fields().map(|f| f.params.clone()).collect();
        assert_eq!(params, vec![vec!["status".to_string()]]);
    }

    #[test]
    fn test_context_has_no_cube_scope() {
        let (_, report) = run("context({ sql: [status, SECURITY_CONTEXT, Users] })");
        assert_eq!(report.call_sites[0].cube_name, None);
        let params: Vec<_> = report.fields().map(|f| f.params.clone()).collect();
        assert_eq!(
            params,
            vec![vec!["SECURITY_CONTEXT".to_string(), "Users".to_string()]]
        );
    }

    #[test]
    fn test_extends_resolves_cubes_only() {
        let (tree, report) = run(r#"view("Big", { extends: Orders, sql: Orders })"#);
        let fields: Vec<(&str, &[String])> = report
            .fields()
            .map(|f| (f.field.as_str(), f.params.as_slice()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("sql", &["Orders".to_string()][..]),
                ("extends", &["Orders".to_string()][..]),
            ]
        );
        assert_eq!(
            printer::print(&tree),
            "view(\"Big\", { extends: (Orders) => Orders, sql: (Orders) => Orders });\n"
        );
    }

    #[test]
    fn test_dashboard_template_suffix_fields() {
        let (tree, _) = run("dashboardTemplate({ pinned_measures: [Orders], title: Orders })");
        assert_eq!(
            printer::print(&tree),
            "dashboardTemplate({ pinned_measures: (Orders) => [Orders], title: Orders });\n"
        );
    }

    #[test]
    fn test_dashboard_template_camel_case_suffixes() {
        let (tree, report) = run(
            "dashboardTemplate({ timeDimension: Orders, xMember: Users, members: Orders, MEASURES: Orders })",
        );
        let fields: Vec<&str> = report.fields().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["timeDimension", "xMember"]);
        assert_eq!(
            printer::print(&tree),
            "dashboardTemplate({ timeDimension: (Orders) => Orders, xMember: (Users) => Users, members: Orders, MEASURES: Orders });\n"
        );
    }

    #[test]
    fn test_template_literal_cube_name() {
        let (_, report) = run("cube(`Orders`, { sql: status })");
        assert_eq!(report.call_sites[0].cube_name.as_deref(), Some("Orders"));
        assert_eq!(report.call_sites[0].fields[0].params, vec!["status"]);
    }

    #[test]
    fn test_empty_cube_name_is_no_hint() {
        let (_, report) = run(r#"cube("", { sql: status })"#);
        assert_eq!(report.call_sites[0].cube_name, None);
        assert!(report.call_sites[0].fields[0].params.is_empty());
    }

    #[test]
    fn test_non_literal_cube_name_is_no_hint() {
        let (_, report) = run("cube(name, { sql: status })");
        assert_eq!(report.call_sites[0].cube_name, None);
    }

    #[test]
    fn test_non_identifier_callee_is_ignored() {
        let source = "schema.cube(\"Orders\", { sql: CUBE });\nschema.context({ sql: CUBE });\n";
        let (tree, report) = run(source);
        assert!(report.is_empty());
        assert_eq!(printer::print(&tree), source);
    }

    #[test]
    fn test_empty_arguments_skipped() {
        let source = "cube();\nview();\ncontext();\ndashboardTemplate();\n";
        let (tree, report) = run(source);
        assert!(report.is_empty());
        assert_eq!(printer::print(&tree), source);
    }

    #[test]
    fn test_unrelated_calls_untouched() {
        let source = "segment({ sql: CUBE });\n";
        let (tree, report) = run(source);
        assert!(report.is_empty());
        assert_eq!(printer::print(&tree), source);
    }

    #[test]
    fn test_custom_field_settings() {
        let symbols = symbols();
        let settings = TranspileSettings {
            reference_fields: vec!["expr".to_string()],
            short_reference_suffixes: vec!["Ref".to_string()],
            extends_field: "inherits".to_string(),
        };
        let transpiler =
            CubePropContextTranspiler::from_settings(&symbols, &symbols, &settings).unwrap();
        let mut tree = lower(r#"cube("Orders", { sql: status, expr: status, inherits: Users })"#);
        transpiler.transpile(&mut tree).unwrap();
        assert_eq!(
            printer::print(&tree),
            "cube(\"Orders\", { sql: status, expr: (status) => status, inherits: (Users) => Users });\n"
        );
    }

    #[test]
    fn test_user_context_error_propagates() {
        let symbols = symbols();
        let mut tree = lower("context({ sql: USER_CONTEXT.id })");
        let err = CubePropContextTranspiler::new(&symbols, &symbols)
            .transpile(&mut tree)
            .unwrap_err();
        assert!(matches!(
            err,
            TranspileError::Resolve(ResolveError::Removed { .. })
        ));
        assert_eq!(
            err.to_string(),
            "Support for USER_CONTEXT was removed, please migrate to SECURITY_CONTEXT"
        );
    }
}
