use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};

use cubeprop::dsl;
use cubeprop::lowering::lower_program;
use cubeprop::symbols::{CubeDictionary, CubeSymbols, ResolveError, SchemaSymbols};
use cubeprop::transpile::{CallSiteKind, CubePropContextTranspiler, TranspileError, Transpiler};
use cubeprop::tree::{printer, NodeKind, Tree};

fn lower(source: &str) -> Tree {
    let result = dsl::parse(source);
    assert!(result.is_ok(), "parse failed: {:?}", result.diagnostics);
    lower_program(result.program.as_ref().unwrap())
}

/// Resolver that records every question it is asked.
#[derive(Default)]
struct RecordingSymbols {
    /// (cube scope, name) pairs that resolve.
    scoped: HashSet<(Option<String>, String)>,
    current: HashSet<String>,
    cubes: HashSet<String>,
    asked: RefCell<Vec<(Option<String>, String)>>,
}

impl RecordingSymbols {
    fn symbol(mut self, cube: Option<&str>, name: &str) -> Self {
        self.scoped
            .insert((cube.map(str::to_string), name.to_string()));
        self
    }

    fn current(mut self, name: &str) -> Self {
        self.current.insert(name.to_string());
        self
    }

    fn cube(mut self, name: &str) -> Self {
        self.cubes.insert(name.to_string());
        self
    }
}

impl CubeSymbols for RecordingSymbols {
    fn resolve_symbol(&self, cube_name: Option<&str>, name: &str) -> Result<bool, ResolveError> {
        let key = (cube_name.map(str::to_string), name.to_string());
        self.asked.borrow_mut().push(key.clone());
        Ok(self.scoped.contains(&key))
    }

    fn is_current_cube(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.current.contains(name))
    }
}

impl CubeDictionary for RecordingSymbols {
    fn resolve_cube(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.cubes.contains(name))
    }
}

fn transpile_with(symbols: &RecordingSymbols, source: &str) -> String {
    let mut tree = lower(source);
    CubePropContextTranspiler::new(symbols, symbols)
        .transpile(&mut tree)
        .unwrap();
    printer::print(&tree)
}

// ============================================================================
// Testable properties
// ============================================================================

#[test]
fn test_tree_without_call_sites_is_unchanged() {
    let symbols = RecordingSymbols::default().current("CUBE");
    let mut tree = lower("foo({ sql: CUBE });\nfoo(1, 2, 3);\nbar.cube({ sql: CUBE });\n");
    let before = tree.clone();

    let report = CubePropContextTranspiler::new(&symbols, &symbols)
        .transpile(&mut tree)
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(tree, before);
}

#[test]
fn test_repeated_runs_are_identical() {
    let symbols = SchemaSymbols::new().with_cube("Orders", ["status", "count"]);
    let source = r#"
        cube(`Orders`, {
            sql: `SELECT * FROM orders WHERE ${status} = 'x'`,
            measures: { count: { type: `count`, drillMembers: [count, status, CUBE] } },
        });
    "#;
    let transpiler = CubePropContextTranspiler::new(&symbols, &symbols);

    let mut first = lower(source);
    let first_report = transpiler.transpile(&mut first).unwrap();
    let mut second = lower(source);
    let second_report = transpiler.transpile(&mut second).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_report, second_report);
    assert_eq!(printer::print(&first), printer::print(&second));
}

#[test]
fn test_params_are_free_known_identifiers() {
    let symbols = RecordingSymbols::default()
        .symbol(Some("Orders"), "amount")
        .symbol(Some("Orders"), "status")
        .current("CUBE");
    let output = transpile_with(
        &symbols,
        r#"cube("Orders", { sql: `${CUBE}.total > ${amount} AND ${other} AND ${CUBE.status}` })"#,
    );
    assert_eq!(
        output,
        "cube(\"Orders\", { sql: (CUBE, amount) => `${CUBE}.total > ${amount} AND ${other} AND ${CUBE.status}` });\n"
    );
}

#[test]
fn test_params_keep_first_seen_order() {
    let symbols = RecordingSymbols::default()
        .symbol(Some("Orders"), "a")
        .symbol(Some("Orders"), "b");
    let output = transpile_with(&symbols, r#"cube("Orders", { drillMembers: [b, a, b] })"#);
    assert_eq!(output, "cube(\"Orders\", { drillMembers: (b, a) => [b, a, b] });\n");
}

#[test]
fn test_status_scoped_to_cube_not_context() {
    let symbols = RecordingSymbols::default().symbol(Some("Orders"), "status");

    let in_cube = transpile_with(&symbols, r#"cube("Orders", { sql: status })"#);
    assert_eq!(in_cube, "cube(\"Orders\", { sql: (status) => status });\n");

    let in_context = transpile_with(&symbols, "context({ sql: status })");
    assert_eq!(in_context, "context({ sql: () => status });\n");
}

#[test]
fn test_static_member_property_is_not_a_param() {
    let symbols = RecordingSymbols::default()
        .symbol(Some("Orders"), "foo")
        .symbol(Some("Orders"), "status");
    let output = transpile_with(&symbols, r#"cube("Orders", { sql: foo.status })"#);
    assert_eq!(output, "cube(\"Orders\", { sql: (foo) => foo.status });\n");

    // Only the object of the member access was ever looked up
    let asked: BTreeSet<String> = symbols
        .asked
        .borrow()
        .iter()
        .map(|(_, name)| name.clone())
        .collect();
    assert!(asked.contains("foo"));
    assert!(!asked.contains("status"));
}

#[test]
fn test_computed_member_property_is_a_param() {
    let symbols = RecordingSymbols::default()
        .symbol(Some("Orders"), "foo")
        .symbol(Some("Orders"), "status");
    let output = transpile_with(&symbols, r#"cube("Orders", { sql: foo[status] })"#);
    assert_eq!(output, "cube(\"Orders\", { sql: (foo, status) => foo[status] });\n");
}

#[test]
fn test_title_is_never_rewritten() {
    let symbols = RecordingSymbols::default()
        .symbol(None, "count")
        .symbol(Some("Orders"), "count")
        .current("CUBE")
        .cube("Orders");
    let source = concat!(
        "cube(\"Orders\", { title: [CUBE, count] });\n",
        "view(\"Orders\", { title: [CUBE, count] });\n",
        "context({ title: [CUBE, count] });\n",
        "dashboardTemplate({ title: [CUBE, count] });\n",
    );
    assert_eq!(transpile_with(&symbols, source), source);
}

// ============================================================================
// Call site handling
// ============================================================================

#[test]
fn test_every_keyword_requires_plain_callee() {
    let symbols = RecordingSymbols::default().current("CUBE");
    let source = concat!(
        "a.view({ sql: CUBE });\n",
        "a[\"cube\"]({ sql: CUBE });\n",
        "factory().context({ sql: CUBE });\n",
        "(x ? dashboardTemplate : y)({ measures: CUBE });\n",
    );
    let mut tree = lower(source);
    let report = CubePropContextTranspiler::new(&symbols, &symbols)
        .transpile(&mut tree)
        .unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_single_argument_cube_uses_it_as_body() {
    let symbols = RecordingSymbols::default().current("CUBE");
    let output = transpile_with(&symbols, "cube({ sql: CUBE })");
    assert_eq!(output, "cube({ sql: (CUBE) => CUBE });\n");
}

#[test]
fn test_view_applies_reference_and_extends_fields() {
    let symbols = RecordingSymbols::default()
        .symbol(Some("Big"), "count")
        .cube("Orders");
    let output = transpile_with(
        &symbols,
        r#"view("Big", { extends: Orders, measures: { c: { sql: count, drillMembers: [Orders] } } })"#,
    );
    assert_eq!(
        output,
        "view(\"Big\", { extends: (Orders) => Orders, measures: { c: { sql: (count) => count, drillMembers: () => [Orders] } } });\n"
    );
}

#[test]
fn test_template_cube_name_scopes_resolution() {
    let symbols = RecordingSymbols::default().symbol(Some("Orders"), "status");
    let output = transpile_with(&symbols, "cube(`Orders`, { sql: status })");
    assert_eq!(output, "cube(`Orders`, { sql: (status) => status });\n");
}

#[test]
fn test_template_with_substitution_uses_first_chunk() {
    let symbols = RecordingSymbols::default().symbol(Some("Orders_"), "status");
    let mut tree = lower("cube(`Orders_${suffix}`, { sql: status })");
    let report = CubePropContextTranspiler::new(&symbols, &symbols)
        .transpile(&mut tree)
        .unwrap();
    assert_eq!(report.call_sites[0].cube_name.as_deref(), Some("Orders_"));
    assert_eq!(report.call_sites[0].fields[0].params, vec!["status"]);
}

#[test]
fn test_nested_call_sites_are_visited() {
    let symbols = RecordingSymbols::default()
        .symbol(Some("Inner"), "id")
        .current("CUBE");
    let output = transpile_with(
        &symbols,
        r#"cube("Outer", { sql: [CUBE, cube("Inner", { sql: id })] })"#,
    );
    assert_eq!(
        output,
        "cube(\"Outer\", { sql: (CUBE) => [CUBE, cube(\"Inner\", { sql: (id) => id })] });\n"
    );
}

#[test]
fn test_report_lists_call_sites_in_source_order() {
    let symbols = SchemaSymbols::new()
        .with_cube("Orders", ["status"])
        .with_cube("Users", ["id"]);
    let mut tree = lower(concat!(
        "cube(\"Orders\", { sql: status });\n",
        "context({ sql: SECURITY_CONTEXT });\n",
        "view(\"Users\", { sql: id });\n",
        "dashboardTemplate({ title: 1 });\n",
    ));
    let report = CubePropContextTranspiler::new(&symbols, &symbols)
        .transpile(&mut tree)
        .unwrap();

    let kinds: Vec<CallSiteKind> = report.call_sites.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CallSiteKind::Cube,
            CallSiteKind::Context,
            CallSiteKind::View,
            CallSiteKind::DashboardTemplate
        ]
    );
    assert_eq!(report.rewritten_count(), 3);
    assert!(report.call_sites[3].fields.is_empty());
}

#[test]
fn test_closure_is_linked_into_tree() {
    let symbols = RecordingSymbols::default().current("CUBE");
    let mut tree = lower(r#"cube("Orders", { sql: CUBE })"#);
    let report = CubePropContextTranspiler::new(&symbols, &symbols)
        .transpile(&mut tree)
        .unwrap();
    let field = &report.call_sites[0].fields[0];

    assert_eq!(tree.parent(field.closure), Some(field.property));
    match tree.kind(field.closure) {
        NodeKind::ArrowFunctionExpression { params, body } => {
            assert_eq!(params.len(), 1);
            assert_eq!(tree.parent(*body), Some(field.closure));
            assert_eq!(tree.identifier_name(*body), Some("CUBE"));
        }
        other => panic!("Expected arrow function, got {:?}", other),
    }
}

// ============================================================================
// Resolver failures
// ============================================================================

struct FailingSymbols;

impl CubeSymbols for FailingSymbols {
    fn resolve_symbol(&self, _: Option<&str>, name: &str) -> Result<bool, ResolveError> {
        Err(ResolveError::Lookup {
            name: name.to_string(),
            message: "symbol table unavailable".to_string(),
        })
    }

    fn is_current_cube(&self, _: &str) -> Result<bool, ResolveError> {
        Ok(false)
    }
}

impl CubeDictionary for FailingSymbols {
    fn resolve_cube(&self, _: &str) -> Result<bool, ResolveError> {
        Ok(true)
    }
}

#[test]
fn test_resolver_error_is_propagated_unchanged() {
    let mut tree = lower(r#"cube("Orders", { sql: status })"#);
    let err = CubePropContextTranspiler::new(FailingSymbols, FailingSymbols)
        .transpile(&mut tree)
        .unwrap_err();

    match &err {
        TranspileError::Resolve(ResolveError::Lookup { name, message }) => {
            assert_eq!(name, "status");
            assert_eq!(message, "symbol table unavailable");
        }
        other => panic!("Expected lookup error, got {:?}", other),
    }
    assert_eq!(err.to_string(), "Failed to resolve 'status': symbol table unavailable");
}

#[test]
fn test_fields_without_identifiers_never_consult_resolver() {
    let mut tree = lower(r#"cube("Orders", { sql: "SELECT 1", extends: Orders })"#);
    let report = CubePropContextTranspiler::new(FailingSymbols, FailingSymbols)
        .transpile(&mut tree)
        .unwrap();
    assert_eq!(report.rewritten_count(), 2);
    assert_eq!(
        printer::print(&tree),
        "cube(\"Orders\", { sql: () => \"SELECT 1\", extends: (Orders) => Orders });\n"
    );
}
