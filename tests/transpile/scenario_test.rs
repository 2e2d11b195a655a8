//! End-to-end rewrites of realistic schema definitions.

use cubeprop::dsl;
use cubeprop::lowering::lower_program;
use cubeprop::symbols::SchemaSymbols;
use cubeprop::transpile::{CubePropContextTranspiler, Transpiler};
use cubeprop::tree::{printer, Tree};

fn lower(source: &str) -> Tree {
    let result = dsl::parse(source);
    assert!(result.is_ok(), "parse failed: {:?}", result.diagnostics);
    lower_program(result.program.as_ref().unwrap())
}

fn transpile(symbols: &SchemaSymbols, source: &str) -> String {
    let mut tree = lower(source);
    CubePropContextTranspiler::new(symbols, symbols)
        .transpile(&mut tree)
        .unwrap();
    printer::print(&tree)
}

#[test]
fn test_cube_sql_template_with_member() {
    let symbols = SchemaSymbols::new().with_cube("Orders", ["status", "count"]);
    let output = transpile(
        &symbols,
        r#"cube("Orders", {
            sql: `SELECT * FROM orders WHERE ${status} = 'x'`,
            measures: { count: { type: "count" } },
        })"#,
    );
    insta::assert_snapshot!(output.trim_end(), @r#"cube("Orders", { sql: (status) => `SELECT * FROM orders WHERE ${status} = 'x'`, measures: { count: { type: "count" } } });"#);
}

#[test]
fn test_cube_extends_and_plain_sql() {
    let symbols = SchemaSymbols::new()
        .with_cube("Orders", ["status"])
        .with_cube("SomeCube", ["id"]);
    let output = transpile(
        &symbols,
        r#"cube("Orders", { extends: SomeCube, sql: "SELECT * FROM orders" })"#,
    );
    insta::assert_snapshot!(output.trim_end(), @r#"cube("Orders", { extends: (SomeCube) => SomeCube, sql: () => "SELECT * FROM orders" });"#);
}

#[test]
fn test_dashboard_template_arrow_body() {
    let symbols = SchemaSymbols::new().with_global("count");
    let output = transpile(&symbols, "dashboardTemplate(() => ({ someMeasures: [count] }))");
    insta::assert_snapshot!(output.trim_end(), @"dashboardTemplate(() => ({ someMeasures: (count) => [count] }));");
}

#[test]
fn test_unrecognized_callee_unchanged() {
    let symbols = SchemaSymbols::new().with_global("count");
    let mut tree = lower("foo(1, 2, 3)");
    let before = tree.clone();
    let report = CubePropContextTranspiler::new(&symbols, &symbols)
        .transpile(&mut tree)
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(tree, before);
    assert_eq!(printer::print(&tree), "foo(1, 2, 3);\n");
}

#[test]
fn test_full_schema_file() {
    let symbols = SchemaSymbols::new()
        .with_cube("Orders", ["id", "status", "amount", "createdAt", "count", "userId"])
        .with_cube("Users", ["id", "city"]);
    let source = r#"
        // Orders placed through the storefront
        cube(`Orders`, {
            sql: `SELECT * FROM public.orders WHERE ${FILTER_PARAMS.Orders.createdAt.filter('created_at')}`,

            joins: {
                Users: {
                    relationship: `belongsTo`,
                    sql: `${CUBE}.user_id = ${Users}.id`,
                },
            },

            measures: {
                count: {
                    type: `count`,
                    drillMembers: [id, createdAt, Users.city],
                },
                total: {
                    sql: `${amount}`,
                    type: `sum`,
                    title: `Total ${amount}`,
                },
            },

            dimensions: {
                status: {
                    sql: `${CUBE}.status`,
                    type: `string`,
                },
            },
        });

        /* Shared helpers */
        context({
            sql: SECURITY_CONTEXT.tenant ? `tenant = ${SECURITY_CONTEXT.tenant}` : `1 = 1`,
        });
    "#;

    insta::assert_snapshot!(transpile(&symbols, source).trim_end(), @r#"
    cube(`Orders`, { sql: (FILTER_PARAMS) => `SELECT * FROM public.orders WHERE ${FILTER_PARAMS.Orders.createdAt.filter("created_at")}`, joins: { Users: { relationship: `belongsTo`, sql: (CUBE, Users) => `${CUBE}.user_id = ${Users}.id` } }, measures: { count: { type: `count`, drillMembers: (id, createdAt, Users) => [id, createdAt, Users.city] }, total: { sql: (amount) => `${amount}`, type: `sum`, title: `Total ${amount}` } }, dimensions: { status: { sql: (CUBE) => `${CUBE}.status`, type: `string` } } });
    context({ sql: (SECURITY_CONTEXT) => SECURITY_CONTEXT.tenant ? `tenant = ${SECURITY_CONTEXT.tenant}` : `1 = 1` });
    "#);
}
