//! Dynamic SQL is walked as if it were written inline.

use rstest::rstest;
use sqlgraph::{
    AnalysisConfig, CanonicalKey, DiagnosticKind, EdgeKind, GraphBuild, GraphBuilder, SqlObject,
};

fn key(name: &str) -> CanonicalKey {
    CanonicalKey::new("Cat", "dbo", name)
}

fn build_with(config: AnalysisConfig, body: &str) -> GraphBuild {
    GraphBuilder::new(config)
        .build(vec![
            SqlObject::table("Cat", "dbo", "T"),
            SqlObject::procedure("Cat", "dbo", "P", "SELECT 1"),
            SqlObject::procedure("Cat", "dbo", "O", body),
        ])
        .expect("build")
}

fn build(body: &str) -> GraphBuild {
    build_with(AnalysisConfig::default(), body)
}

fn kinds(build: &GraphBuild) -> Vec<DiagnosticKind> {
    build.diagnostics.iter().map(|d| d.kind).collect()
}

#[test]
fn dynamic_sql_matches_inline_sql() {
    let dynamic = build("EXEC('SELECT * FROM T; EXEC P;')");
    let inline = build("SELECT * FROM T; EXEC P;");

    assert!(dynamic.graph.contains_edge_of_kind(&key("T"), &key("O"), EdgeKind::DataFlow));
    assert!(dynamic.graph.contains_edge_of_kind(&key("O"), &key("P"), EdgeKind::Call));
    assert_eq!(dynamic.graph, inline.graph);
    assert_eq!(dynamic.stats.dynamic_sql_fragments, 1);
    assert!(dynamic.diagnostics.is_empty());
}

#[rstest]
#[case::concatenated("EXEC('SELECT * ' + N'FROM dbo.T')")]
#[case::sp_executesql("EXEC sp_executesql N'SELECT * FROM dbo.T'")]
#[case::sp_executesql_named("EXEC sp_executesql @stmt = N'SELECT * FROM dbo.T', @params = N'@id int', @id = 1")]
#[case::nested("EXEC('EXEC(''SELECT * FROM dbo.T'')')")]
fn literal_forms_are_walked(#[case] body: &str) {
    let build = build(body);
    assert!(build.graph.contains_edge(&key("T"), &key("O")));
    assert!(build.diagnostics.is_empty(), "{:?}", build.diagnostics);
}

#[rstest]
#[case::variable("EXEC(@sql)")]
#[case::built_from_variable("EXEC('SELECT * FROM ' + @table)")]
#[case::empty("EXEC('')")]
#[case::unparseable("EXEC('SELECT * FROM')")]
fn unusable_dynamic_sql_is_skipped(#[case] body: &str) {
    let build = build(body);
    assert_eq!(build.graph.edge_count(), 0);
    assert_eq!(kinds(&build), [DiagnosticKind::DynamicSqlSkipped]);
    assert_eq!(build.stats.parse_failures, 0);
}

#[test]
fn skipped_fragment_does_not_stop_the_object() {
    let build = build("EXEC(@sql); SELECT * FROM T;");
    assert!(build.graph.contains_edge(&key("T"), &key("O")));
    assert_eq!(kinds(&build), [DiagnosticKind::DynamicSqlSkipped]);
}

#[test]
fn nesting_past_the_limit_is_cut_off() {
    let config = AnalysisConfig {
        max_dynamic_sql_depth: 1,
        ..AnalysisConfig::default()
    };
    let build = build_with(
        config,
        "EXEC('EXEC P; EXEC(''SELECT * FROM dbo.T'')')",
    );
    assert!(build.graph.contains_edge(&key("O"), &key("P")));
    assert!(!build.graph.contains_edge(&key("T"), &key("O")));
    assert_eq!(kinds(&build), [DiagnosticKind::RecursionLimit]);
    assert_eq!(build.stats.dynamic_sql_fragments, 1);
}

#[test]
fn zero_depth_disables_dynamic_sql() {
    let config = AnalysisConfig {
        max_dynamic_sql_depth: 0,
        ..AnalysisConfig::default()
    };
    let build = build_with(config, "EXEC('SELECT * FROM T')");
    assert_eq!(build.graph.edge_count(), 0);
    assert_eq!(kinds(&build), [DiagnosticKind::RecursionLimit]);
}

#[test]
fn cte_name_shadows_table_only_in_its_statement() {
    let shadowed = build("WITH T AS (SELECT 1 AS x) SELECT * FROM T");
    assert_eq!(shadowed.graph.edge_count(), 0);
    assert!(shadowed.diagnostics.is_empty());

    let dynamic = build("WITH T AS (SELECT 1 AS x) SELECT * FROM T; EXEC('SELECT * FROM T')");
    assert!(dynamic.graph.contains_edge(&key("T"), &key("O")));
}

#[rstest]
#[case::bare("EXEC('SELECT * FROM dbo.T') AT RemoteSrv")]
#[case::bracketed("EXECUTE (N'EXEC dbo.P') AT [RemoteSrv]")]
#[case::data_source("EXEC('SELECT * FROM dbo.T') AT DATA_SOURCE RemoteSrv")]
fn linked_server_text_is_not_walked_locally(#[case] body: &str) {
    let build = build(body);
    assert_eq!(build.graph.edge_count(), 0);
    assert_eq!(kinds(&build), [DiagnosticKind::DynamicSqlSkipped]);
    assert!(build.diagnostics[0].message.contains("RemoteSrv"));
    assert_eq!(build.stats.dynamic_sql_fragments, 0);
}
