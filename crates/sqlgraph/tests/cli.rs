//! Integration tests for the sqlgraph CLI.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rstest::{fixture, rstest};
use tempfile::TempDir;

// ============================================================================
// Test Fixtures
// ============================================================================

const OBJECTS: &str = r#"[
    {"name": "Orders", "kind": "table", "catalog": "Sales"},
    {"name": "Summary", "kind": "table", "catalog": "Sales"},
    {"name": "Summarize", "kind": "procedure", "catalog": "Sales",
     "definition": "INSERT INTO Summary SELECT * FROM Orders; EXEC Publish"},
    {"name": "Publish", "kind": "procedure", "catalog": "Sales",
     "definition": "SELECT * FROM Summary; SELECT * FROM dbo.Gone"},
    {"name": "Ping", "kind": "procedure", "catalog": "Sales", "definition": "EXEC Pong"},
    {"name": "Pong", "kind": "procedure", "catalog": "Sales", "definition": "EXEC Ping"}
]"#;

struct Workspace {
    _dir: TempDir,
    objects: PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let objects = dir.path().join("objects.json");
    std::fs::write(&objects, OBJECTS).expect("Failed to write objects");
    Workspace { _dir: dir, objects }
}

fn sqlgraph(args: &[&str], input: &Path) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sqlgraph"));
    let (subcommand, rest) = args.split_first().expect("a subcommand");
    command
        .arg(subcommand)
        .arg(input)
        .args(rest)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute sqlgraph binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// Commands
// ============================================================================

#[rstest]
fn build_prints_json_graph(workspace: Workspace) {
    let output = sqlgraph(&["build"], &workspace.objects);
    assert!(output.status.success(), "{}", stderr(&output));

    let graph: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("JSON output");
    let orders = &graph["[Sales].[dbo].[Orders]"];
    assert_eq!(orders["kind"], "table");
    assert_eq!(orders["outNodes"][0], "[Sales].[dbo].[Summarize]");
    assert!(stderr(&output).contains("diagnostics"));
}

#[rstest]
#[case::sequential(&["build", "--format", "summary"])]
#[case::parallel(&["build", "--format", "summary", "--parallel"])]
fn build_summary_lists_counts_and_diagnostics(workspace: Workspace, #[case] args: &[&str]) {
    let output = sqlgraph(args, &workspace.objects);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Objects:            6"), "{text}");
    assert!(text.contains("Edges:              6"), "{text}");
    assert!(text.contains("[Sales].[dbo].[Publish]: dbo.Gone matches no cataloged object"), "{text}");
}

#[rstest]
fn build_dot_is_a_digraph(workspace: Workspace) {
    let output = sqlgraph(&["build", "--format", "dot"], &workspace.objects);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("digraph"));
}

#[rstest]
fn cycles_reports_mutual_recursion(workspace: Workspace) {
    let output = sqlgraph(&["cycles"], &workspace.objects);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Found 1 circular dependencies"), "{text}");
    assert!(text.contains("Cycle 1 (recursive calls, 2 objects)"), "{text}");
    assert!(text.contains("[Sales].[dbo].[Ping] calls [Sales].[dbo].[Pong]"), "{text}");
    assert!(text.contains("[Sales].[dbo].[Pong] calls [Sales].[dbo].[Ping]"), "{text}");
}

#[test]
fn cycles_names_read_and_write_edges() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let objects = dir.path().join("objects.json");
    std::fs::write(
        &objects,
        r#"[
            {"name": "Counter", "kind": "table", "catalog": "Sales"},
            {"name": "Bump", "kind": "procedure", "catalog": "Sales",
             "definition": "SELECT * FROM Counter; TRUNCATE TABLE Counter"}
        ]"#,
    )
    .expect("Failed to write objects");

    let output = sqlgraph(&["cycles"], &objects);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Cycle 1 (data loop, 2 objects)"), "{text}");
    assert!(text.contains("[Sales].[dbo].[Bump] reads [Sales].[dbo].[Counter]"), "{text}");
    assert!(text.contains("[Sales].[dbo].[Bump] writes [Sales].[dbo].[Counter]"), "{text}");
}

#[rstest]
fn impact_follows_edges_downstream(workspace: Workspace) {
    let output = sqlgraph(&["impact", "dbo.orders"], &workspace.objects);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Direct dependents (1 objects)"), "{text}");
    assert!(text.contains("• [Sales].[dbo].[Summarize]"), "{text}");
    assert!(text.contains("• [Sales].[dbo].[Publish]"), "{text}");
}

#[rstest]
fn impact_depth_limits_the_search(workspace: Workspace) {
    let output = sqlgraph(&["impact", "Sales.dbo.Orders", "--depth", "1"], &workspace.objects);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Transitive dependents (0 objects)"), "{text}");
}

#[rstest]
fn usage_of_table_lists_readers_and_writers(workspace: Workspace) {
    let output = sqlgraph(&["usage", "Summary"], &workspace.objects);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Read by (1)"), "{text}");
    assert!(text.contains("Written by (1)"), "{text}");
}

#[rstest]
fn unknown_object_fails(workspace: Workspace) {
    let output = sqlgraph(&["usage", "dbo.Nope"], &workspace.objects);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("'dbo.Nope' is not in the graph"));
}

#[test]
fn jsonl_input_with_bad_line_still_builds() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let objects = dir.path().join("objects.jsonl");
    std::fs::write(
        &objects,
        concat!(
            r#"{"name": "T", "kind": "U"}"#,
            "\n{broken\n",
            r#"{"name": "P", "kind": "P", "definition": "SELECT * FROM T"}"#,
            "\n",
        ),
    )
    .expect("Failed to write objects");

    let output = sqlgraph(&["build"], &objects);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("line 2: malformed object record"));
    assert!(stdout(&output).contains("[Unknown].[dbo].[T]"));
}

#[test]
fn bad_config_is_reported() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let objects = dir.path().join("objects.json");
    std::fs::write(&objects, "[]").expect("Failed to write objects");
    let config = dir.path().join("sqlgraph.yaml");
    std::fs::write(&config, "default-schema: ''\n").expect("Failed to write config");

    let output = sqlgraph(
        &["build", "--config", config.to_str().expect("utf-8 path")],
        &objects,
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("configuration error"));
}
