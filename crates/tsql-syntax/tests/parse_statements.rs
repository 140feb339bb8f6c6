//! Parsing of realistic routine definitions.

use rstest::rstest;
use tsql_syntax::{
    Execute, Expr, InsertSource, Literal, QueryBody, RoutineKind, Statement, TableFactor, parse,
};

fn clean(sql: &str) -> Vec<Statement> {
    let output = parse(sql);
    assert!(
        output.errors.is_empty(),
        "unexpected errors for {sql:?}: {:?}",
        output.errors
    );
    output.script.statements
}

fn routine_body(sql: &str) -> Vec<Statement> {
    let mut statements = clean(sql);
    assert_eq!(statements.len(), 1, "expected one routine: {statements:?}");
    match statements.remove(0) {
        Statement::CreateRoutine(routine) => routine.body,
        other => panic!("expected routine definition, got {other:?}"),
    }
}

// === Routine headers ===

#[rstest]
#[case::procedure("CREATE PROCEDURE dbo.p AS SELECT 1", RoutineKind::Procedure)]
#[case::proc_short("CREATE PROC dbo.p @id INT AS SELECT @id", RoutineKind::Procedure)]
#[case::alter_procedure("ALTER PROCEDURE [dbo].[p] AS BEGIN SELECT 1 END", RoutineKind::Procedure)]
#[case::create_or_alter("CREATE OR ALTER PROCEDURE dbo.p AS SELECT 1", RoutineKind::Procedure)]
#[case::scalar_function(
    "CREATE FUNCTION dbo.f (@a INT) RETURNS INT AS BEGIN RETURN @a + 1 END",
    RoutineKind::Function
)]
#[case::inline_tvf(
    "CREATE FUNCTION dbo.f () RETURNS TABLE AS RETURN (SELECT id FROM dbo.t)",
    RoutineKind::Function
)]
#[case::multi_statement_tvf(
    "CREATE FUNCTION dbo.f () RETURNS @r TABLE (id INT) AS BEGIN INSERT @r SELECT id FROM dbo.t RETURN END",
    RoutineKind::Function
)]
#[case::view("CREATE VIEW dbo.v WITH SCHEMABINDING AS SELECT id FROM dbo.t", RoutineKind::View)]
#[case::trigger(
    "CREATE TRIGGER dbo.trg ON dbo.t AFTER INSERT, UPDATE AS BEGIN SET NOCOUNT ON END",
    RoutineKind::Trigger
)]
fn routine_kinds_are_recognised(#[case] sql: &str, #[case] expected: RoutineKind) {
    let statements = clean(sql);
    let Statement::CreateRoutine(routine) = &statements[0] else {
        panic!("expected routine, got {:?}", statements[0]);
    };
    assert_eq!(routine.kind, expected);
    assert!(!routine.body.is_empty());
}

#[test]
fn routine_body_ends_at_go() {
    let statements = clean(
        "CREATE PROCEDURE dbo.a AS SELECT 1\nGO\nCREATE PROCEDURE dbo.b AS SELECT 2\nGO",
    );
    assert_eq!(statements.len(), 2);
}

// === Control flow ===

#[test]
fn try_catch_blocks_are_flattened() {
    let body = routine_body(
        "CREATE PROCEDURE dbo.p AS
         BEGIN TRY
             BEGIN TRANSACTION
             DELETE FROM dbo.Queue WHERE id = 1
             COMMIT TRANSACTION
         END TRY
         BEGIN CATCH
             ROLLBACK TRANSACTION;
             THROW;
         END CATCH",
    );
    let Statement::Block(statements) = &body[0] else {
        panic!("expected block, got {:?}", body[0]);
    };
    assert_eq!(statements.len(), 5);
    assert!(matches!(statements[1], Statement::Delete(_)));
}

#[test]
fn if_else_with_exists_condition() {
    let statements = clean(
        "IF EXISTS (SELECT 1 FROM dbo.Orders WHERE id = @id)
             UPDATE dbo.Orders SET qty = 1 WHERE id = @id;
         ELSE
             INSERT INTO dbo.Orders (id, qty) VALUES (@id, 1);",
    );
    let Statement::If {
        branches,
        else_branch,
    } = &statements[0]
    else {
        panic!("expected IF");
    };
    assert_eq!(branches.len(), 1);
    assert!(matches!(branches[0].condition, Expr::Exists(_)));
    assert!(matches!(branches[0].body, Statement::Update(_)));
    assert!(matches!(
        else_branch.as_deref(),
        Some(Statement::Insert(_))
    ));
}

#[test]
fn else_if_chain_is_flat() {
    let mut sql = String::from("IF @mode = 0 EXEC dbo.Mode0");
    for mode in 1..500 {
        sql.push_str(&format!("\nELSE IF @mode = {mode} EXEC dbo.Mode{mode}"));
    }
    sql.push_str("\nELSE THROW 50000, 'unknown mode', 1;");

    let statements = clean(&sql);
    let Statement::If {
        branches,
        else_branch,
    } = &statements[0]
    else {
        panic!("expected IF");
    };
    assert_eq!(branches.len(), 500);
    assert!(matches!(&branches[499].body, Statement::Execute(_)));
    assert!(matches!(
        else_branch.as_deref(),
        Some(Statement::Other { keyword, .. }) if keyword == "THROW"
    ));
}

#[test]
fn while_loop_with_cursor() {
    let statements = clean(
        "DECLARE c CURSOR LOCAL FAST_FORWARD FOR SELECT id FROM dbo.Work
         OPEN c
         FETCH NEXT FROM c INTO @id
         WHILE @@FETCH_STATUS = 0
         BEGIN
             EXEC dbo.Process @id
             FETCH NEXT FROM c INTO @id
         END
         CLOSE c
         DEALLOCATE c",
    );
    assert_eq!(statements.len(), 6);
    let Statement::Declare(initializers) = &statements[0] else {
        panic!("expected DECLARE");
    };
    assert!(matches!(initializers[0], Expr::Subquery(_)));
    assert!(matches!(statements[3], Statement::While { .. }));
}

#[test]
fn labels_and_goto_parse() {
    let statements = clean("IF @x = 1 GOTO done\nSELECT 1\ndone:\nRETURN 0");
    assert_eq!(statements.len(), 4);
}

// === Queries ===

#[test]
fn cte_feeds_select() {
    let statements = clean(
        "WITH recent AS (SELECT id FROM dbo.Orders WHERE d > @since)
         SELECT r.id, c.name FROM recent r JOIN dbo.Customers c ON c.id = r.id",
    );
    let Statement::Query(query) = &statements[0] else {
        panic!("expected query");
    };
    assert_eq!(query.ctes.len(), 1);
    assert_eq!(query.ctes[0].name, "recent");
}

#[test]
fn cte_scopes_a_dml_statement() {
    let statements = clean(
        "WITH dupes AS (SELECT id FROM dbo.Orders GROUP BY id HAVING COUNT(*) > 1)
         DELETE FROM dbo.Orders WHERE id IN (SELECT id FROM dupes)",
    );
    assert!(matches!(
        &statements[0],
        Statement::WithCtes { statement, .. } if matches!(**statement, Statement::Delete(_))
    ));
}

#[test]
fn union_of_selects() {
    let statements = clean("SELECT id FROM dbo.a UNION ALL SELECT id FROM dbo.b EXCEPT SELECT 1");
    let Statement::Query(query) = &statements[0] else {
        panic!("expected query");
    };
    assert!(matches!(query.body, QueryBody::SetOperation { .. }));
}

#[test]
fn apply_and_stuff_for_xml() {
    clean(
        "SELECT o.id,
                STUFF((SELECT ',' + l.code FROM dbo.Lines l WHERE l.oid = o.id FOR XML PATH('')), 1, 1, '') AS codes
         FROM dbo.Orders o
         CROSS APPLY dbo.fn_Split(o.tags, ',') s
         OUTER APPLY (SELECT TOP 1 * FROM dbo.Notes n WHERE n.oid = o.id ORDER BY n.d DESC) latest",
    );
}

#[test]
fn three_part_and_four_part_names() {
    let statements = clean("SELECT * FROM [CFLIVE].[dbo].[oas_grplist] g JOIN srv.Cat.dbo.t x ON 1 = 1");
    let Statement::Query(query) = &statements[0] else {
        panic!("expected query");
    };
    let QueryBody::Select(select) = &query.body else {
        panic!("expected select");
    };
    let TableFactor::Table { name, .. } = &select.from[0].relation else {
        panic!("expected table");
    };
    assert_eq!(name.catalog_name(), Some("CFLIVE"));
    let TableFactor::Table { name, .. } = &select.from[0].joins[0].relation else {
        panic!("expected table");
    };
    assert_eq!(name.server_name(), Some("srv"));
}

// === Dynamic SQL ===

#[rstest]
#[case::literal("EXEC('SELECT * FROM T; EXEC P;')")]
#[case::national("EXECUTE (N'SELECT 1')")]
#[case::concatenation("EXEC ('SELECT * FROM ' + 'dbo.T' + ' WHERE 1 = 1')")]
#[case::variable("EXEC (@sql)")]
fn dynamic_exec_forms(#[case] sql: &str) {
    let statements = clean(sql);
    let Statement::Execute(execute) = &statements[0] else {
        panic!("expected EXEC");
    };
    assert!(matches!(**execute, Execute::Dynamic { .. }));
}

#[test]
fn sp_executesql_keeps_sql_argument() {
    let statements = clean("EXEC sp_executesql N'SELECT * FROM dbo.T WHERE id = @id', N'@id INT', @id = 5");
    let Statement::Execute(execute) = &statements[0] else {
        panic!("expected EXEC");
    };
    let Execute::Procedure { name, args, .. } = &**execute else {
        panic!("expected procedure call");
    };
    assert_eq!(name.base_name(), Some("sp_executesql"));
    assert_eq!(
        args[0].value,
        Expr::Literal(Literal::String {
            value: "SELECT * FROM dbo.T WHERE id = @id".to_string(),
            national: true,
        })
    );
}

// === DML ===

#[test]
fn insert_variants() {
    let statements = clean(
        "INSERT INTO dbo.t (a) VALUES (1), (2)
         INSERT dbo.t DEFAULT VALUES
         INSERT INTO dbo.t (a) OUTPUT inserted.a INTO @ids SELECT a FROM dbo.s",
    );
    let sources: Vec<_> = statements
        .iter()
        .map(|s| match s {
            Statement::Insert(insert) => &insert.source,
            other => panic!("expected INSERT, got {other:?}"),
        })
        .collect();
    assert!(matches!(sources[0], InsertSource::Values(rows) if rows.len() == 2));
    assert!(matches!(sources[1], InsertSource::DefaultValues));
    assert!(matches!(sources[2], InsertSource::Query(_)));
}

#[test]
fn bulk_insert_names_table() {
    let statements = clean(
        "BULK INSERT Staging.Imports FROM 'C:\\feeds\\orders.csv' \
         WITH (FIELDTERMINATOR = ',', FIRSTROW = 2)",
    );
    assert!(matches!(
        &statements[0],
        Statement::BulkInsert(name) if name.schema_name() == Some("Staging")
    ));
}

#[test]
fn truncate_names_table() {
    let statements = clean("TRUNCATE TABLE Staging.Imports");
    assert!(matches!(
        &statements[0],
        Statement::Truncate(name) if name.schema_name() == Some("Staging")
    ));
}

// === Administration ===

#[rstest]
#[case::dbcc("DBCC CHECKIDENT ('dbo.T', RESEED, 0) WITH NO_INFOMSGS", "DBCC")]
#[case::dbcc_bare("DBCC FREEPROCCACHE", "DBCC")]
#[case::checkpoint("CHECKPOINT", "CHECKPOINT")]
#[case::revert("REVERT", "REVERT")]
#[case::update_statistics("UPDATE STATISTICS dbo.T WITH FULLSCAN", "UPDATE STATISTICS")]
#[case::enable_trigger("ENABLE TRIGGER trg_Audit ON dbo.T", "ENABLE TRIGGER")]
#[case::disable_trigger("DISABLE TRIGGER ALL ON DATABASE", "DISABLE TRIGGER")]
#[case::execute_as_user("EXECUTE AS USER = 'loader'", "EXECUTE AS")]
#[case::execute_as_login("EXEC AS LOGIN = N'etl' WITH NO REVERT", "EXECUTE AS")]
#[case::execute_as_caller("EXECUTE AS CALLER", "EXECUTE AS")]
fn administrative_statements_do_not_break_the_body(#[case] statement: &str, #[case] keyword: &str) {
    let statements = clean(&format!(
        "SELECT * FROM dbo.T; {statement}; SELECT * FROM dbo.T"
    ));
    assert_eq!(statements.len(), 3, "{statements:?}");
    assert!(
        matches!(&statements[1], Statement::Other { keyword: k, .. } if k == keyword),
        "{:?}",
        statements[1]
    );
    assert!(matches!(statements[2], Statement::Query(_)));
}

#[test]
fn administrative_statements_end_without_semicolons() {
    let statements = clean(
        "DBCC FREEPROCCACHE
         UPDATE STATISTICS dbo.T
         SELECT * FROM dbo.T",
    );
    assert_eq!(statements.len(), 3, "{statements:?}");
    assert!(matches!(statements[2], Statement::Query(_)));
}

// === Nesting ===

#[test]
fn moderate_nesting_parses() {
    let depth = 30;
    let sql = format!(
        "SELECT {}1{} FROM dbo.T",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    clean(&sql);
}

#[rstest]
#[case::parentheses(format!("SELECT {}1{} FROM dbo.T", "(".repeat(10_000), ")".repeat(10_000)))]
#[case::negation(format!("SELECT * FROM dbo.T WHERE {}1 = 1", "NOT ".repeat(10_000)))]
#[case::unary_minus(format!("SELECT {}1", "- ".repeat(10_000)))]
#[case::subqueries(format!("SELECT * FROM {}dbo.T{}", "(SELECT * FROM ".repeat(5_000), ") x".repeat(5_000)))]
#[case::blocks(format!("{}SELECT 1{}", "BEGIN ".repeat(10_000), " END".repeat(10_000)))]
fn deep_nesting_is_a_parse_error(#[case] sql: String) {
    let output = parse(&format!("{sql}; SELECT * FROM dbo.After"));
    assert!(
        output.errors.iter().any(|e| e.message.contains("nesting exceeds")),
        "{:?}",
        output.errors.first()
    );
}

// === Errors ===

#[rstest]
#[case::garbage("INVALID SQL")]
#[case::missing_table("SELECT * FROM")]
#[case::unbalanced("SELECT (1 + 2 FROM dbo.t")]
#[case::broken_insert("INSERT INTO dbo.t VALUES (1,")]
fn malformed_text_reports_errors(#[case] sql: &str) {
    let output = parse(sql);
    assert!(!output.errors.is_empty(), "expected errors for {sql:?}");
    assert!(output.errors.iter().all(|e| e.line >= 1 && e.column >= 1));
}

#[test]
fn errors_do_not_hide_later_statements() {
    let output = parse("SELECT FROM; SELECT * FROM dbo.Good; GARBAGE; EXEC dbo.Next");
    assert_eq!(output.errors.len(), 2);
    assert_eq!(output.script.statements.len(), 2);
}
