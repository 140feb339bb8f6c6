//! Data-modifying statements and routine invocation.

use sqlparser::tokenizer::Token;

use super::{PResult, Parser};
use crate::ast::{
    Assignment, Delete, ExecArgument, Execute, Expr, Insert, InsertSource, Merge, MergeAction,
    MergeClause, OutputClause, Update,
};

impl Parser {
    /// `INSERT [TOP (n)] [INTO] target [(cols)] [OUTPUT ...] source`
    pub(crate) fn parse_insert(&mut self) -> PResult<Insert> {
        self.cursor.expect_keyword("INSERT")?;
        self.parse_top()?;
        let _ = self.cursor.parse_keyword("INTO");
        let target = self.parse_dml_target()?;

        let columns = if self.cursor.peek() == &Token::LParen
            && !self.cursor.peek_nth_keyword(1, "SELECT")
            && !self.cursor.peek_nth_keyword(1, "WITH")
        {
            self.parse_parenthesized_identifiers()?
        } else {
            Vec::new()
        };

        let output = self.parse_output_clause()?;

        let source = if self.cursor.peek_keyword("VALUES") {
            InsertSource::Values(self.parse_values_rows()?)
        } else if self.cursor.parse_keywords(&["DEFAULT", "VALUES"]) {
            InsertSource::DefaultValues
        } else if self.cursor.peek_keyword("EXEC") || self.cursor.peek_keyword("EXECUTE") {
            InsertSource::Execute(Box::new(self.parse_execute()?))
        } else if self.cursor.peek_keyword("SELECT")
            || self.cursor.peek_keyword("WITH")
            || self.cursor.peek() == &Token::LParen
        {
            InsertSource::Query(Box::new(self.parse_query()?))
        } else {
            return Err(self.cursor.unexpected("VALUES, SELECT or EXEC"));
        };

        Ok(Insert {
            target,
            columns,
            source,
            output,
        })
    }

    /// `UPDATE [TOP (n)] target SET ... [OUTPUT ...] [FROM ...] [WHERE ...]`
    pub(crate) fn parse_update(&mut self) -> PResult<Update> {
        self.cursor.expect_keyword("UPDATE")?;
        self.parse_top()?;
        let target = self.parse_dml_target()?;
        self.cursor.expect_keyword("SET")?;
        let assignments = self.parse_assignments()?;
        let output = self.parse_output_clause()?;

        let from = if self.cursor.parse_keyword("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = self.parse_where()?;
        self.skip_option_clause()?;

        Ok(Update {
            target,
            assignments,
            output,
            from,
            selection,
        })
    }

    /// `DELETE [TOP (n)] [FROM] target [OUTPUT ...] [FROM ...] [WHERE ...]`
    pub(crate) fn parse_delete(&mut self) -> PResult<Delete> {
        self.cursor.expect_keyword("DELETE")?;
        self.parse_top()?;
        let _ = self.cursor.parse_keyword("FROM");
        let target = self.parse_dml_target()?;
        // `DELETE FROM dbo.Orders o WHERE ...`
        if !self.cursor.peek_keyword("FROM") {
            self.parse_alias()?;
        }
        let output = self.parse_output_clause()?;

        let from = if self.cursor.parse_keyword("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = self.parse_where()?;
        self.skip_option_clause()?;

        Ok(Delete {
            target,
            output,
            from,
            selection,
        })
    }

    /// `MERGE [INTO] target [[AS] alias] USING source ON cond WHEN ... ;`
    pub(crate) fn parse_merge(&mut self) -> PResult<Merge> {
        self.cursor.expect_keyword("MERGE")?;
        self.parse_top()?;
        let _ = self.cursor.parse_keyword("INTO");
        let target = self.parse_dml_target()?;
        let alias = self.parse_alias()?;

        self.cursor.expect_keyword("USING")?;
        let source = self.parse_table_factor()?;
        self.cursor.expect_keyword("ON")?;
        let on = self.parse_expr()?;

        let mut clauses = Vec::new();
        while self.cursor.parse_keyword("WHEN") {
            let _ = self.cursor.parse_keyword("NOT");
            self.cursor.expect_keyword("MATCHED")?;
            if self.cursor.parse_keyword("BY") {
                let _ = self.cursor.parse_keyword("TARGET") || self.cursor.parse_keyword("SOURCE");
            }
            let predicate = if self.cursor.parse_keyword("AND") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.cursor.expect_keyword("THEN")?;
            let action = self.parse_merge_action()?;
            clauses.push(MergeClause { predicate, action });
        }

        let output = self.parse_output_clause()?;
        self.skip_option_clause()?;

        Ok(Merge {
            target,
            alias,
            source,
            on,
            clauses,
            output,
        })
    }

    fn parse_merge_action(&mut self) -> PResult<MergeAction> {
        if self.cursor.parse_keywords(&["UPDATE", "SET"]) {
            return Ok(MergeAction::Update(self.parse_assignments()?));
        }
        if self.cursor.parse_keyword("DELETE") {
            return Ok(MergeAction::Delete);
        }
        self.cursor.expect_keyword("INSERT")?;
        if self.cursor.parse_keywords(&["DEFAULT", "VALUES"]) {
            return Ok(MergeAction::Insert {
                columns: Vec::new(),
                values: Vec::new(),
            });
        }
        let columns = if self.cursor.peek() == &Token::LParen {
            self.parse_parenthesized_identifiers()?
        } else {
            Vec::new()
        };
        self.cursor.expect_keyword("VALUES")?;
        self.cursor.expect(&Token::LParen)?;
        let values = self.parse_expr_list()?;
        self.cursor.expect(&Token::RParen)?;
        Ok(MergeAction::Insert { columns, values })
    }

    /// `col = expr, @v = expr, t.col += expr`
    fn parse_assignments(&mut self) -> PResult<Vec<Assignment>> {
        let mut assignments = Vec::new();
        loop {
            let target = match self.parse_primary()? {
                target @ (Expr::Identifier(_) | Expr::Variable(_)) => target,
                _ => return Err(self.cursor.unexpected("column")),
            };
            self.expect_assignment_operator()?;
            let value = self.parse_expr()?;
            assignments.push(Assignment { target, value });
            if !self.cursor.consume(&Token::Comma) {
                return Ok(assignments);
            }
        }
    }

    fn parse_where(&mut self) -> PResult<Option<Expr>> {
        if self.cursor.parse_keyword("WHERE") {
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    /// `OUTPUT inserted.*, deleted.id [INTO target [(cols)]]`
    fn parse_output_clause(&mut self) -> PResult<Option<OutputClause>> {
        if !self.cursor.parse_keyword("OUTPUT") {
            return Ok(None);
        }
        let mut expressions = vec![self.parse_output_item()?];
        while self.cursor.consume(&Token::Comma) {
            expressions.push(self.parse_output_item()?);
        }

        let into = if self.cursor.parse_keyword("INTO") {
            let target = self.parse_object_name()?;
            if self.cursor.peek() == &Token::LParen {
                self.parse_parenthesized_identifiers()?;
            }
            Some(target)
        } else {
            None
        };

        // a second, client-bound OUTPUT may follow `OUTPUT ... INTO`
        if self.cursor.parse_keyword("OUTPUT") {
            expressions.extend(self.parse_expr_list()?);
        }

        Ok(Some(OutputClause { expressions, into }))
    }

    fn parse_output_item(&mut self) -> PResult<Expr> {
        let expr = self.parse_expr()?;
        self.parse_alias()?;
        Ok(expr)
    }

    /// `EXEC [@rc =] name [args]` or `EXEC (sql)`.
    pub(crate) fn parse_execute(&mut self) -> PResult<Execute> {
        if !(self.cursor.parse_keyword("EXEC") || self.cursor.parse_keyword("EXECUTE")) {
            return Err(self.cursor.unexpected("EXEC"));
        }

        if self.cursor.consume(&Token::LParen) {
            let sql = self.parse_expr()?;
            self.cursor.expect(&Token::RParen)?;
            // `EXEC (...) AS USER = 'x'` / `AT [DATA_SOURCE] linked_server`
            let mut linked_server = None;
            if self.cursor.parse_keyword("AT") {
                if self.cursor.peek_keyword("DATA_SOURCE") && self.cursor.peek_nth_word(1).is_some() {
                    self.cursor.next_token();
                }
                linked_server = Some(self.parse_identifier()?);
            } else if self.cursor.peek_keyword("AS") {
                self.cursor.next_token();
                self.parse_identifier()?;
                self.cursor.expect(&Token::Eq)?;
                self.parse_primary()?;
            }
            return Ok(Execute::Dynamic { sql, linked_server });
        }

        let return_status = self
            .cursor
            .peek_nth_word(0)
            .filter(|word| word.value.starts_with('@'))
            .map(|word| word.value.clone())
            .filter(|_| self.cursor.peek_nth(1) == &Token::Eq);
        if return_status.is_some() {
            self.cursor.next_token();
            self.cursor.next_token();
        }

        let name = self.parse_object_name()?;
        let args = self.parse_exec_arguments()?;

        if self.cursor.peek_keyword("WITH")
            && (self.cursor.peek_nth_keyword(1, "RECOMPILE")
                || self.cursor.peek_nth_keyword(1, "RESULT"))
        {
            self.cursor.next_token();
            self.skip_exec_options()?;
        }

        Ok(Execute::Procedure {
            name,
            return_status,
            args,
        })
    }

    fn parse_exec_arguments(&mut self) -> PResult<Vec<ExecArgument>> {
        let mut args = Vec::new();
        if self.at_statement_boundary() || self.cursor.peek() == &Token::RParen {
            return Ok(args);
        }
        loop {
            let name = self
                .cursor
                .peek_nth_word(0)
                .filter(|word| word.value.starts_with('@'))
                .map(|word| word.value.clone())
                .filter(|_| self.cursor.peek_nth(1) == &Token::Eq);
            if name.is_some() {
                self.cursor.next_token();
                self.cursor.next_token();
            }

            let value = self.parse_expr()?;
            let output = self.cursor.parse_keyword("OUTPUT") || self.cursor.parse_keyword("OUT");
            args.push(ExecArgument {
                name,
                value,
                output,
            });

            if !self.cursor.consume(&Token::Comma) {
                return Ok(args);
            }
        }
    }

    /// `RECOMPILE`, `RESULT SETS (...)`, comma-separated.
    fn skip_exec_options(&mut self) -> PResult<()> {
        loop {
            if self.cursor.parse_keywords(&["RESULT", "SETS"]) {
                if self.cursor.peek() == &Token::LParen {
                    self.cursor.skip_parenthesized()?;
                } else {
                    self.parse_identifier()?;
                }
            } else {
                self.parse_identifier()?;
            }
            if !self.cursor.consume(&Token::Comma) {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Execute, Expr, InsertSource, MergeAction, Statement};
    use crate::parse;

    fn single(sql: &str) -> Statement {
        let output = parse(sql);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.script.statements.len(), 1, "{:?}", output.script);
        output.script.statements.into_iter().next().unwrap()
    }

    #[test]
    fn insert_select_from_function() {
        let Statement::Insert(insert) = single(
            "INSERT INTO @UnwantedStages (StageId) SELECT StageId FROM [hub2].[fn_GetUnwantedRequestStages]()",
        ) else {
            panic!("expected INSERT");
        };
        assert!(insert.target.is_variable());
        assert_eq!(insert.columns, ["StageId"]);
        assert!(matches!(insert.source, InsertSource::Query(_)));
    }

    #[test]
    fn insert_exec_captures_procedure() {
        let Statement::Insert(insert) = single("INSERT #results EXEC dbo.GetRows @id = 1") else {
            panic!("expected INSERT");
        };
        assert!(matches!(insert.source, InsertSource::Execute(_)));
    }

    #[test]
    fn update_with_from_and_alias_target() {
        let Statement::Update(update) = single(
            "UPDATE t SET t.Col1 = s.Col1 FROM TargetTable t JOIN SourceTable s ON t.ID = s.ID",
        ) else {
            panic!("expected UPDATE");
        };
        assert_eq!(update.target.base_name(), Some("t"));
        assert_eq!(update.from.len(), 1);
        assert_eq!(update.from[0].joins.len(), 1);
    }

    #[test]
    fn delete_with_second_from() {
        let Statement::Delete(delete) =
            single("DELETE o FROM dbo.Orders o JOIN dbo.Stale s ON s.id = o.id WHERE s.flag = 1")
        else {
            panic!("expected DELETE");
        };
        assert_eq!(delete.target.base_name(), Some("o"));
        assert!(delete.selection.is_some());
    }

    #[test]
    fn output_into_is_captured() {
        let Statement::Delete(delete) =
            single("DELETE FROM dbo.Queue OUTPUT deleted.id INTO dbo.Archive (id) WHERE id < 10")
        else {
            panic!("expected DELETE");
        };
        let into = delete.output.and_then(|o| o.into);
        assert_eq!(into.and_then(|n| n.base_name().map(str::to_string)), Some("Archive".into()));
    }

    #[test]
    fn merge_clauses_are_parsed() {
        let Statement::Merge(merge) = single(
            "MERGE INTO dbo.Target AS t USING dbo.Source AS s ON t.id = s.id \
             WHEN MATCHED AND s.deleted = 1 THEN DELETE \
             WHEN MATCHED THEN UPDATE SET t.v = s.v \
             WHEN NOT MATCHED BY TARGET THEN INSERT (id, v) VALUES (s.id, s.v);",
        ) else {
            panic!("expected MERGE");
        };
        assert_eq!(merge.alias.as_deref(), Some("t"));
        assert_eq!(merge.clauses.len(), 3);
        assert!(matches!(merge.clauses[0].action, MergeAction::Delete));
    }

    #[test]
    fn exec_with_return_status_and_named_arguments() {
        let Statement::Execute(execute) =
            single("EXEC @rc = dbo.DoWork @id = 5, @name = N'x', @out = @result OUTPUT")
        else {
            panic!("expected EXEC");
        };
        let Execute::Procedure {
            name,
            return_status,
            args,
        } = *execute
        else {
            panic!("expected procedure call");
        };
        assert_eq!(name.base_name(), Some("DoWork"));
        assert_eq!(return_status.as_deref(), Some("@rc"));
        assert_eq!(args.len(), 3);
        assert!(args[2].output);
    }

    #[test]
    fn exec_of_string_is_dynamic() {
        let Statement::Execute(execute) = single("EXEC ('SELECT * FROM ' + 'dbo.T')") else {
            panic!("expected EXEC");
        };
        assert!(matches!(
            *execute,
            Execute::Dynamic {
                sql: Expr::Binary { .. },
                linked_server: None,
            }
        ));
    }

    #[test]
    fn exec_at_linked_server_keeps_server() {
        let Statement::Execute(execute) = single("EXEC ('SELECT * FROM dbo.T') AT [RemoteSrv]") else {
            panic!("expected EXEC");
        };
        let Execute::Dynamic { linked_server, .. } = *execute else {
            panic!("expected dynamic EXEC");
        };
        assert_eq!(linked_server.as_deref(), Some("RemoteSrv"));
    }

    #[test]
    fn exec_without_arguments_stops_at_next_statement() {
        let output = parse("EXEC CalleeProc SELECT 1");
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.script.statements.len(), 2);
    }
}
