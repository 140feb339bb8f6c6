//! `SELECT` queries, set operations and `FROM` sources.

use sqlparser::tokenizer::Token;

use super::{PResult, Parser};
use crate::ast::{
    Cte, Expr, Join, JoinKind, ObjectName, Query, QueryBody, Select, SetOperator, TableFactor,
    TableWithJoins,
};
use crate::cursor::is_reserved;

/// Legacy hints written as `FROM t (NOLOCK)`.
const TABLE_HINTS: &[&str] = &[
    "HOLDLOCK",
    "NOLOCK",
    "NOWAIT",
    "PAGLOCK",
    "READCOMMITTED",
    "READPAST",
    "READUNCOMMITTED",
    "REPEATABLEREAD",
    "ROWLOCK",
    "SERIALIZABLE",
    "TABLOCK",
    "TABLOCKX",
    "UPDLOCK",
    "XLOCK",
];

impl Parser {
    pub(crate) fn parse_query(&mut self) -> PResult<Query> {
        self.nested(|parser| {
            let ctes = if parser.cursor.parse_keyword("WITH") {
                parser.parse_ctes()?
            } else {
                Vec::new()
            };
            parser.parse_query_after_ctes(ctes)
        })
    }

    pub(crate) fn parse_query_after_ctes(&mut self, ctes: Vec<Cte>) -> PResult<Query> {
        let body = self.parse_query_body()?;

        let order_by = if self.cursor.parse_keywords(&["ORDER", "BY"]) {
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };

        if self.cursor.parse_keyword("OFFSET") {
            self.parse_expr()?;
            let _ = self.cursor.parse_keyword("ROWS") || self.cursor.parse_keyword("ROW");
            if self.cursor.parse_keyword("FETCH") {
                let _ = self.cursor.parse_keyword("NEXT") || self.cursor.parse_keyword("FIRST");
                self.parse_expr()?;
                let _ = self.cursor.parse_keyword("ROWS") || self.cursor.parse_keyword("ROW");
                self.cursor.expect_keyword("ONLY")?;
            }
        }

        if self.cursor.peek_keyword("FOR")
            && (self.cursor.peek_nth_keyword(1, "XML")
                || self.cursor.peek_nth_keyword(1, "JSON")
                || self.cursor.peek_nth_keyword(1, "BROWSE"))
        {
            self.skip_for_clause()?;
        }

        self.skip_option_clause()?;

        Ok(Query {
            ctes,
            body,
            order_by,
        })
    }

    /// `name [(columns)] AS (query), ...`
    pub(crate) fn parse_ctes(&mut self) -> PResult<Vec<Cte>> {
        let mut ctes = Vec::new();
        loop {
            let name = self.parse_identifier()?;
            if self.cursor.peek() == &Token::LParen {
                self.parse_parenthesized_identifiers()?;
            }
            self.cursor.expect_keyword("AS")?;
            self.cursor.expect(&Token::LParen)?;
            let query = self.parse_query()?;
            self.cursor.expect(&Token::RParen)?;
            ctes.push(Cte { name, query });

            if !self.cursor.consume(&Token::Comma) {
                return Ok(ctes);
            }
        }
    }

    fn parse_query_body(&mut self) -> PResult<QueryBody> {
        let mut body = self.parse_set_operand()?;
        loop {
            let op = if self.cursor.parse_keyword("UNION") {
                let _ = self.cursor.parse_keyword("ALL");
                SetOperator::Union
            } else if self.cursor.parse_keyword("EXCEPT") {
                SetOperator::Except
            } else if self.cursor.parse_keyword("INTERSECT") {
                SetOperator::Intersect
            } else {
                return Ok(body);
            };
            let right = self.parse_set_operand()?;
            body = QueryBody::SetOperation {
                left: Box::new(body),
                op,
                right: Box::new(right),
            };
        }
    }

    fn parse_set_operand(&mut self) -> PResult<QueryBody> {
        if self.cursor.peek_keyword("SELECT") {
            return Ok(QueryBody::Select(Box::new(self.parse_select()?)));
        }
        if self.cursor.peek_keyword("VALUES") {
            return Ok(QueryBody::Values(self.parse_values_rows()?));
        }
        if self.cursor.consume(&Token::LParen) {
            let query = self.parse_query()?;
            self.cursor.expect(&Token::RParen)?;
            return Ok(QueryBody::Nested(Box::new(query)));
        }
        Err(self.cursor.unexpected("SELECT"))
    }

    /// `VALUES (a, b), (c, d)`
    pub(crate) fn parse_values_rows(&mut self) -> PResult<Vec<Vec<Expr>>> {
        self.cursor.expect_keyword("VALUES")?;
        let mut rows = Vec::new();
        loop {
            self.cursor.expect(&Token::LParen)?;
            rows.push(self.parse_expr_list()?);
            self.cursor.expect(&Token::RParen)?;
            if !self.cursor.consume(&Token::Comma) {
                return Ok(rows);
            }
        }
    }

    fn parse_select(&mut self) -> PResult<Select> {
        self.cursor.expect_keyword("SELECT")?;
        let _ = self.cursor.parse_keyword("ALL") || self.cursor.parse_keyword("DISTINCT");
        let top = self.parse_top()?;

        let mut projection = vec![self.parse_select_item()?];
        while self.cursor.consume(&Token::Comma) {
            projection.push(self.parse_select_item()?);
        }

        let into = if self.cursor.parse_keyword("INTO") {
            Some(self.parse_object_name()?)
        } else {
            None
        };

        let from = if self.cursor.parse_keyword("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };

        let selection = if self.cursor.parse_keyword("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let group_by = if self.cursor.parse_keywords(&["GROUP", "BY"]) {
            let list = self.parse_expr_list()?;
            let _ = self.cursor.parse_keywords(&["WITH", "ROLLUP"])
                || self.cursor.parse_keywords(&["WITH", "CUBE"]);
            list
        } else {
            Vec::new()
        };

        let having = if self.cursor.parse_keyword("HAVING") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Select {
            top,
            projection,
            into,
            from,
            selection,
            group_by,
            having,
        })
    }

    /// `TOP (n) [PERCENT] [WITH TIES]` or the legacy `TOP n`.
    pub(crate) fn parse_top(&mut self) -> PResult<Option<Expr>> {
        if !self.cursor.parse_keyword("TOP") {
            return Ok(None);
        }
        let value = if self.cursor.consume(&Token::LParen) {
            let value = self.parse_expr()?;
            self.cursor.expect(&Token::RParen)?;
            value
        } else {
            self.parse_primary()?
        };
        let _ = self.cursor.parse_keyword("PERCENT");
        let _ = self.cursor.parse_keywords(&["WITH", "TIES"]);
        Ok(Some(value))
    }

    fn parse_select_item(&mut self) -> PResult<Expr> {
        let expr = self.parse_expr()?;
        self.parse_alias()?;
        Ok(expr)
    }

    fn parse_order_by_list(&mut self) -> PResult<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_expr()?);
            let _ = self.cursor.parse_keyword("ASC") || self.cursor.parse_keyword("DESC");
            if !self.cursor.consume(&Token::Comma) {
                return Ok(items);
            }
        }
    }

    /// `[AS] alias`, `AS 'alias'`, or nothing.
    pub(crate) fn parse_alias(&mut self) -> PResult<Option<String>> {
        if self.cursor.parse_keyword("AS") {
            if let Token::SingleQuotedString(alias) = self.cursor.peek() {
                let alias = alias.clone();
                self.cursor.next_token();
                return Ok(Some(alias));
            }
            return self.parse_identifier().map(Some);
        }

        let alias = self
            .cursor
            .peek_nth_word(0)
            .filter(|word| word.quote_style.is_some() || !is_reserved(&word.value))
            .filter(|word| !word.value.starts_with('@'))
            .map(|word| word.value.clone())
            // `label:` starts the next statement
            .filter(|_| self.cursor.peek_nth(1) != &Token::Colon);
        if alias.is_some() {
            self.cursor.next_token();
        }
        Ok(alias)
    }

    /// `FOR XML PATH(''), TYPE` and friends.
    fn skip_for_clause(&mut self) -> PResult<()> {
        self.cursor.expect_keyword("FOR")?;
        loop {
            match self.cursor.peek() {
                Token::Word(word) if word.quote_style.is_some() || !is_reserved(&word.value) => {
                    self.cursor.next_token();
                    if self.cursor.peek() == &Token::LParen {
                        self.cursor.skip_parenthesized()?;
                    }
                }
                Token::Comma => {
                    self.cursor.next_token();
                }
                _ => return Ok(()),
            }
        }
    }

    /// `OPTION (RECOMPILE, MAXDOP 1)`
    pub(crate) fn skip_option_clause(&mut self) -> PResult<()> {
        if self.cursor.peek_keyword("OPTION") && self.cursor.peek_nth(1) == &Token::LParen {
            self.cursor.next_token();
            self.cursor.skip_parenthesized()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // FROM
    // ------------------------------------------------------------------------

    pub(crate) fn parse_from_list(&mut self) -> PResult<Vec<TableWithJoins>> {
        let mut sources = vec![self.parse_table_with_joins()?];
        while self.cursor.consume(&Token::Comma) {
            sources.push(self.parse_table_with_joins()?);
        }
        Ok(sources)
    }

    pub(crate) fn parse_table_with_joins(&mut self) -> PResult<TableWithJoins> {
        let relation = self.parse_table_factor()?;
        let mut joins = Vec::new();

        while let Some(kind) = self.parse_join_operator()? {
            let relation = self.parse_table_factor()?;
            let constraint = match kind {
                JoinKind::Cross | JoinKind::CrossApply | JoinKind::OuterApply => None,
                _ => {
                    self.cursor.expect_keyword("ON")?;
                    Some(self.parse_expr()?)
                }
            };
            joins.push(Join {
                kind,
                relation,
                constraint,
            });
        }

        Ok(TableWithJoins { relation, joins })
    }

    fn parse_join_operator(&mut self) -> PResult<Option<JoinKind>> {
        if self.cursor.parse_keywords(&["CROSS", "APPLY"]) {
            return Ok(Some(JoinKind::CrossApply));
        }
        if self.cursor.parse_keywords(&["OUTER", "APPLY"]) {
            return Ok(Some(JoinKind::OuterApply));
        }

        let kind = if self.cursor.parse_keyword("CROSS") {
            JoinKind::Cross
        } else if self.cursor.parse_keyword("INNER") {
            JoinKind::Inner
        } else if self.cursor.parse_keyword("LEFT") {
            let _ = self.cursor.parse_keyword("OUTER");
            JoinKind::Left
        } else if self.cursor.parse_keyword("RIGHT") {
            let _ = self.cursor.parse_keyword("OUTER");
            JoinKind::Right
        } else if self.cursor.parse_keyword("FULL") {
            let _ = self.cursor.parse_keyword("OUTER");
            JoinKind::Full
        } else if self.cursor.peek_keyword("JOIN") {
            JoinKind::Inner
        } else {
            return Ok(None);
        };

        // physical join hints
        if self.cursor.peek_nth_keyword(1, "JOIN") {
            let _ = self.cursor.parse_keyword("HASH")
                || self.cursor.parse_keyword("LOOP")
                || self.cursor.parse_keyword("MERGE")
                || self.cursor.parse_keyword("REMOTE");
        }
        self.cursor.expect_keyword("JOIN")?;
        Ok(Some(kind))
    }

    pub(crate) fn parse_table_factor(&mut self) -> PResult<TableFactor> {
        if self.cursor.peek() == &Token::LParen {
            return self.nested(Self::parse_parenthesized_factor);
        }

        let name = self.parse_object_name()?;
        let factor = if self.cursor.peek() == &Token::LParen && !self.at_legacy_hint() {
            self.cursor.next_token();
            let args = if self.cursor.peek() == &Token::RParen {
                Vec::new()
            } else {
                self.parse_expr_list()?
            };
            self.cursor.expect(&Token::RParen)?;
            let alias = self.parse_table_alias()?;
            TableFactor::Function { name, args, alias }
        } else {
            let alias = self.parse_table_alias()?;
            TableFactor::Table { name, alias }
        };

        self.parse_pivot(factor)
    }

    fn parse_parenthesized_factor(&mut self) -> PResult<TableFactor> {
        let start = self.cursor.position();
        self.cursor.expect(&Token::LParen)?;

        let starts_query = self.cursor.peek_keyword("SELECT")
            || self.cursor.peek_keyword("WITH")
            || self.cursor.peek_keyword("VALUES")
            || self.cursor.peek() == &Token::LParen;
        if starts_query {
            match self.parse_query() {
                Ok(query) => {
                    if self.cursor.consume(&Token::RParen) {
                        let alias = self.parse_table_alias()?;
                        let factor = TableFactor::Derived {
                            subquery: Box::new(query),
                            alias,
                        };
                        return self.parse_pivot(factor);
                    }
                }
                Err(err) if self.nesting_exceeded => return Err(err),
                Err(_) => {}
            }
            // `((a JOIN b ON ...))` is a nested join, not a query
            self.cursor.rewind(start + 1);
        }

        let table = self.parse_table_with_joins()?;
        self.cursor.expect(&Token::RParen)?;
        let alias = self.parse_table_alias()?;
        Ok(TableFactor::NestedJoin {
            table: Box::new(table),
            alias,
        })
    }

    /// Alias, optional column aliases and table hints after a source.
    fn parse_table_alias(&mut self) -> PResult<Option<String>> {
        self.skip_table_hints()?;
        let alias = self.parse_alias()?;
        if alias.is_some() && self.cursor.peek() == &Token::LParen && !self.at_legacy_hint() {
            self.parse_parenthesized_identifiers()?;
        }
        self.skip_table_hints()?;
        Ok(alias)
    }

    /// `WITH (NOLOCK, INDEX(ix))` or legacy `(NOLOCK)`.
    pub(crate) fn skip_table_hints(&mut self) -> PResult<()> {
        if self.cursor.peek_keyword("WITH") && self.cursor.peek_nth(1) == &Token::LParen {
            self.cursor.next_token();
            self.cursor.skip_parenthesized()?;
        } else if self.at_legacy_hint() {
            self.cursor.skip_parenthesized()?;
        }
        Ok(())
    }

    fn at_legacy_hint(&self) -> bool {
        self.cursor.peek() == &Token::LParen
            && TABLE_HINTS
                .iter()
                .any(|hint| self.cursor.peek_nth_keyword(1, hint))
    }

    /// `PIVOT (...) AS p` / `UNPIVOT (...) AS u`; the result takes the new alias.
    fn parse_pivot(&mut self, factor: TableFactor) -> PResult<TableFactor> {
        if !(self.cursor.peek_keyword("PIVOT") || self.cursor.peek_keyword("UNPIVOT")) {
            return Ok(factor);
        }
        self.cursor.next_token();
        self.cursor.skip_parenthesized()?;
        let alias = self.parse_table_alias()?;
        Ok(TableFactor::NestedJoin {
            table: Box::new(TableWithJoins {
                relation: factor,
                joins: Vec::new(),
            }),
            alias,
        })
    }

    /// A DML target: an object name or a table variable, plus any hints.
    pub(crate) fn parse_dml_target(&mut self) -> PResult<ObjectName> {
        let name = self.parse_object_name()?;
        self.skip_table_hints()?;
        Ok(name)
    }
}
