//! Recursive-descent T-SQL parser.
//!
//! The parser is lenient in the ways T-SQL modules need: semicolons are
//! optional, `GO` separates batches, and statements it has no use for (DDL,
//! session options, cursor plumbing) are skipped to the next statement
//! boundary rather than modelled.
//!
//! ## Error recovery
//!
//! A failed statement records its [`ParseError`] and the parser skips forward
//! to the next `;` or statement keyword at parenthesis depth zero. Parsing
//! then continues, so one text can report several errors.
//!
//! Statements, queries and expressions nested deeper than
//! [`MAX_NESTING_DEPTH`] fail with a [`ParseError`] instead of recursing
//! further.
//!
//! ## Layout
//!
//! - `mod.rs`: statement dispatch, control flow, routine headers
//! - `query.rs`: `SELECT`, set operations, `FROM` sources
//! - `dml.rs`: `INSERT`/`UPDATE`/`DELETE`/`MERGE`/`EXEC`
//! - `expr.rs`: expressions

mod dml;
mod expr;
mod query;

use sqlparser::tokenizer::Token;

use crate::ast::{IfBranch, ObjectName, RoutineDefinition, RoutineKind, Script, Statement};
use crate::cursor::Cursor;
use crate::error::ParseError;

type PResult<T> = Result<T, ParseError>;

/// Deepest nesting of statements, queries and expressions the parser
/// descends into.
pub(crate) const MAX_NESTING_DEPTH: usize = 64;

/// Keywords that begin a statement. Used both for dispatch and to find the
/// end of statements whose terminator is optional.
const STATEMENT_KEYWORDS: &[&str] = &[
    "ALTER",
    "BACKUP",
    "BEGIN",
    "BREAK",
    "BULK",
    "CHECKPOINT",
    "CLOSE",
    "COMMIT",
    "CONTINUE",
    "CREATE",
    "DBCC",
    "DEALLOCATE",
    "DECLARE",
    "DELETE",
    "DENY",
    "DISABLE",
    "DROP",
    "ELSE",
    "ENABLE",
    "END",
    "EXEC",
    "EXECUTE",
    "FETCH",
    "GO",
    "GOTO",
    "GRANT",
    "IF",
    "INSERT",
    "KILL",
    "MERGE",
    "OPEN",
    "PRINT",
    "RAISERROR",
    "RECONFIGURE",
    "RESTORE",
    "RETURN",
    "REVERT",
    "REVOKE",
    "ROLLBACK",
    "SAVE",
    "SELECT",
    "SET",
    "SETUSER",
    "SHUTDOWN",
    "THROW",
    "TRUNCATE",
    "UPDATE",
    "USE",
    "WAITFOR",
    "WHILE",
    "WITH",
];

/// Parser state: a token cursor, the errors recorded so far and the
/// current nesting depth.
pub(crate) struct Parser {
    cursor: Cursor,
    errors: Vec<ParseError>,
    depth: usize,
    /// Set when the current statement hit [`MAX_NESTING_DEPTH`]; such an
    /// error must not be retried as another parse.
    nesting_exceeded: bool,
}

impl Parser {
    pub(crate) fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            errors: Vec::new(),
            depth: 0,
            nesting_exceeded: false,
        }
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`].
    pub(crate) fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.nesting_exceeded = true;
            return Err(self
                .cursor
                .error(format!("nesting exceeds {MAX_NESTING_DEPTH} levels")));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse the whole input as a script.
    pub(crate) fn parse_script(mut self) -> (Script, Vec<ParseError>) {
        let statements = self.parse_statement_list(&[]);
        (Script { statements }, self.errors)
    }

    /// Parse a standalone object name covering the whole input.
    pub(crate) fn parse_standalone_name(mut self) -> PResult<ObjectName> {
        let name = self.parse_object_name()?;
        if self.cursor.is_eof() {
            Ok(name)
        } else {
            Err(self.cursor.unexpected("end of name"))
        }
    }

    /// Parse statements until end of input or one of `terminators` is next.
    /// The terminator itself is left for the caller.
    fn parse_statement_list(&mut self, terminators: &[&str]) -> Vec<Statement> {
        let mut statements = Vec::new();
        loop {
            while self.cursor.consume(&Token::SemiColon) {}
            if self.cursor.is_eof() || self.cursor.peek_any_keyword(terminators) {
                break;
            }
            if self.cursor.parse_keyword("GO") {
                continue;
            }

            let start = self.cursor.position();
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.errors.push(err);
                    self.nesting_exceeded = false;
                    self.recover(start);
                }
            }
        }
        statements
    }

    /// Skip to the next statement boundary, always making progress.
    fn recover(&mut self, start: usize) {
        if self.cursor.position() == start {
            self.cursor.next_token();
        }
        let mut depth = 0usize;
        loop {
            match self.cursor.peek() {
                Token::EOF => break,
                Token::SemiColon if depth == 0 => break,
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ if depth == 0 && self.at_statement_keyword() => break,
                _ => {}
            }
            self.cursor.next_token();
        }
    }

    fn at_statement_keyword(&self) -> bool {
        self.cursor.peek_any_keyword(STATEMENT_KEYWORDS)
    }

    /// End of input, `;`, or the start of another statement.
    fn at_statement_boundary(&self) -> bool {
        matches!(self.cursor.peek(), Token::EOF | Token::SemiColon) || self.at_statement_keyword()
    }

    /// Skip the rest of a statement we do not model.
    fn skip_to_boundary(&mut self) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            match self.cursor.peek() {
                Token::EOF if depth > 0 => return Err(self.cursor.error("unbalanced parenthesis")),
                Token::EOF => return Ok(()),
                Token::SemiColon if depth == 0 => return Ok(()),
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => return Err(self.cursor.unexpected("statement")),
                Token::RParen => depth -= 1,
                // `WITH (option = ...)`, `WITH NO_INFOMSGS` belong to the
                // statement being skipped
                _ if depth == 0 && self.cursor.peek_keyword("WITH") && !self.at_cte_start() => {}
                _ if depth == 0 && self.at_statement_keyword() => return Ok(()),
                _ => {}
            }
            self.cursor.next_token();
        }
    }

    /// `WITH name AS (` or `WITH name (cols) AS (`.
    fn at_cte_start(&self) -> bool {
        self.cursor.peek_keyword("WITH")
            && self.cursor.peek_nth_word(1).is_some()
            && (self.cursor.peek_nth(2) == &Token::LParen || self.cursor.peek_nth_keyword(2, "AS"))
    }

    fn other(keyword: &str, arguments: Vec<crate::ast::Expr>) -> Statement {
        Statement::Other {
            keyword: keyword.to_string(),
            arguments,
        }
    }

    pub(crate) fn parse_statement(&mut self) -> PResult<Statement> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> PResult<Statement> {
        if self.cursor.peek() == &Token::LParen {
            return Ok(Statement::Query(Box::new(self.parse_query()?)));
        }

        let Some(keyword) = self.cursor.peek_keyword_upper() else {
            return Err(self.cursor.unexpected("statement"));
        };

        match keyword.as_str() {
            "SELECT" => Ok(Statement::Query(Box::new(self.parse_query()?))),
            "WITH" => self.parse_with_statement(),
            "INSERT" => Ok(Statement::Insert(Box::new(self.parse_insert()?))),
            "UPDATE" if self.cursor.peek_nth_keyword(1, "STATISTICS") => {
                self.cursor.next_token();
                self.skip_to_boundary()?;
                Ok(Self::other("UPDATE STATISTICS", Vec::new()))
            }
            "UPDATE" => Ok(Statement::Update(Box::new(self.parse_update()?))),
            "DELETE" => Ok(Statement::Delete(Box::new(self.parse_delete()?))),
            "MERGE" => Ok(Statement::Merge(Box::new(self.parse_merge()?))),
            "EXEC" | "EXECUTE" if self.cursor.peek_nth_keyword(1, "AS") => self.parse_execute_as(),
            "EXEC" | "EXECUTE" => Ok(Statement::Execute(Box::new(self.parse_execute()?))),
            "TRUNCATE" => {
                self.cursor.next_token();
                self.cursor.expect_keyword("TABLE")?;
                let name = self.parse_object_name()?;
                // partition list
                if self.cursor.parse_keyword("WITH") {
                    self.cursor.skip_parenthesized()?;
                }
                Ok(Statement::Truncate(name))
            }
            "BULK" => {
                self.cursor.next_token();
                self.cursor.expect_keyword("INSERT")?;
                let name = self.parse_object_name()?;
                self.skip_to_boundary()?;
                Ok(Statement::BulkInsert(name))
            }
            "CREATE" | "ALTER" => self.parse_create(),
            "BEGIN" => self.parse_begin(),
            "IF" => self.parse_if(),
            "WHILE" => {
                self.cursor.next_token();
                let condition = self.parse_expr()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Statement::While { condition, body })
            }
            "DECLARE" => self.parse_declare(),
            "SET" => self.parse_set(),
            "RETURN" => self.parse_return(),
            "PRINT" => {
                self.cursor.next_token();
                let value = self.parse_expr()?;
                Ok(Self::other("PRINT", vec![value]))
            }
            "RAISERROR" => {
                self.cursor.next_token();
                self.cursor.expect(&Token::LParen)?;
                let args = self.parse_expr_list()?;
                self.cursor.expect(&Token::RParen)?;
                if self.cursor.parse_keyword("WITH") {
                    self.parse_word_list()?;
                }
                Ok(Self::other("RAISERROR", args))
            }
            "THROW" => {
                self.cursor.next_token();
                let args = if self.at_statement_boundary() {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Ok(Self::other("THROW", args))
            }
            "COMMIT" | "ROLLBACK" | "SAVE" => {
                self.cursor.next_token();
                let _ = self.cursor.parse_keyword("TRAN")
                    || self.cursor.parse_keyword("TRANSACTION")
                    || self.cursor.parse_keyword("WORK");
                if !self.at_statement_boundary() && self.cursor.peek_nth_word(0).is_some() {
                    self.cursor.next_token();
                }
                Ok(Self::other(&keyword, Vec::new()))
            }
            "BREAK" | "CONTINUE" => {
                self.cursor.next_token();
                Ok(Self::other(&keyword, Vec::new()))
            }
            "GOTO" => {
                self.cursor.next_token();
                self.parse_identifier()?;
                Ok(Self::other("GOTO", Vec::new()))
            }
            "WAITFOR" => {
                self.cursor.next_token();
                if self.cursor.parse_keyword("DELAY") || self.cursor.parse_keyword("TIME") {
                    let value = self.parse_expr()?;
                    return Ok(Self::other("WAITFOR", vec![value]));
                }
                self.skip_to_boundary()?;
                Ok(Self::other("WAITFOR", Vec::new()))
            }
            "DROP" => {
                self.cursor.next_token();
                self.cursor.next_token();
                let _ = self.cursor.parse_keywords(&["IF", "EXISTS"]);
                self.skip_to_boundary()?;
                Ok(Self::other("DROP", Vec::new()))
            }
            "OPEN" | "CLOSE" | "DEALLOCATE" | "FETCH" | "USE" | "GRANT" | "DENY" | "REVOKE" => {
                self.cursor.next_token();
                self.skip_to_boundary()?;
                Ok(Self::other(&keyword, Vec::new()))
            }
            // server administration
            "DBCC" | "CHECKPOINT" | "REVERT" | "RECONFIGURE" | "KILL" | "BACKUP" | "RESTORE"
            | "SETUSER" | "SHUTDOWN" => {
                self.cursor.next_token();
                self.skip_to_boundary()?;
                Ok(Self::other(&keyword, Vec::new()))
            }
            "ENABLE" | "DISABLE" if self.cursor.peek_nth_keyword(1, "TRIGGER") => {
                self.cursor.next_token();
                self.skip_to_boundary()?;
                Ok(Self::other(&format!("{keyword} TRIGGER"), Vec::new()))
            }
            _ if self.cursor.peek_nth(1) == &Token::Colon => {
                // label
                self.cursor.next_token();
                self.cursor.next_token();
                Ok(Self::other("LABEL", Vec::new()))
            }
            _ => Err(self.cursor.unexpected("statement")),
        }
    }

    fn parse_with_statement(&mut self) -> PResult<Statement> {
        self.cursor.expect_keyword("WITH")?;
        let ctes = self.parse_ctes()?;

        let statement = match self.cursor.peek_keyword_upper().as_deref() {
            Some("INSERT") => Statement::Insert(Box::new(self.parse_insert()?)),
            Some("UPDATE") => Statement::Update(Box::new(self.parse_update()?)),
            Some("DELETE") => Statement::Delete(Box::new(self.parse_delete()?)),
            Some("MERGE") => Statement::Merge(Box::new(self.parse_merge()?)),
            _ => return Ok(Statement::Query(Box::new(self.parse_query_after_ctes(ctes)?))),
        };

        Ok(Statement::WithCtes {
            ctes,
            statement: Box::new(statement),
        })
    }

    /// `BEGIN ... END`, `BEGIN TRY ... END TRY BEGIN CATCH ... END CATCH`, or
    /// a transaction start.
    fn parse_begin(&mut self) -> PResult<Statement> {
        if self.cursor.parse_keywords(&["BEGIN", "TRAN"])
            || self.cursor.parse_keywords(&["BEGIN", "TRANSACTION"])
            || self.cursor.parse_keywords(&["BEGIN", "DISTRIBUTED"])
        {
            self.skip_to_boundary()?;
            return Ok(Self::other("BEGIN TRANSACTION", Vec::new()));
        }

        if self.cursor.parse_keywords(&["BEGIN", "TRY"]) {
            let mut statements = self.parse_block_body()?;
            self.cursor.expect_keyword("TRY")?;
            if self.cursor.parse_keywords(&["BEGIN", "CATCH"]) {
                statements.extend(self.parse_block_body()?);
                self.cursor.expect_keyword("CATCH")?;
            }
            return Ok(Statement::Block(statements));
        }

        self.cursor.expect_keyword("BEGIN")?;
        Ok(Statement::Block(self.parse_block_body()?))
    }

    /// Statements up to and including the closing `END`.
    fn parse_block_body(&mut self) -> PResult<Vec<Statement>> {
        let statements = self.parse_statement_list(&["END"]);
        self.cursor.expect_keyword("END")?;
        Ok(statements)
    }

    /// `IF ... [ELSE IF ...]* [ELSE ...]`, with the chain read iteratively.
    fn parse_if(&mut self) -> PResult<Statement> {
        self.cursor.expect_keyword("IF")?;
        let mut branches = Vec::new();
        let mut else_branch = None;
        loop {
            let condition = self.parse_expr()?;
            let body = self.parse_statement()?;
            branches.push(IfBranch { condition, body });

            if self.cursor.peek() == &Token::SemiColon && self.cursor.peek_nth_keyword(1, "ELSE") {
                self.cursor.next_token();
            }
            if self.cursor.parse_keywords(&["ELSE", "IF"]) {
                continue;
            }
            if self.cursor.parse_keyword("ELSE") {
                else_branch = Some(Box::new(self.parse_statement()?));
            }
            break;
        }

        Ok(Statement::If {
            branches,
            else_branch,
        })
    }

    /// `EXECUTE AS {USER | LOGIN} = 'name' [WITH {NO REVERT | COOKIE INTO @c}]`
    /// or `EXECUTE AS {CALLER | SELF | OWNER}`: a context switch, not a call.
    fn parse_execute_as(&mut self) -> PResult<Statement> {
        self.cursor.next_token();
        self.cursor.expect_keyword("AS")?;
        if !(self.cursor.parse_keyword("USER") || self.cursor.parse_keyword("LOGIN")) {
            self.parse_identifier()?;
            return Ok(Self::other("EXECUTE AS", Vec::new()));
        }

        self.cursor.expect(&Token::Eq)?;
        let principal = self.parse_primary()?;
        if self.cursor.parse_keyword("WITH") && !self.cursor.parse_keywords(&["NO", "REVERT"]) {
            self.cursor.expect_keyword("COOKIE")?;
            self.cursor.expect_keyword("INTO")?;
            self.parse_identifier()?;
        }
        Ok(Self::other("EXECUTE AS", vec![principal]))
    }

    fn parse_return(&mut self) -> PResult<Statement> {
        self.cursor.expect_keyword("RETURN")?;
        if self.cursor.peek_keyword("SELECT") || self.cursor.peek_keyword("WITH") {
            let query = self.parse_query()?;
            return Ok(Statement::Return(Some(crate::ast::Expr::Subquery(
                Box::new(query),
            ))));
        }
        if self.at_statement_boundary() {
            return Ok(Statement::Return(None));
        }
        Ok(Statement::Return(Some(self.parse_expr()?)))
    }

    /// `DECLARE @a INT = 1, @t TABLE (...), c CURSOR FOR SELECT ...`
    fn parse_declare(&mut self) -> PResult<Statement> {
        self.cursor.expect_keyword("DECLARE")?;
        let mut initializers = Vec::new();

        loop {
            self.parse_identifier()?;
            if self.cursor.peek_keyword("CURSOR") {
                initializers.push(self.parse_cursor_definition()?);
            } else {
                let _ = self.cursor.parse_keyword("AS");
                if self.cursor.parse_keyword("TABLE") {
                    self.cursor.skip_parenthesized()?;
                } else {
                    self.parse_data_type()?;
                    if self.cursor.consume(&Token::Eq) {
                        initializers.push(self.parse_expr()?);
                    }
                }
            }
            if !self.cursor.consume(&Token::Comma) {
                break;
            }
        }

        Ok(Statement::Declare(initializers))
    }

    /// `CURSOR [options] FOR query [FOR UPDATE [OF cols] | FOR READ ONLY]`
    fn parse_cursor_definition(&mut self) -> PResult<crate::ast::Expr> {
        self.cursor.expect_keyword("CURSOR")?;
        while !self.cursor.peek_keyword("FOR") {
            if self.at_statement_boundary() {
                return Err(self.cursor.unexpected("FOR"));
            }
            self.cursor.next_token();
        }
        self.cursor.expect_keyword("FOR")?;
        let query = self.parse_query()?;
        if !self.cursor.parse_keywords(&["FOR", "READ", "ONLY"])
            && self.cursor.parse_keywords(&["FOR", "UPDATE"])
            && self.cursor.parse_keyword("OF")
        {
            self.parse_identifier_list()?;
        }
        Ok(crate::ast::Expr::Subquery(Box::new(query)))
    }

    /// `SET @v = expr`, `SET @v += expr`, or a session option.
    fn parse_set(&mut self) -> PResult<Statement> {
        self.cursor.expect_keyword("SET")?;

        let variable = self
            .cursor
            .peek_nth_word(0)
            .filter(|word| word.value.starts_with('@'))
            .map(|word| word.value.clone());
        let Some(variable) = variable else {
            self.skip_to_boundary()?;
            return Ok(Self::other("SET", Vec::new()));
        };
        self.cursor.next_token();
        self.expect_assignment_operator()?;

        let value = if self.cursor.peek_keyword("CURSOR") {
            self.parse_cursor_definition()?
        } else {
            self.parse_expr()?
        };
        Ok(Statement::Set { variable, value })
    }

    /// `=` or a compound assignment such as `+=`.
    fn expect_assignment_operator(&mut self) -> PResult<()> {
        if self.cursor.consume(&Token::Eq) {
            return Ok(());
        }
        let compound = {
            let text = self.cursor.peek().to_string();
            text.len() == 2 && text.ends_with('=') && !matches!(text.as_str(), "<=" | ">=" | "!=")
        };
        if compound {
            self.cursor.next_token();
            return Ok(());
        }
        // tokenizers that split `+=` into `+` `=`
        if matches!(
            self.cursor.peek(),
            Token::Plus | Token::Minus | Token::Mul | Token::Div | Token::Mod
        ) && self.cursor.peek_nth(1) == &Token::Eq
        {
            self.cursor.next_token();
            self.cursor.next_token();
            return Ok(());
        }
        Err(self.cursor.unexpected("`=`"))
    }

    /// `CREATE`/`ALTER` of a routine; other DDL is skipped.
    fn parse_create(&mut self) -> PResult<Statement> {
        let verb = self.cursor.peek_keyword_upper().unwrap_or_default();
        self.cursor.next_token();
        let _ = self.cursor.parse_keywords(&["OR", "ALTER"]);

        let kind = match self.cursor.peek_keyword_upper().as_deref() {
            Some("PROC" | "PROCEDURE") => RoutineKind::Procedure,
            Some("FUNCTION") => RoutineKind::Function,
            Some("VIEW") => RoutineKind::View,
            Some("TRIGGER") => RoutineKind::Trigger,
            _ => {
                self.skip_to_boundary()?;
                return Ok(Self::other(&verb, Vec::new()));
            }
        };
        self.cursor.next_token();
        let name = self.parse_object_name()?;
        self.skip_routine_header()?;

        // a routine body runs to the end of the batch
        let body = self.parse_statement_list(&["GO"]);

        Ok(Statement::CreateRoutine(Box::new(RoutineDefinition {
            kind,
            name,
            body,
        })))
    }

    /// Skip parameters, `RETURNS`, `WITH` options and trigger clauses up to
    /// the `AS` that opens the body. A function body may also open directly
    /// with `BEGIN`.
    fn skip_routine_header(&mut self) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            match self.cursor.peek() {
                Token::EOF => return Err(self.cursor.unexpected("AS")),
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ if depth == 0 && self.cursor.peek_keyword("AS") => {
                    self.cursor.next_token();
                    return Ok(());
                }
                _ if depth == 0 && self.cursor.peek_keyword("BEGIN") => return Ok(()),
                _ if depth == 0 && self.cursor.peek_keyword("WITH") => {
                    self.cursor.next_token();
                    self.skip_routine_options();
                    continue;
                }
                _ => {}
            }
            self.cursor.next_token();
        }
    }

    /// `WITH RECOMPILE, EXECUTE AS OWNER, SCHEMABINDING, ...`
    fn skip_routine_options(&mut self) {
        loop {
            if self.cursor.parse_keywords(&["EXECUTE", "AS"])
                || self.cursor.parse_keywords(&["EXEC", "AS"])
            {
                self.cursor.next_token();
            } else if self.cursor.peek_nth_word(0).is_some() {
                self.cursor.next_token();
            }
            if !self.cursor.consume(&Token::Comma) {
                break;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Names and small helpers
    // ------------------------------------------------------------------------

    /// A single identifier, quoted or not.
    pub(crate) fn parse_identifier(&mut self) -> PResult<String> {
        let value = self.cursor.peek_nth_word(0).map(|word| word.value.clone());
        match value {
            Some(value) => {
                self.cursor.next_token();
                Ok(value)
            }
            None => Err(self.cursor.unexpected("identifier")),
        }
    }

    /// `(a, b, c)` column list.
    pub(crate) fn parse_parenthesized_identifiers(&mut self) -> PResult<Vec<String>> {
        self.cursor.expect(&Token::LParen)?;
        let names = self.parse_identifier_list()?;
        self.cursor.expect(&Token::RParen)?;
        Ok(names)
    }

    fn parse_identifier_list(&mut self) -> PResult<Vec<String>> {
        let mut names = vec![self.parse_identifier()?];
        while self.cursor.consume(&Token::Comma) {
            names.push(self.parse_identifier()?);
        }
        Ok(names)
    }

    /// Comma-separated bare words, as in `WITH NOWAIT, LOG`.
    fn parse_word_list(&mut self) -> PResult<()> {
        self.parse_identifier()?;
        while self.cursor.consume(&Token::Comma) {
            self.parse_identifier()?;
        }
        Ok(())
    }

    /// A 1..4 part dotted name. `Cat..Obj` keeps an empty schema part.
    pub(crate) fn parse_object_name(&mut self) -> PResult<ObjectName> {
        let mut parts = vec![self.parse_identifier()?];
        loop {
            let dots = dot_count(self.cursor.peek());
            if dots == 0 {
                break;
            }
            self.cursor.next_token();
            for _ in 1..dots {
                parts.push(String::new());
            }
            while self.cursor.peek() == &Token::Period {
                self.cursor.next_token();
                parts.push(String::new());
            }
            // `alias.*` is left for the expression parser
            if self.cursor.peek() == &Token::Mul {
                self.cursor.rewind(self.cursor.position() - 1);
                break;
            }
            parts.push(self.parse_identifier()?);
        }
        Ok(ObjectName(parts))
    }

    /// A data type as written, e.g. `DECIMAL(10, 2)` or `NVARCHAR(MAX)`.
    pub(crate) fn parse_data_type(&mut self) -> PResult<String> {
        let mut text = self.parse_object_name()?.to_string();
        if self.cursor.peek() == &Token::LParen {
            self.cursor.next_token();
            text.push('(');
            let mut first = true;
            loop {
                match self.cursor.next_token() {
                    Token::RParen => break,
                    Token::EOF => return Err(self.cursor.error("unbalanced parenthesis")),
                    Token::Comma => {
                        text.push_str(", ");
                        first = true;
                        continue;
                    }
                    token => {
                        if !first {
                            text.push(' ');
                        }
                        text.push_str(&token.to_string());
                    }
                }
                first = false;
            }
            text.push(')');
        }
        // `VARYING`, `READONLY`, `OUTPUT` and `NOT NULL` style suffixes
        while self.cursor.parse_keyword("VARYING") || self.cursor.parse_keyword("READONLY") {}
        Ok(text)
    }
}

/// Number of dots in a period token (`.` or a fused `..`), zero otherwise.
fn dot_count(token: &Token) -> usize {
    if token == &Token::Period {
        return 1;
    }
    if matches!(token, Token::Word(_) | Token::EOF) {
        return 0;
    }
    let text = token.to_string();
    if !text.is_empty() && text.chars().all(|c| c == '.') {
        text.len()
    } else {
        0
    }
}
