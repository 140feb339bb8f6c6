//! Syntax tree produced by the T-SQL parser.
//!
//! The tree is shaped for dependency analysis rather than execution: it keeps
//! every place an object can be named (table sources, DML targets, routine
//! invocations, function calls) and the expressions that can contain nested
//! queries, and drops details that never name an object (data types beyond
//! their text, query hints, window frames).
//!
//! ## Node families
//!
//! | Family | Type | Carries object names in |
//! |--------|------|-------------------------|
//! | Statements | [`Statement`] | DML targets, `EXEC` names, routine headers |
//! | Queries | [`Query`], [`Select`] | `FROM`, `INTO`, nested subqueries |
//! | Table sources | [`TableFactor`] | table and table-valued function names |
//! | Expressions | [`Expr`] | scalar function names, subqueries |

use serde::Serialize;
use std::fmt;

// ============================================================================
// Names
// ============================================================================

/// A possibly multi-part object name such as `[Cat].[dbo].[Orders]`.
///
/// Parts are stored unquoted and in source order. Empty parts are kept so
/// that `Cat..Orders` still has three parts with an empty schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectName(pub Vec<String>);

impl ObjectName {
    /// Build a name from its parts.
    #[must_use]
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// All parts, in source order.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// The last part (object name), if present and non-empty.
    #[must_use]
    pub fn base_name(&self) -> Option<&str> {
        self.part_from_end(0)
    }

    /// The schema part, if present and non-empty.
    #[must_use]
    pub fn schema_name(&self) -> Option<&str> {
        self.part_from_end(1)
    }

    /// The catalog (database) part, if present and non-empty.
    #[must_use]
    pub fn catalog_name(&self) -> Option<&str> {
        self.part_from_end(2)
    }

    /// The linked-server part of a four-part name, if present.
    #[must_use]
    pub fn server_name(&self) -> Option<&str> {
        self.part_from_end(3)
    }

    /// Whether this names a table variable (`@t`).
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.0.len() == 1 && self.0[0].starts_with('@')
    }

    /// Whether this names a local or global temporary table (`#t`, `##t`).
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.base_name().is_some_and(|name| name.starts_with('#'))
    }

    /// Whether the name is a single unqualified part.
    #[must_use]
    pub fn is_unqualified(&self) -> bool {
        self.0.len() == 1
    }

    fn part_from_end(&self, offset: usize) -> Option<&str> {
        let index = self.0.len().checked_sub(offset + 1)?;
        let part = self.0[index].as_str();
        (!part.is_empty()).then_some(part)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{}", rendered.join("."))
    }
}

// ============================================================================
// Statements
// ============================================================================

/// One arm of an `IF ... ELSE IF ...` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    /// Branch condition.
    pub condition: Expr,
    /// Statement run when the condition holds.
    pub body: Statement,
}

/// A parsed batch or module definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
}

/// A single T-SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `SELECT ...`, optionally preceded by `WITH` CTEs.
    Query(Box<Query>),
    /// `INSERT [INTO] target ...`
    Insert(Box<Insert>),
    /// `UPDATE target SET ...`
    Update(Box<Update>),
    /// `DELETE [FROM] target ...`
    Delete(Box<Delete>),
    /// `MERGE [INTO] target USING source ...`
    Merge(Box<Merge>),
    /// `EXEC ...` of a named routine or of a dynamic string.
    Execute(Box<Execute>),
    /// `TRUNCATE TABLE name`
    Truncate(ObjectName),
    /// `BULK INSERT name FROM 'file' ...`
    BulkInsert(ObjectName),
    /// A DML statement preceded by `WITH` common table expressions.
    WithCtes {
        /// The CTE definitions.
        ctes: Vec<Cte>,
        /// The statement the CTEs are scoped to.
        statement: Box<Statement>,
    },
    /// `CREATE`/`ALTER` of a procedure, function, view or trigger.
    CreateRoutine(Box<RoutineDefinition>),
    /// `BEGIN ... END`, `BEGIN TRY ... END TRY BEGIN CATCH ... END CATCH`.
    Block(Vec<Statement>),
    /// `IF condition statement [ELSE IF ...] [ELSE statement]`
    ///
    /// An `ELSE IF` chain is one `If` with a branch per arm.
    If {
        /// The `IF` arm followed by each `ELSE IF` arm.
        branches: Vec<IfBranch>,
        /// Final `ELSE` statement.
        else_branch: Option<Box<Statement>>,
    },
    /// `WHILE condition statement`
    While {
        /// Loop condition.
        condition: Expr,
        /// Loop body.
        body: Box<Statement>,
    },
    /// `DECLARE` with the initializer expressions it contains.
    Declare(Vec<Expr>),
    /// `SET @var = expr`
    Set {
        /// Assigned variable.
        variable: String,
        /// Assigned value.
        value: Expr,
    },
    /// `RETURN [expr]`
    Return(Option<Expr>),
    /// Any other statement (`PRINT`, `RAISERROR`, `COMMIT`, DDL, ...).
    Other {
        /// Leading keyword, upper-cased.
        keyword: String,
        /// Expressions parsed from the statement, when it carries any.
        arguments: Vec<Expr>,
    },
}

/// Kind of routine introduced by `CREATE`/`ALTER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    /// Stored procedure
    Procedure,
    /// Scalar or table-valued function
    Function,
    /// View
    View,
    /// DML or DDL trigger
    Trigger,
}

/// The header and body of a routine definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineDefinition {
    /// What kind of routine this is.
    pub kind: RoutineKind,
    /// The routine's declared name.
    pub name: ObjectName,
    /// Statements after `AS` (or the function's `BEGIN ... END`).
    pub body: Vec<Statement>,
}

/// A common table expression: `name [(columns)] AS (query)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    /// CTE name.
    pub name: String,
    /// Defining query.
    pub query: Query,
}

// ============================================================================
// Queries
// ============================================================================

/// A full query expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Leading `WITH` definitions.
    pub ctes: Vec<Cte>,
    /// Query body, possibly a set operation.
    pub body: QueryBody,
    /// `ORDER BY` expressions.
    pub order_by: Vec<Expr>,
}

/// Body of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    /// A single `SELECT` block.
    Select(Box<Select>),
    /// A parenthesised query.
    Nested(Box<Query>),
    /// `left UNION|EXCEPT|INTERSECT right`
    SetOperation {
        /// Left operand.
        left: Box<QueryBody>,
        /// Operator.
        op: SetOperator,
        /// Right operand.
        right: Box<QueryBody>,
    },
    /// A `VALUES (...), (...)` row constructor.
    Values(Vec<Vec<Expr>>),
}

/// Set operators between query bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// `UNION [ALL]`
    Union,
    /// `EXCEPT`
    Except,
    /// `INTERSECT`
    Intersect,
}

/// A `SELECT` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    /// `TOP (n)` expression.
    pub top: Option<Expr>,
    /// Select list items.
    pub projection: Vec<Expr>,
    /// `SELECT ... INTO name`
    pub into: Option<ObjectName>,
    /// `FROM` sources.
    pub from: Vec<TableWithJoins>,
    /// `WHERE` predicate.
    pub selection: Option<Expr>,
    /// `GROUP BY` expressions.
    pub group_by: Vec<Expr>,
    /// `HAVING` predicate.
    pub having: Option<Expr>,
}

/// A table source and the joins hanging off it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableWithJoins {
    /// The leftmost source.
    pub relation: TableFactor,
    /// Joined sources, in order.
    pub joins: Vec<Join>,
}

/// One joined source.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join operator.
    pub kind: JoinKind,
    /// Right-hand source.
    pub relation: TableFactor,
    /// `ON` predicate, absent for `CROSS JOIN` and `APPLY`.
    pub constraint: Option<Expr>,
}

/// Join operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `[INNER] JOIN`
    Inner,
    /// `LEFT [OUTER] JOIN`
    Left,
    /// `RIGHT [OUTER] JOIN`
    Right,
    /// `FULL [OUTER] JOIN`
    Full,
    /// `CROSS JOIN`
    Cross,
    /// `CROSS APPLY`
    CrossApply,
    /// `OUTER APPLY`
    OuterApply,
}

/// A single table source.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    /// A named table, view, synonym, CTE or table variable.
    Table {
        /// Referenced name.
        name: ObjectName,
        /// Optional alias.
        alias: Option<String>,
    },
    /// A table-valued function call.
    Function {
        /// Function name.
        name: ObjectName,
        /// Call arguments.
        args: Vec<Expr>,
        /// Optional alias.
        alias: Option<String>,
    },
    /// A derived table: `(query) AS alias`.
    Derived {
        /// Inner query.
        subquery: Box<Query>,
        /// Optional alias.
        alias: Option<String>,
    },
    /// A parenthesised join tree.
    NestedJoin {
        /// The inner join tree.
        table: Box<TableWithJoins>,
        /// Optional alias.
        alias: Option<String>,
    },
}

impl TableFactor {
    /// The alias given to this source, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Table { alias, .. }
            | Self::Function { alias, .. }
            | Self::Derived { alias, .. }
            | Self::NestedJoin { alias, .. } => alias.as_deref(),
        }
    }
}

// ============================================================================
// DML
// ============================================================================

/// `INSERT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    /// Target table.
    pub target: ObjectName,
    /// Explicit column list.
    pub columns: Vec<String>,
    /// Row source.
    pub source: InsertSource,
    /// `OUTPUT` clause.
    pub output: Option<OutputClause>,
}

/// Where inserted rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// `VALUES (...), (...)`
    Values(Vec<Vec<Expr>>),
    /// `SELECT ...`
    Query(Box<Query>),
    /// `EXEC ...` result set.
    Execute(Box<Execute>),
    /// `DEFAULT VALUES`
    DefaultValues,
}

/// `UPDATE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Target table or alias.
    pub target: ObjectName,
    /// `SET` assignments.
    pub assignments: Vec<Assignment>,
    /// `OUTPUT` clause.
    pub output: Option<OutputClause>,
    /// `FROM` sources.
    pub from: Vec<TableWithJoins>,
    /// `WHERE` predicate.
    pub selection: Option<Expr>,
}

/// `DELETE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// Target table or alias.
    pub target: ObjectName,
    /// `OUTPUT` clause.
    pub output: Option<OutputClause>,
    /// Second `FROM` sources.
    pub from: Vec<TableWithJoins>,
    /// `WHERE` predicate.
    pub selection: Option<Expr>,
}

/// `MERGE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    /// Target table.
    pub target: ObjectName,
    /// Target alias.
    pub alias: Option<String>,
    /// `USING` source.
    pub source: TableFactor,
    /// `ON` predicate.
    pub on: Expr,
    /// `WHEN ... THEN ...` clauses.
    pub clauses: Vec<MergeClause>,
    /// `OUTPUT` clause.
    pub output: Option<OutputClause>,
}

/// One `WHEN [NOT] MATCHED ... THEN action` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    /// Additional `AND` predicate.
    pub predicate: Option<Expr>,
    /// Action taken.
    pub action: MergeAction,
}

/// Action of a merge clause.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeAction {
    /// `UPDATE SET ...`
    Update(Vec<Assignment>),
    /// `DELETE`
    Delete,
    /// `INSERT [(columns)] VALUES (...)` or `INSERT DEFAULT VALUES`.
    Insert {
        /// Inserted columns.
        columns: Vec<String>,
        /// Inserted values.
        values: Vec<Expr>,
    },
}

/// `target = value` in a `SET` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Assigned column or variable.
    pub target: Expr,
    /// Assigned value.
    pub value: Expr,
}

/// `OUTPUT expr, ... [INTO target [(columns)]]`
#[derive(Debug, Clone, PartialEq)]
pub struct OutputClause {
    /// Output expressions.
    pub expressions: Vec<Expr>,
    /// `INTO` target, when rows are captured.
    pub into: Option<ObjectName>,
}

// ============================================================================
// EXEC
// ============================================================================

/// `EXEC` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Execute {
    /// `EXEC [@status =] name [args]`
    Procedure {
        /// Invoked routine (or a variable holding its name).
        name: ObjectName,
        /// Variable receiving the return status.
        return_status: Option<String>,
        /// Arguments.
        args: Vec<ExecArgument>,
    },
    /// `EXEC (string expression) [AT linked_server]`
    Dynamic {
        /// The SQL string expression, usually a literal or a concatenation.
        sql: Expr,
        /// Server named by `AT`; the text runs there, not locally.
        linked_server: Option<String>,
    },
}

/// An argument to a procedure call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecArgument {
    /// `@name =` prefix for named arguments.
    pub name: Option<String>,
    /// Argument value.
    pub value: Expr,
    /// Whether the argument is marked `OUTPUT`.
    pub output: bool,
}

// ============================================================================
// Expressions
// ============================================================================

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `'text'` or `N'text'`, with doubled quotes already decoded.
    String {
        /// Decoded value.
        value: String,
        /// Whether the literal carried the `N` prefix.
        national: bool,
    },
    /// Numeric literal, kept as written.
    Number(String),
    /// `NULL`
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `+` (also string concatenation)
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `=`
    Eq,
    /// `<>` / `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `LIKE`
    Like,
    /// `IN`
    In,
    /// `IS`
    Is,
    /// `BETWEEN` (right side is a two-element list)
    Between,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `NOT`
    Not,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `~`
    BitNot,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column or other identifier, possibly qualified.
    Identifier(ObjectName),
    /// `@variable` or `@@SYSTEM_VARIABLE`.
    Variable(String),
    /// A literal.
    Literal(Literal),
    /// `*` or `alias.*`
    Wildcard,
    /// A keyword used as a value (`DEFAULT`, `CURRENT_TIMESTAMP`, ...).
    Keyword(String),
    /// Function call, including built-ins.
    Function {
        /// Function name.
        name: ObjectName,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Scalar or row subquery.
    Subquery(Box<Query>),
    /// `EXISTS (subquery)`
    Exists(Box<Query>),
    /// Binary operation.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOperator,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOperator,
        /// Operand.
        expr: Box<Expr>,
    },
    /// Parenthesised expression list: `(a)`, `(a, b, c)`.
    Nested(Vec<Expr>),
    /// `CASE [operand] WHEN ... THEN ... [ELSE ...] END`
    Case {
        /// Simple-case operand.
        operand: Option<Box<Expr>>,
        /// `(WHEN, THEN)` pairs.
        branches: Vec<(Expr, Expr)>,
        /// `ELSE` result.
        else_result: Option<Box<Expr>>,
    },
    /// `CAST(expr AS type)` / `TRY_CAST(...)`
    Cast {
        /// Converted expression.
        expr: Box<Expr>,
        /// Target type, as written.
        data_type: String,
    },
}
