//! Abstract Syntax Tree (AST) for SQL statements.
//!
//! This module defines the data structures that represent parsed SQL
//! statements. The AST is produced by the parser and consumed by the
//! renderer and the PipeQL translator.

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement, including WITH and set operations.
    Select(Box<SelectStatement>),
    /// INSERT statement (parsed; rejected by the translator).
    Insert(Box<InsertStatement>),
    /// UPDATE statement (parsed; rejected by the translator).
    Update(Box<UpdateStatement>),
    /// DELETE statement (parsed; rejected by the translator).
    Delete(Box<DeleteStatement>),
    /// CREATE [OR REPLACE] [MATERIALIZED] VIEW statement.
    CreateView(Box<CreateViewStatement>),
    /// DROP [MATERIALIZED] VIEW statement.
    DropView(DropViewStatement),
    /// DESCRIBE TABLE/VIEW statement.
    Describe(DescribeStatement),
    /// SHOW TABLES.
    ShowTables,
    /// SHOW VIEWS.
    ShowViews,
}

/// SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// WITH clause (common table expressions).
    pub with: Option<WithClause>,
    /// Whether to select distinct rows only.
    pub distinct: bool,
    /// Selected columns/expressions.
    pub columns: Vec<SelectItem>,
    /// FROM clause.
    pub from: Option<TableExpr>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
    /// GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// HAVING clause.
    pub having: Option<Expr>,
    /// ORDER BY items.
    pub order_by: Vec<OrderItem>,
    /// LIMIT/OFFSET clause.
    pub limit: Option<LimitClause>,
    /// Trailing set operations (`UNION [ALL] ...` etc.).
    pub set_ops: Vec<SetOperation>,
}

/// An item in the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// The selected expression.
    pub expr: Expr,
    /// Optional alias.
    pub alias: Option<String>,
}

/// WITH clause holding common table expressions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithClause {
    /// RECURSIVE modifier (parsed; rejected by the translator).
    pub recursive: bool,
    /// The named subqueries.
    pub ctes: Vec<CommonTableExpression>,
}

/// A single named subquery in a WITH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpression {
    /// CTE name.
    pub name: Identifier,
    /// Optional column list.
    pub columns: Vec<Identifier>,
    /// The CTE body; absent when parsing failed partway.
    pub select: Option<Box<SelectStatement>>,
}

/// ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// Expression to order by.
    pub expr: Expr,
    /// Sort direction.
    pub direction: OrderDirection,
}

/// Sort direction; ASC when unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// LIMIT/OFFSET values. Either side may be absent, not both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LimitClause {
    /// LIMIT count.
    pub count: Option<Expr>,
    /// OFFSET count.
    pub offset: Option<Expr>,
}

/// Set operators combining SELECT statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    /// Returns the SQL spelling of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        }
    }
}

/// One `UNION|INTERSECT|EXCEPT [ALL] select` suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    /// The set operator.
    pub operator: SetOperator,
    /// ALL modifier.
    pub all: bool,
    /// Right-hand select; absent when parsing failed partway.
    pub select: Option<Box<SelectStatement>>,
}

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table.
    pub table: Option<TableName>,
    /// Optional column list.
    pub columns: Vec<Identifier>,
    /// VALUES rows.
    pub rows: Vec<Vec<Expr>>,
    /// INSERT ... SELECT source.
    pub select: Option<Box<SelectStatement>>,
}

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table.
    pub table: Option<TableExpr>,
    /// SET assignments.
    pub assignments: Vec<Assignment>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
}

/// A `column = value` pair in UPDATE SET.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target column.
    pub column: Identifier,
    /// Value expression.
    pub value: Option<Expr>,
}

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table.
    pub table: Option<TableExpr>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
}

/// CREATE VIEW statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateViewStatement {
    /// OR REPLACE modifier.
    pub or_replace: bool,
    /// IF NOT EXISTS modifier.
    pub if_not_exists: bool,
    /// MATERIALIZED modifier (parsed; rejected by the translator).
    pub materialized: bool,
    /// View name.
    pub name: Identifier,
    /// Optional column list.
    pub columns: Vec<Identifier>,
    /// The view body; absent when parsing failed partway.
    pub select: Option<Box<SelectStatement>>,
}

/// DROP VIEW statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DropViewStatement {
    /// MATERIALIZED modifier (parsed; rejected by the translator).
    pub materialized: bool,
    /// IF EXISTS modifier.
    pub if_exists: bool,
    /// View name.
    pub name: Identifier,
}

/// Entities a DESCRIBE statement can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeTarget {
    Table,
    View,
}

/// DESCRIBE TABLE/VIEW statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeStatement {
    /// What is being described.
    pub target: DescribeTarget,
    /// Target name.
    pub name: Identifier,
}

/// A possibly qualified identifier; parts are in left-to-right source order
/// and never empty for a well-formed node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identifier {
    pub parts: Vec<String>,
}

impl Identifier {
    /// Creates a single-part identifier.
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            parts: vec![name.into()],
        }
    }

    /// Returns the last (unqualified) part, if any.
    pub fn last(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// Returns the dotted display form.
    pub fn display(&self) -> String {
        self.parts.join(".")
    }
}

/// Selectable table expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum TableExpr {
    /// A named table (or view/CTE) reference.
    Table(TableName),
    /// A parenthesised subquery.
    Subquery(SubqueryTable),
    /// A JOIN of two table expressions.
    Join(Box<JoinExpr>),
}

/// A table reference with optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TableName {
    /// Table name, possibly dotted.
    pub name: Identifier,
    /// Optional alias.
    pub alias: Option<String>,
}

/// A subquery used as a table expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryTable {
    /// The inner select.
    pub select: Box<SelectStatement>,
    /// Optional alias.
    pub alias: Option<String>,
}

/// Supported ANSI join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    /// Returns the SQL spelling of this join type.
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// A JOIN between two table expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinExpr {
    /// Left operand.
    pub left: TableExpr,
    /// Right operand.
    pub right: TableExpr,
    /// Join type.
    pub join_type: JoinType,
    /// ON condition; absent for CROSS JOIN.
    pub on: Option<Expr>,
}

/// SQL expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Possibly qualified column reference.
    Identifier(Identifier),
    /// Numeric literal, kept as its source spelling.
    Numeric(String),
    /// String literal.
    String(String),
    /// Boolean literal.
    Boolean(bool),
    /// NULL literal.
    Null,
    /// `?` placeholder.
    Placeholder(String),
    /// `*` or `table.*`.
    Star(Option<Identifier>),
    /// Binary operation.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Prefix operation.
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Function call, optionally windowed.
    FuncCall(FuncCall),
    /// CASE expression (in the data model; the dialect does not parse it).
    Case {
        operand: Option<Box<Expr>>,
        when: Vec<WhenClause>,
        else_result: Option<Box<Expr>>,
    },
    /// `expr [NOT] BETWEEN lower AND upper`.
    Between {
        expr: Box<Expr>,
        lower: Box<Expr>,
        upper: Box<Expr>,
        negated: bool,
    },
    /// `expr [NOT] IN (list | subquery)`.
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        subquery: Option<Box<SelectStatement>>,
        negated: bool,
    },
    /// `expr [NOT] LIKE pattern`.
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    /// `expr IS [NOT] NULL`.
    IsNull { expr: Box<Expr>, negated: bool },
    /// `[NOT] EXISTS (select)`.
    Exists {
        subquery: Box<SelectStatement>,
        negated: bool,
    },
    /// Scalar subquery.
    Subquery(Box<SelectStatement>),
}

/// Function invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    /// Function name, possibly dotted.
    pub name: Identifier,
    /// DISTINCT modifier.
    pub distinct: bool,
    /// Arguments.
    pub args: Vec<Expr>,
    /// OVER (...) window specification.
    pub over: Option<WindowSpec>,
}

/// OVER (...) clause on a function call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    /// PARTITION BY expressions.
    pub partition_by: Vec<Expr>,
    /// ORDER BY items.
    pub order_by: Vec<OrderItem>,
}

/// A WHEN branch in a CASE expression.
#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    /// The condition (or comparison value in simple CASE).
    pub condition: Expr,
    /// The result if the condition holds.
    pub result: Expr,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Returns the canonical spelling of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// NOT
    Not,
    /// `-` (negation)
    Neg,
}

impl UnaryOp {
    /// Returns the canonical spelling of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
            UnaryOp::Neg => "-",
        }
    }
}

/// Calls `f` on `expr` and every reachable sub-expression, in pre-order.
///
/// Subqueries are visited as opaque nodes; their inner statements are not
/// descended into, matching what binding analysis needs.
pub fn walk_expr(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    f(expr);
    match expr {
        Expr::Binary { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::Unary { expr, .. } => walk_expr(expr, f),
        Expr::FuncCall(call) => {
            for arg in &call.args {
                walk_expr(arg, f);
            }
            if let Some(over) = &call.over {
                for part in &over.partition_by {
                    walk_expr(part, f);
                }
                for item in &over.order_by {
                    walk_expr(&item.expr, f);
                }
            }
        }
        Expr::Case {
            operand,
            when,
            else_result,
        } => {
            if let Some(operand) = operand {
                walk_expr(operand, f);
            }
            for clause in when {
                walk_expr(&clause.condition, f);
                walk_expr(&clause.result, f);
            }
            if let Some(else_result) = else_result {
                walk_expr(else_result, f);
            }
        }
        Expr::Between {
            expr, lower, upper, ..
        } => {
            walk_expr(expr, f);
            walk_expr(lower, f);
            walk_expr(upper, f);
        }
        Expr::In { expr, list, .. } => {
            walk_expr(expr, f);
            for item in list {
                walk_expr(item, f);
            }
        }
        Expr::Like { expr, pattern, .. } => {
            walk_expr(expr, f);
            walk_expr(pattern, f);
        }
        Expr::IsNull { expr, .. } => walk_expr(expr, f),
        Expr::Star(_)
        | Expr::Identifier(_)
        | Expr::Numeric(_)
        | Expr::String(_)
        | Expr::Boolean(_)
        | Expr::Null
        | Expr::Placeholder(_)
        | Expr::Exists { .. }
        | Expr::Subquery(_) => {}
    }
}

/// Splits an expression into its AND-conjuncts, recursively.
pub fn flatten_and(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => {
            let mut conjuncts = flatten_and(left);
            conjuncts.extend(flatten_and(right));
            conjuncts
        }
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_helpers() {
        let id = Identifier {
            parts: vec!["l".to_string(), "level".to_string()],
        };
        assert_eq!(id.last(), Some("level"));
        assert_eq!(id.display(), "l.level");
        assert_eq!(Identifier::simple("x").display(), "x");
    }

    #[test]
    fn test_walk_expr_visits_all_identifiers() {
        let expr = Expr::Binary {
            left: Box::new(Expr::Identifier(Identifier::simple("a"))),
            op: BinaryOp::And,
            right: Box::new(Expr::Like {
                expr: Box::new(Expr::Identifier(Identifier::simple("b"))),
                pattern: Box::new(Expr::String("x%".to_string())),
                negated: false,
            }),
        };
        let mut names = Vec::new();
        walk_expr(&expr, &mut |e| {
            if let Expr::Identifier(id) = e {
                names.push(id.display());
            }
        });
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_flatten_and() {
        let leaf = |name: &str| Expr::Identifier(Identifier::simple(name));
        let expr = Expr::Binary {
            left: Box::new(Expr::Binary {
                left: Box::new(leaf("a")),
                op: BinaryOp::And,
                right: Box::new(leaf("b")),
            }),
            op: BinaryOp::And,
            right: Box::new(leaf("c")),
        };
        assert_eq!(flatten_and(&expr).len(), 3);

        let or = Expr::Binary {
            left: Box::new(leaf("a")),
            op: BinaryOp::Or,
            right: Box::new(leaf("b")),
        };
        assert_eq!(flatten_and(&or).len(), 1);
    }
}
