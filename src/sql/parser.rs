//! SQL parser using recursive descent.
//!
//! The [`Parser`] converts a token stream into an Abstract Syntax Tree.
//! Statements are parsed by recursive descent here; expressions use
//! precedence climbing (see `expr.rs`).
//!
//! Errors do not abort parsing: they accumulate in the parser and the
//! current production returns early, so callers can inspect both the
//! partial AST and the full diagnostic list.

use super::ast::*;
use super::error::SyntaxError;
use super::expr::Precedence;
use super::lexer::Lexer;
use super::token::{Keyword, Position, Token, TokenKind};

/// Maximum recursion depth for nested statements and expressions.
pub const MAX_PARSER_DEPTH: usize = 100;
/// Maximum number of expressions in a comma-separated list.
pub const MAX_EXPRESSION_COUNT: usize = 1000;

/// SQL parser with two-token lookahead (current and peek).
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    pub(crate) depth: usize,
}

impl Parser {
    /// Creates a parser over the given SQL input.
    pub fn new(input: &str) -> Self {
        let tokens = Lexer::new(input).tokenize();
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Exposes parsing errors encountered so far.
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Takes all errors, leaving an empty list.
    pub fn take_errors(&mut self) -> Vec<SyntaxError> {
        std::mem::take(&mut self.errors)
    }

    /// Parses a top-level SQL statement.
    ///
    /// Returns the (possibly partial) statement; check [`Parser::errors`]
    /// for diagnostics. Trailing semicolons are consumed; any other
    /// trailing token is reported.
    pub fn parse_statement(&mut self) -> Option<Statement> {
        let stmt = match self.cur().kind.clone() {
            TokenKind::Keyword(Keyword::With) => {
                let with = self.parse_with_clause();
                if self.cur_is_kw(Keyword::Select) {
                    self.parse_select_statement().map(|mut select| {
                        select.with = Some(with);
                        Statement::Select(Box::new(select))
                    })
                } else {
                    None
                }
            }
            TokenKind::Keyword(Keyword::Select) => self
                .parse_select_statement()
                .map(|select| Statement::Select(Box::new(select))),
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert_statement(),
            TokenKind::Keyword(Keyword::Update) => self.parse_update_statement(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete_statement(),
            TokenKind::Keyword(Keyword::Create) => self.parse_create_view_statement(),
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop_view_statement(),
            TokenKind::Keyword(Keyword::Describe) => self.parse_describe_statement(),
            TokenKind::Keyword(Keyword::Show) => self.parse_show_statement(),
            other => {
                self.add_error(
                    self.cur().pos,
                    format!(
                        "unsupported statement starting with {}",
                        other.display_name()
                    ),
                );
                None
            }
        };

        let consumed_semicolon = self.consume_semicolons();
        if !self.peek().is_eof() {
            let tok = if consumed_semicolon {
                self.cur().clone()
            } else {
                self.peek().clone()
            };
            self.add_error(
                tok.pos,
                format!("unexpected token {} after statement", tok.kind.display_name()),
            );
        }

        stmt
    }

    fn consume_semicolons(&mut self) -> bool {
        let mut consumed = false;
        while self.cur_is(TokenKind::Semicolon) || self.peek_is(TokenKind::Semicolon) {
            consumed = true;
            self.next_token();
        }
        consumed
    }

    fn parse_with_clause(&mut self) -> WithClause {
        let mut clause = WithClause::default();
        if self.peek_is_kw(Keyword::Recursive) {
            self.next_token();
            clause.recursive = true;
        }

        loop {
            let Some(name) = self.expect_peek_ident() else {
                return clause;
            };
            let mut cte = CommonTableExpression {
                name: Identifier::simple(name),
                columns: Vec::new(),
                select: None,
            };

            if self.peek_is(TokenKind::LParen) {
                self.next_token();
                if let Some(col) = self.expect_peek_ident() {
                    cte.columns.push(Identifier::simple(col));
                    while self.peek_is(TokenKind::Comma) {
                        self.next_token();
                        let Some(col) = self.expect_peek_ident() else {
                            return clause;
                        };
                        cte.columns.push(Identifier::simple(col));
                    }
                }
                if !self.expect_peek(TokenKind::RParen) {
                    return clause;
                }
            }

            if !self.expect_peek_kw(Keyword::As) {
                return clause;
            }
            if !self.expect_peek(TokenKind::LParen) {
                return clause;
            }

            self.next_token();
            match self.cur().kind {
                TokenKind::Keyword(Keyword::With) => {
                    let inner = self.parse_with_clause();
                    if !self.cur_is_kw(Keyword::Select) {
                        self.add_error(
                            self.cur().pos,
                            format!(
                                "WITH subquery must start with SELECT, got {}",
                                self.cur().kind.display_name()
                            ),
                        );
                        return clause;
                    }
                    cte.select = self.parse_select_statement().map(|mut select| {
                        select.with = Some(inner);
                        Box::new(select)
                    });
                }
                TokenKind::Keyword(Keyword::Select) => {
                    cte.select = self.parse_select_statement().map(Box::new);
                }
                _ => {
                    self.add_error(
                        self.cur().pos,
                        format!(
                            "WITH subquery must start with SELECT, got {}",
                            self.cur().kind.display_name()
                        ),
                    );
                    return clause;
                }
            }

            if !self.expect_peek(TokenKind::RParen) {
                return clause;
            }

            clause.ctes.push(cte);

            if self.peek_is(TokenKind::Comma) {
                self.next_token();
                continue;
            }
            break;
        }

        self.expect_peek_kw(Keyword::Select);
        clause
    }

    /// Parses a SELECT statement including trailing set operations.
    pub(crate) fn parse_select_statement(&mut self) -> Option<SelectStatement> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            self.add_error(self.cur().pos, "maximum nesting depth exceeded");
            self.depth -= 1;
            return None;
        }
        let stmt = match self.parse_select_core() {
            Some(core) => Some(self.parse_set_operations(core)),
            None => None,
        };
        self.depth -= 1;
        stmt
    }

    fn parse_select_core(&mut self) -> Option<SelectStatement> {
        let mut stmt = SelectStatement::default();

        if self.peek_is_kw(Keyword::Distinct) {
            self.next_token();
            stmt.distinct = true;
        }

        self.next_token();
        stmt.columns = self.parse_select_list();

        if self.peek_is_kw(Keyword::From) {
            self.next_token();
            self.next_token();
            stmt.from = self.parse_table_expression();
        }

        if self.peek_is_kw(Keyword::Where) {
            self.next_token();
            self.next_token();
            stmt.where_clause = self.parse_expression(Precedence::Lowest);
        }

        if self.peek_is_kw(Keyword::Group) {
            self.next_token();
            if self.expect_peek_kw(Keyword::By) {
                self.next_token();
                stmt.group_by = self.parse_expression_list();
            }
        }

        if self.peek_is_kw(Keyword::Having) {
            self.next_token();
            self.next_token();
            stmt.having = self.parse_expression(Precedence::Lowest);
        }

        if self.peek_is_kw(Keyword::Order) {
            self.next_token();
            if self.expect_peek_kw(Keyword::By) {
                self.next_token();
                stmt.order_by = self.parse_order_list();
            }
        }

        if self.peek_is_kw(Keyword::Limit) {
            self.next_token();
            self.next_token();
            let mut limit = LimitClause {
                count: self.parse_expression(Precedence::Lowest),
                offset: None,
            };
            if self.peek_is_kw(Keyword::Offset) {
                self.next_token();
                self.next_token();
                limit.offset = self.parse_expression(Precedence::Lowest);
            }
            stmt.limit = Some(limit);
        } else if self.peek_is_kw(Keyword::Offset) {
            self.next_token();
            self.next_token();
            stmt.limit = Some(LimitClause {
                count: None,
                offset: self.parse_expression(Precedence::Lowest),
            });
        }

        Some(stmt)
    }

    fn parse_set_operations(&mut self, mut stmt: SelectStatement) -> SelectStatement {
        loop {
            let Some(operator) = self.peek_set_operator() else {
                return stmt;
            };

            self.next_token();
            let mut all = false;
            if self.peek_is_kw(Keyword::All) {
                self.next_token();
                all = true;
            }

            let right = if self.peek_is(TokenKind::LParen) {
                self.next_token();
                self.next_token();
                let right = match self.cur().kind {
                    TokenKind::Keyword(Keyword::With) => {
                        let with = self.parse_with_clause();
                        if !self.cur_is_kw(Keyword::Select) {
                            return stmt;
                        }
                        self.parse_select_statement().map(|mut select| {
                            select.with = Some(with);
                            select
                        })
                    }
                    TokenKind::Keyword(Keyword::Select) => self.parse_select_statement(),
                    _ => {
                        self.add_error(
                            self.cur().pos,
                            format!(
                                "set operator requires SELECT, got {}",
                                self.cur().kind.display_name()
                            ),
                        );
                        return stmt;
                    }
                };
                if !self.expect_peek(TokenKind::RParen) {
                    return stmt;
                }
                right
            } else {
                if !self.expect_peek_kw(Keyword::Select) {
                    return stmt;
                }
                self.parse_select_statement()
            };

            stmt.set_ops.push(SetOperation {
                operator,
                all,
                select: right.map(Box::new),
            });
        }
    }

    fn peek_set_operator(&self) -> Option<SetOperator> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Union) => Some(SetOperator::Union),
            TokenKind::Keyword(Keyword::Intersect) => Some(SetOperator::Intersect),
            TokenKind::Keyword(Keyword::Except) => Some(SetOperator::Except),
            _ => None,
        }
    }

    fn parse_select_list(&mut self) -> Vec<SelectItem> {
        let mut items = Vec::new();

        loop {
            let expr = if self.cur_is(TokenKind::Star) {
                Some(Expr::Star(None))
            } else {
                self.parse_expression(Precedence::Lowest)
            };
            let Some(expr) = expr else {
                return items;
            };

            let alias = self.parse_alias_if_present();
            items.push(SelectItem { expr, alias });

            if self.peek_is(TokenKind::Comma) {
                self.next_token();
                self.next_token();
                continue;
            }
            break;
        }

        items
    }

    pub(crate) fn parse_order_list(&mut self) -> Vec<OrderItem> {
        let mut items = Vec::new();

        loop {
            let Some(expr) = self.parse_expression(Precedence::Lowest) else {
                return items;
            };
            let mut direction = OrderDirection::default();
            if self.peek_is_kw(Keyword::Desc) || self.peek_is_kw(Keyword::Asc) {
                self.next_token();
                if self.cur_is_kw(Keyword::Desc) {
                    direction = OrderDirection::Desc;
                }
            }
            items.push(OrderItem { expr, direction });

            if self.peek_is(TokenKind::Comma) {
                self.next_token();
                self.next_token();
                continue;
            }
            break;
        }

        items
    }

    fn parse_expression_list(&mut self) -> Vec<Expr> {
        let mut exprs = Vec::new();
        match self.parse_expression(Precedence::Lowest) {
            Some(expr) => exprs.push(expr),
            None => return exprs,
        }
        while self.peek_is(TokenKind::Comma) {
            if exprs.len() >= MAX_EXPRESSION_COUNT {
                self.add_error(self.peek().pos, "maximum expression count exceeded");
                break;
            }
            self.next_token();
            self.next_token();
            match self.parse_expression(Precedence::Lowest) {
                Some(expr) => exprs.push(expr),
                None => break,
            }
        }
        exprs
    }

    pub(crate) fn parse_alias_if_present(&mut self) -> Option<String> {
        if self.peek_is_kw(Keyword::As) {
            self.next_token();
            return self.expect_peek_ident();
        }
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            self.next_token();
            if let TokenKind::Ident(name) = &self.cur().kind {
                return Some(name.clone());
            }
        }
        None
    }

    fn parse_table_expression(&mut self) -> Option<TableExpr> {
        let mut left = self.parse_table_factor()?;

        loop {
            if self.peek_join_type().is_none() {
                return Some(left);
            }

            self.next_token();
            let join_type = match self.cur().kind {
                TokenKind::Keyword(Keyword::Join) => JoinType::Inner,
                TokenKind::Keyword(Keyword::Inner) => {
                    self.expect_peek_kw(Keyword::Join);
                    JoinType::Inner
                }
                TokenKind::Keyword(Keyword::Left) => {
                    if self.peek_is_kw(Keyword::Outer) {
                        self.next_token();
                    }
                    self.expect_peek_kw(Keyword::Join);
                    JoinType::Left
                }
                TokenKind::Keyword(Keyword::Right) => {
                    if self.peek_is_kw(Keyword::Outer) {
                        self.next_token();
                    }
                    self.expect_peek_kw(Keyword::Join);
                    JoinType::Right
                }
                TokenKind::Keyword(Keyword::Full) => {
                    if self.peek_is_kw(Keyword::Outer) {
                        self.next_token();
                    }
                    self.expect_peek_kw(Keyword::Join);
                    JoinType::Full
                }
                _ => {
                    self.expect_peek_kw(Keyword::Join);
                    JoinType::Cross
                }
            };

            self.next_token();
            let right = self.parse_table_factor()?;

            let mut on = None;
            if self.peek_is_kw(Keyword::On) {
                self.next_token();
                self.next_token();
                on = self.parse_expression(Precedence::Lowest);
            }

            left = TableExpr::Join(Box::new(JoinExpr {
                left,
                right,
                join_type,
                on,
            }));
        }
    }

    fn peek_join_type(&self) -> Option<JoinType> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Join) | TokenKind::Keyword(Keyword::Inner) => {
                Some(JoinType::Inner)
            }
            TokenKind::Keyword(Keyword::Left) => Some(JoinType::Left),
            TokenKind::Keyword(Keyword::Right) => Some(JoinType::Right),
            TokenKind::Keyword(Keyword::Full) => Some(JoinType::Full),
            TokenKind::Keyword(Keyword::Cross) => Some(JoinType::Cross),
            _ => None,
        }
    }

    fn parse_table_factor(&mut self) -> Option<TableExpr> {
        match self.cur().kind {
            TokenKind::Ident(_) => {
                let name = self.parse_qualified_name();
                let alias = self.parse_alias_if_present();
                Some(TableExpr::Table(TableName { name, alias }))
            }
            TokenKind::LParen => {
                self.next_token();
                match self.cur().kind {
                    TokenKind::Keyword(Keyword::With) => {
                        let with = self.parse_with_clause();
                        if !self.cur_is_kw(Keyword::Select) {
                            return None;
                        }
                        let mut sub = self.parse_select_statement()?;
                        sub.with = Some(with);
                        if !self.expect_peek(TokenKind::RParen) {
                            return None;
                        }
                        let alias = self.parse_alias_if_present();
                        Some(TableExpr::Subquery(SubqueryTable {
                            select: Box::new(sub),
                            alias,
                        }))
                    }
                    TokenKind::Keyword(Keyword::Select) => {
                        let sub = self.parse_select_statement()?;
                        if !self.expect_peek(TokenKind::RParen) {
                            return None;
                        }
                        let alias = self.parse_alias_if_present();
                        Some(TableExpr::Subquery(SubqueryTable {
                            select: Box::new(sub),
                            alias,
                        }))
                    }
                    _ => {
                        let nested = self.parse_table_expression();
                        self.expect_peek(TokenKind::RParen);
                        nested
                    }
                }
            }
            _ => {
                self.add_error(
                    self.cur().pos,
                    format!(
                        "unexpected token {} in FROM clause",
                        self.cur().kind.display_name()
                    ),
                );
                None
            }
        }
    }

    /// Parses a dotted identifier starting at the current token.
    ///
    /// Stops before a trailing `.*` so the expression parser can build a
    /// qualified wildcard from it.
    pub(crate) fn parse_qualified_name(&mut self) -> Identifier {
        let mut parts = vec![self.cur_literal()];
        while self.peek_is(TokenKind::Dot) {
            if self.peek_nth_is(2, TokenKind::Star) {
                break;
            }
            self.next_token();
            let Some(part) = self.expect_peek_ident() else {
                return Identifier { parts };
            };
            parts.push(part);
        }
        Identifier { parts }
    }

    fn parse_insert_statement(&mut self) -> Option<Statement> {
        let mut stmt = InsertStatement {
            table: None,
            columns: Vec::new(),
            rows: Vec::new(),
            select: None,
        };
        if !self.expect_peek_kw(Keyword::Into) {
            return Some(Statement::Insert(Box::new(stmt)));
        }
        self.next_token();
        if let Some(TableExpr::Table(table)) = self.parse_table_factor() {
            stmt.table = Some(table);
        }

        if self.peek_is(TokenKind::LParen) {
            self.next_token();
            self.next_token();
            stmt.columns.push(self.parse_qualified_name());
            while self.peek_is(TokenKind::Comma) {
                self.next_token();
                self.next_token();
                stmt.columns.push(self.parse_qualified_name());
            }
            self.expect_peek(TokenKind::RParen);
        }

        if self.peek_is_kw(Keyword::Values) {
            self.next_token();
            loop {
                if !self.expect_peek(TokenKind::LParen) {
                    break;
                }
                self.next_token();
                let mut row = Vec::new();
                match self.parse_expression(Precedence::Lowest) {
                    Some(expr) => row.push(expr),
                    None => break,
                }
                while self.peek_is(TokenKind::Comma) {
                    self.next_token();
                    self.next_token();
                    match self.parse_expression(Precedence::Lowest) {
                        Some(expr) => row.push(expr),
                        None => break,
                    }
                }
                stmt.rows.push(row);
                if !self.expect_peek(TokenKind::RParen) {
                    break;
                }
                if self.peek_is(TokenKind::Comma) {
                    self.next_token();
                    continue;
                }
                break;
            }
        } else if self.peek_is_kw(Keyword::Select) {
            self.next_token();
            stmt.select = self.parse_select_statement().map(Box::new);
        }

        Some(Statement::Insert(Box::new(stmt)))
    }

    fn parse_update_statement(&mut self) -> Option<Statement> {
        let mut stmt = UpdateStatement {
            table: None,
            assignments: Vec::new(),
            where_clause: None,
        };
        self.next_token();
        stmt.table = self.parse_table_expression();
        if !self.expect_peek_kw(Keyword::Set) {
            return Some(Statement::Update(Box::new(stmt)));
        }
        self.next_token();
        stmt.assignments.push(self.parse_assignment());
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            stmt.assignments.push(self.parse_assignment());
        }
        if self.peek_is_kw(Keyword::Where) {
            self.next_token();
            self.next_token();
            stmt.where_clause = self.parse_expression(Precedence::Lowest);
        }
        Some(Statement::Update(Box::new(stmt)))
    }

    fn parse_assignment(&mut self) -> Assignment {
        let column = self.parse_qualified_name();
        if !self.expect_peek(TokenKind::Eq) {
            return Assignment {
                column,
                value: None,
            };
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest);
        Assignment { column, value }
    }

    fn parse_delete_statement(&mut self) -> Option<Statement> {
        let mut stmt = DeleteStatement {
            table: None,
            where_clause: None,
        };
        if !self.expect_peek_kw(Keyword::From) {
            return Some(Statement::Delete(Box::new(stmt)));
        }
        self.next_token();
        stmt.table = self.parse_table_expression();
        if self.peek_is_kw(Keyword::Where) {
            self.next_token();
            self.next_token();
            stmt.where_clause = self.parse_expression(Precedence::Lowest);
        }
        Some(Statement::Delete(Box::new(stmt)))
    }

    fn parse_create_view_statement(&mut self) -> Option<Statement> {
        let mut stmt = CreateViewStatement::default();

        if self.peek_is_kw(Keyword::Or) {
            self.next_token();
            if !self.expect_peek_kw(Keyword::Replace) {
                return Some(Statement::CreateView(Box::new(stmt)));
            }
            stmt.or_replace = true;
        }

        if self.peek_is_kw(Keyword::Materialized) {
            self.next_token();
            stmt.materialized = true;
        }

        if !self.expect_peek_kw(Keyword::View) {
            return Some(Statement::CreateView(Box::new(stmt)));
        }

        if self.peek_is_kw(Keyword::If) {
            self.next_token();
            if !self.expect_peek_kw(Keyword::Not) {
                return Some(Statement::CreateView(Box::new(stmt)));
            }
            if !self.expect_peek_kw(Keyword::Exists) {
                return Some(Statement::CreateView(Box::new(stmt)));
            }
            stmt.if_not_exists = true;
        }

        if self.expect_peek_ident().is_none() {
            return Some(Statement::CreateView(Box::new(stmt)));
        }
        stmt.name = self.parse_qualified_name();

        if self.peek_is(TokenKind::LParen) {
            self.next_token();
            if self.expect_peek_ident().is_none() {
                return Some(Statement::CreateView(Box::new(stmt)));
            }
            stmt.columns.push(self.parse_qualified_name());
            while self.peek_is(TokenKind::Comma) {
                self.next_token();
                if self.expect_peek_ident().is_none() {
                    return Some(Statement::CreateView(Box::new(stmt)));
                }
                stmt.columns.push(self.parse_qualified_name());
            }
            if !self.expect_peek(TokenKind::RParen) {
                return Some(Statement::CreateView(Box::new(stmt)));
            }
        }

        if !self.expect_peek_kw(Keyword::As) {
            return Some(Statement::CreateView(Box::new(stmt)));
        }

        self.next_token();
        match self.cur().kind {
            TokenKind::Keyword(Keyword::With) => {
                let with = self.parse_with_clause();
                if !self.cur_is_kw(Keyword::Select) {
                    self.add_error(
                        self.cur().pos,
                        format!(
                            "CREATE VIEW requires SELECT after WITH, got {}",
                            self.cur().kind.display_name()
                        ),
                    );
                    return Some(Statement::CreateView(Box::new(stmt)));
                }
                stmt.select = self.parse_select_statement().map(|mut select| {
                    select.with = Some(with);
                    Box::new(select)
                });
            }
            TokenKind::Keyword(Keyword::Select) => {
                stmt.select = self.parse_select_statement().map(Box::new);
            }
            _ => {
                self.add_error(
                    self.cur().pos,
                    format!(
                        "CREATE VIEW requires SELECT, got {}",
                        self.cur().kind.display_name()
                    ),
                );
            }
        }

        Some(Statement::CreateView(Box::new(stmt)))
    }

    fn parse_drop_view_statement(&mut self) -> Option<Statement> {
        let mut stmt = DropViewStatement::default();

        if self.peek_is_kw(Keyword::Materialized) {
            self.next_token();
            stmt.materialized = true;
        }

        if !self.expect_peek_kw(Keyword::View) {
            return Some(Statement::DropView(stmt));
        }

        if self.peek_is_kw(Keyword::If) {
            self.next_token();
            if !self.expect_peek_kw(Keyword::Exists) {
                return Some(Statement::DropView(stmt));
            }
            stmt.if_exists = true;
        }

        if self.expect_peek_ident().is_none() {
            return Some(Statement::DropView(stmt));
        }
        stmt.name = self.parse_qualified_name();

        Some(Statement::DropView(stmt))
    }

    fn parse_describe_statement(&mut self) -> Option<Statement> {
        let target = if self.peek_is_kw(Keyword::Table) {
            self.next_token();
            DescribeTarget::Table
        } else if self.peek_is_kw(Keyword::View) {
            self.next_token();
            DescribeTarget::View
        } else {
            self.add_error(
                self.peek().pos,
                format!(
                    "DESCRIBE expects TABLE or VIEW, got {}",
                    self.peek().kind.display_name()
                ),
            );
            return None;
        };

        let mut stmt = DescribeStatement {
            target,
            name: Identifier::default(),
        };
        if self.expect_peek_ident().is_none() {
            return Some(Statement::Describe(stmt));
        }
        stmt.name = self.parse_qualified_name();
        Some(Statement::Describe(stmt))
    }

    fn parse_show_statement(&mut self) -> Option<Statement> {
        if self.peek_is_kw(Keyword::Tables) {
            self.next_token();
            self.next_token();
            return Some(Statement::ShowTables);
        }
        if self.peek_is_kw(Keyword::Views) {
            self.next_token();
            self.next_token();
            return Some(Statement::ShowViews);
        }
        self.add_error(
            self.peek().pos,
            format!(
                "SHOW expects TABLES or VIEWS, got {}",
                self.peek().kind.display_name()
            ),
        );
        None
    }

    // ==================== Helper methods ====================

    /// Returns the current token.
    pub(crate) fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Returns the peek (next) token.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    /// Advances to the next token; stays on EOF once reached.
    pub(crate) fn next_token(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Returns the literal carried by the current token, if any.
    pub(crate) fn cur_literal(&self) -> String {
        match &self.cur().kind {
            TokenKind::Ident(s) | TokenKind::Number(s) | TokenKind::Str(s) => s.clone(),
            TokenKind::Keyword(kw) => kw.as_str().to_string(),
            other => other.display_name(),
        }
    }

    /// Records a syntax error.
    pub(crate) fn add_error(&mut self, pos: Position, message: impl Into<String>) {
        self.errors.push(SyntaxError::new(pos, message));
    }

    /// Checks whether the current token equals the given kind.
    pub(crate) fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur().kind == kind
    }

    /// Checks whether the peek token equals the given kind.
    pub(crate) fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn peek_nth_is(&self, n: usize, kind: TokenKind) -> bool {
        self.tokens
            .get(self.pos + n)
            .is_some_and(|tok| tok.kind == kind)
    }

    /// Checks whether the current token is the given keyword.
    pub(crate) fn cur_is_kw(&self, kw: Keyword) -> bool {
        matches!(self.cur().kind, TokenKind::Keyword(k) if k == kw)
    }

    /// Checks whether the peek token is the given keyword.
    pub(crate) fn peek_is_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek().kind, TokenKind::Keyword(k) if k == kw)
    }

    /// Advances when the peek token matches, otherwise records an error.
    pub(crate) fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind.clone()) {
            self.next_token();
            true
        } else {
            self.add_error(
                self.peek().pos,
                format!(
                    "expected {}, got {}",
                    kind.display_name(),
                    self.peek().kind.display_name()
                ),
            );
            false
        }
    }

    /// Advances when the peek token is the given keyword, otherwise records
    /// an error.
    pub(crate) fn expect_peek_kw(&mut self, kw: Keyword) -> bool {
        if self.peek_is_kw(kw) {
            self.next_token();
            true
        } else {
            self.add_error(
                self.peek().pos,
                format!(
                    "expected {}, got {}",
                    kw.as_str(),
                    self.peek().kind.display_name()
                ),
            );
            false
        }
    }

    /// Advances onto an identifier token and returns its literal, otherwise
    /// records an error.
    pub(crate) fn expect_peek_ident(&mut self) -> Option<String> {
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            self.next_token();
            if let TokenKind::Ident(name) = &self.cur().kind {
                return Some(name.clone());
            }
        }
        self.add_error(
            self.peek().pos,
            format!("expected IDENT, got {}", self.peek().kind.display_name()),
        );
        None
    }
}
