//! Expression parsing with precedence climbing.
//!
//! This module implements expression parsing for the [`Parser`] using the
//! precedence climbing algorithm, which handles operator precedence and
//! associativity correctly. The right side of a binary operator is parsed
//! at the operator's own precedence, making binaries left-associative.

use super::ast::{BinaryOp, Expr, FuncCall, Identifier, UnaryOp, WindowSpec};
use super::parser::{MAX_PARSER_DEPTH, Parser};
use super::token::{Keyword, TokenKind};

/// Operator precedence levels (higher binds tighter).
///
/// Precedence (low to high): OR; AND; NOT and the comparison family
/// (`= != < <= > >= IN BETWEEN LIKE IS`); `+ -`; `* / %`; prefix
/// operators; call/member (`. ( OVER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest = 0,
    Or = 1,
    And = 2,
    Comparison = 3,
    Sum = 4,
    Product = 5,
    Prefix = 6,
    Call = 7,
}

/// Returns the precedence of a token appearing in infix position.
fn token_precedence(kind: &TokenKind) -> Precedence {
    match kind {
        TokenKind::Keyword(Keyword::Or) => Precedence::Or,
        TokenKind::Keyword(Keyword::And) => Precedence::And,
        TokenKind::Keyword(Keyword::Not)
        | TokenKind::Keyword(Keyword::In)
        | TokenKind::Keyword(Keyword::Between)
        | TokenKind::Keyword(Keyword::Like)
        | TokenKind::Keyword(Keyword::Is)
        | TokenKind::Eq
        | TokenKind::Neq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq => Precedence::Comparison,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::Dot | TokenKind::LParen | TokenKind::Keyword(Keyword::Over) => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

/// Returns true for tokens that always end an expression.
fn terminates_expression(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Semicolon
            | TokenKind::Comma
            | TokenKind::RParen
            | TokenKind::Keyword(
                Keyword::Group
                    | Keyword::Order
                    | Keyword::Limit
                    | Keyword::Offset
                    | Keyword::Having
                    | Keyword::Union
                    | Keyword::Intersect
                    | Keyword::Except
            )
    )
}

impl Parser {
    /// Parses an expression with the given minimum precedence.
    ///
    /// Returns `None` after recording a diagnostic when no expression can
    /// be formed.
    pub(crate) fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            self.add_error(self.cur().pos, "expression nesting too deep");
            self.depth -= 1;
            return None;
        }
        let result = self.parse_expression_inner(precedence);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix_expression()?;

        loop {
            if terminates_expression(&self.peek().kind) {
                break;
            }
            let prec = token_precedence(&self.peek().kind);
            if precedence >= prec {
                break;
            }
            self.next_token();
            left = self.parse_infix_expression(left)?;
        }

        Some(left)
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        match self.cur().kind.clone() {
            TokenKind::Ident(_) => Some(Expr::Identifier(self.parse_qualified_name())),
            // REPLACE is a keyword for CREATE OR REPLACE but also a scalar
            // function name.
            TokenKind::Keyword(Keyword::Replace) => {
                Some(Expr::Identifier(Identifier::simple("REPLACE")))
            }
            TokenKind::Number(value) => Some(Expr::Numeric(value)),
            TokenKind::Str(value) => Some(Expr::String(value)),
            TokenKind::Keyword(Keyword::True) => Some(Expr::Boolean(true)),
            TokenKind::Keyword(Keyword::False) => Some(Expr::Boolean(false)),
            TokenKind::Keyword(Keyword::Null) => Some(Expr::Null),
            TokenKind::Placeholder => Some(Expr::Placeholder("?".to_string())),
            TokenKind::Star => Some(Expr::Star(None)),
            TokenKind::Minus => {
                self.next_token();
                let expr = self.parse_expression(Precedence::Prefix)?;
                Some(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.next_token();
                let expr = self.parse_expression(Precedence::Prefix)?;
                Some(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                })
            }
            TokenKind::LParen => {
                self.next_token();
                let expr = self.parse_expression(Precedence::Lowest)?;
                if !self.expect_peek(TokenKind::RParen) {
                    return Some(expr);
                }
                Some(expr)
            }
            TokenKind::Keyword(Keyword::Exists) => self.parse_exists_expression(false),
            other => {
                self.add_error(
                    self.cur().pos,
                    format!("unexpected token {}", other.display_name()),
                );
                None
            }
        }
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        match self.cur().kind.clone() {
            TokenKind::Plus => self.parse_binary_expression(left, BinaryOp::Add),
            TokenKind::Minus => self.parse_binary_expression(left, BinaryOp::Sub),
            TokenKind::Star => self.parse_binary_expression(left, BinaryOp::Mul),
            TokenKind::Slash => self.parse_binary_expression(left, BinaryOp::Div),
            TokenKind::Percent => self.parse_binary_expression(left, BinaryOp::Mod),
            TokenKind::Eq => self.parse_binary_expression(left, BinaryOp::Eq),
            TokenKind::Neq => self.parse_binary_expression(left, BinaryOp::Neq),
            TokenKind::Lt => self.parse_binary_expression(left, BinaryOp::Lt),
            TokenKind::LtEq => self.parse_binary_expression(left, BinaryOp::LtEq),
            TokenKind::Gt => self.parse_binary_expression(left, BinaryOp::Gt),
            TokenKind::GtEq => self.parse_binary_expression(left, BinaryOp::GtEq),
            TokenKind::Keyword(Keyword::And) => self.parse_binary_expression(left, BinaryOp::And),
            TokenKind::Keyword(Keyword::Or) => self.parse_binary_expression(left, BinaryOp::Or),
            TokenKind::Keyword(Keyword::In) => self.parse_in_expression(left, false),
            TokenKind::Keyword(Keyword::Like) => self.parse_like_expression(left, false),
            TokenKind::Keyword(Keyword::Between) => self.parse_between_expression(left, false),
            TokenKind::Keyword(Keyword::Is) => self.parse_is_null_expression(left),
            TokenKind::Keyword(Keyword::Not) => {
                if self.peek_is_kw(Keyword::In) {
                    self.next_token();
                    return self.parse_in_expression(left, true);
                }
                if self.peek_is_kw(Keyword::Like) {
                    self.next_token();
                    return self.parse_like_expression(left, true);
                }
                if self.peek_is_kw(Keyword::Between) {
                    self.next_token();
                    return self.parse_between_expression(left, true);
                }
                if self.peek_is_kw(Keyword::Exists) {
                    self.next_token();
                    return self.parse_exists_expression(true);
                }
                self.add_error(
                    self.peek().pos,
                    format!(
                        "expected IN, BETWEEN, LIKE, or EXISTS after NOT, got {}",
                        self.peek().kind.display_name()
                    ),
                );
                None
            }
            TokenKind::LParen => self.parse_function_call(left),
            TokenKind::Keyword(Keyword::Over) => match left {
                Expr::FuncCall(mut call) => {
                    call.over = Some(self.parse_window_specification());
                    Some(Expr::FuncCall(call))
                }
                other => {
                    self.add_error(self.cur().pos, "OVER requires preceding function call");
                    Some(other)
                }
            },
            TokenKind::Dot => match left {
                Expr::Identifier(ident) => {
                    self.next_token();
                    if self.cur_is(TokenKind::Star) {
                        return Some(Expr::Star(Some(ident)));
                    }
                    if let TokenKind::Ident(part) = &self.cur().kind {
                        let mut parts = ident.parts;
                        parts.push(part.clone());
                        return Some(Expr::Identifier(Identifier { parts }));
                    }
                    self.add_error(
                        self.cur().pos,
                        format!(
                            "expected identifier after '.', got {}",
                            self.cur().kind.display_name()
                        ),
                    );
                    Some(Expr::Identifier(ident))
                }
                other => Some(other),
            },
            _ => Some(left),
        }
    }

    fn parse_binary_expression(&mut self, left: Expr, op: BinaryOp) -> Option<Expr> {
        let precedence = token_precedence(&self.cur().kind);
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_in_expression(&mut self, left: Expr, negated: bool) -> Option<Expr> {
        if !self.expect_peek(TokenKind::LParen) {
            return Some(Expr::In {
                expr: Box::new(left),
                list: Vec::new(),
                subquery: None,
                negated,
            });
        }
        self.next_token();

        if self.cur_is_kw(Keyword::Select) {
            let subquery = self.parse_select_statement().map(Box::new);
            self.expect_peek(TokenKind::RParen);
            return Some(Expr::In {
                expr: Box::new(left),
                list: Vec::new(),
                subquery,
                negated,
            });
        }

        let mut list = Vec::new();
        match self.parse_expression(Precedence::Lowest) {
            Some(expr) => list.push(expr),
            None => {
                return Some(Expr::In {
                    expr: Box::new(left),
                    list,
                    subquery: None,
                    negated,
                });
            }
        }
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            match self.parse_expression(Precedence::Lowest) {
                Some(expr) => list.push(expr),
                None => break,
            }
        }
        self.expect_peek(TokenKind::RParen);
        Some(Expr::In {
            expr: Box::new(left),
            list,
            subquery: None,
            negated,
        })
    }

    fn parse_like_expression(&mut self, left: Expr, negated: bool) -> Option<Expr> {
        self.next_token();
        let pattern = self.parse_expression(Precedence::Comparison)?;
        Some(Expr::Like {
            expr: Box::new(left),
            pattern: Box::new(pattern),
            negated,
        })
    }

    fn parse_between_expression(&mut self, left: Expr, negated: bool) -> Option<Expr> {
        self.next_token();
        let lower = self.parse_expression(Precedence::Comparison)?;
        if !self.expect_peek_kw(Keyword::And) {
            return None;
        }
        self.next_token();
        let upper = self.parse_expression(Precedence::Comparison)?;
        Some(Expr::Between {
            expr: Box::new(left),
            lower: Box::new(lower),
            upper: Box::new(upper),
            negated,
        })
    }

    fn parse_is_null_expression(&mut self, left: Expr) -> Option<Expr> {
        let negated = if self.peek_is_kw(Keyword::Not) {
            self.next_token();
            true
        } else {
            false
        };
        if !self.expect_peek_kw(Keyword::Null) {
            return Some(left);
        }
        Some(Expr::IsNull {
            expr: Box::new(left),
            negated,
        })
    }

    fn parse_exists_expression(&mut self, negated: bool) -> Option<Expr> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let subquery = self.parse_select_statement()?;
        self.expect_peek(TokenKind::RParen);
        Some(Expr::Exists {
            subquery: Box::new(subquery),
            negated,
        })
    }

    fn parse_function_call(&mut self, left: Expr) -> Option<Expr> {
        let name = match left {
            Expr::Identifier(name) => name,
            other => return Some(other),
        };
        let mut call = FuncCall {
            name,
            distinct: false,
            args: Vec::new(),
            over: None,
        };

        if self.peek_is(TokenKind::RParen) {
            self.next_token();
            return Some(Expr::FuncCall(call));
        }

        self.next_token();
        if self.cur_is_kw(Keyword::Distinct) {
            call.distinct = true;
            self.next_token();
        }

        match self.parse_call_argument() {
            Some(arg) => call.args.push(arg),
            None => return Some(Expr::FuncCall(call)),
        }
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            match self.parse_call_argument() {
                Some(arg) => call.args.push(arg),
                None => break,
            }
        }
        self.expect_peek(TokenKind::RParen);
        Some(Expr::FuncCall(call))
    }

    /// Parses one function argument; `*` is valid here (`COUNT(*)`).
    fn parse_call_argument(&mut self) -> Option<Expr> {
        self.parse_expression(Precedence::Lowest)
    }

    fn parse_window_specification(&mut self) -> WindowSpec {
        let mut spec = WindowSpec::default();
        if !self.expect_peek(TokenKind::LParen) {
            return spec;
        }
        if self.peek_is(TokenKind::RParen) {
            self.next_token();
            return spec;
        }
        self.next_token();

        let mut parsed_partition = false;
        let mut parsed_order = false;
        while !self.cur_is(TokenKind::RParen) && !self.cur().is_eof() {
            match self.cur().kind {
                TokenKind::Keyword(Keyword::Partition) => {
                    if parsed_partition {
                        self.add_error(
                            self.cur().pos,
                            "duplicate PARTITION clause in window specification",
                        );
                        return spec;
                    }
                    parsed_partition = true;
                    if !self.expect_peek_kw(Keyword::By) {
                        return spec;
                    }
                    self.next_token();
                    match self.parse_expression(Precedence::Lowest) {
                        Some(expr) => spec.partition_by.push(expr),
                        None => return spec,
                    }
                    while self.peek_is(TokenKind::Comma) {
                        self.next_token();
                        self.next_token();
                        match self.parse_expression(Precedence::Lowest) {
                            Some(expr) => spec.partition_by.push(expr),
                            None => return spec,
                        }
                    }
                    if self.peek_is(TokenKind::RParen) {
                        self.next_token();
                        return spec;
                    }
                    self.next_token();
                }
                TokenKind::Keyword(Keyword::Order) => {
                    if parsed_order {
                        self.add_error(
                            self.cur().pos,
                            "duplicate ORDER clause in window specification",
                        );
                        return spec;
                    }
                    parsed_order = true;
                    if !self.expect_peek_kw(Keyword::By) {
                        return spec;
                    }
                    self.next_token();
                    spec.order_by = self.parse_order_list();
                    if self.peek_is(TokenKind::RParen) {
                        self.next_token();
                        return spec;
                    }
                    self.next_token();
                }
                _ => {
                    self.add_error(
                        self.cur().pos,
                        format!(
                            "unexpected token {} in window specification",
                            self.cur().kind.display_name()
                        ),
                    );
                    return spec;
                }
            }
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(input: &str) -> Expr {
        let mut parser = Parser::new(input);
        let expr = parser.parse_expression(Precedence::Lowest);
        assert!(
            parser.errors().is_empty(),
            "unexpected errors: {:?}",
            parser.errors()
        );
        expr.expect("no expression parsed")
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier(Identifier::simple(name))
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expr("NULL"), Expr::Null);
        assert_eq!(parse_expr("TRUE"), Expr::Boolean(true));
        assert_eq!(parse_expr("FALSE"), Expr::Boolean(false));
        assert_eq!(parse_expr("42"), Expr::Numeric("42".to_string()));
        assert_eq!(parse_expr("'hi'"), Expr::String("hi".to_string()));
        assert_eq!(parse_expr("?"), Expr::Placeholder("?".to_string()));
    }

    #[test]
    fn test_qualified_identifier() {
        assert_eq!(
            parse_expr("l.level"),
            Expr::Identifier(Identifier {
                parts: vec!["l".to_string(), "level".to_string()],
            })
        );
    }

    #[test]
    fn test_qualified_star() {
        assert_eq!(
            parse_expr("t.*"),
            Expr::Star(Some(Identifier::simple("t")))
        );
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let Expr::Binary { op, left, right } = parse_expr("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert_eq!(*left, Expr::Numeric("1".to_string()));
        assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));

        // a AND b OR c parses as (a AND b) OR c
        let Expr::Binary { op, .. } = parse_expr("a AND b OR c") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
    }

    #[test]
    fn test_left_associativity() {
        // a - b - c parses as (a - b) - c
        let Expr::Binary { left, .. } = parse_expr("a - b - c") else {
            panic!("expected binary");
        };
        assert!(matches!(
            *left,
            Expr::Binary {
                op: BinaryOp::Sub,
                ..
            }
        ));
    }

    #[test]
    fn test_unary_ops() {
        assert!(matches!(
            parse_expr("-5"),
            Expr::Unary {
                op: UnaryOp::Neg,
                ..
            }
        ));
        assert!(matches!(
            parse_expr("NOT TRUE"),
            Expr::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
    }

    #[test]
    fn test_grouped_expression() {
        let Expr::Binary { op, left, .. } = parse_expr("(1 + 2) * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Mul);
        assert!(matches!(
            *left,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_comparison_family() {
        for (input, op) in [
            ("a = 1", BinaryOp::Eq),
            ("a != 1", BinaryOp::Neq),
            ("a <> 1", BinaryOp::Neq),
            ("a < 1", BinaryOp::Lt),
            ("a <= 1", BinaryOp::LtEq),
            ("a > 1", BinaryOp::Gt),
            ("a >= 1", BinaryOp::GtEq),
        ] {
            let Expr::Binary { op: got, .. } = parse_expr(input) else {
                panic!("expected binary for {input}");
            };
            assert_eq!(got, op, "operator mismatch for {input}");
        }
    }

    #[test]
    fn test_in_list() {
        let Expr::In { list, negated, .. } = parse_expr("x IN (1, 2, 3)") else {
            panic!("expected IN");
        };
        assert_eq!(list.len(), 3);
        assert!(!negated);

        let Expr::In { negated, .. } = parse_expr("x NOT IN (1)") else {
            panic!("expected IN");
        };
        assert!(negated);
    }

    #[test]
    fn test_in_subquery() {
        let Expr::In { subquery, list, .. } = parse_expr("x IN (SELECT y FROM t)") else {
            panic!("expected IN");
        };
        assert!(subquery.is_some());
        assert!(list.is_empty());
    }

    #[test]
    fn test_between() {
        let Expr::Between { negated, .. } = parse_expr("x BETWEEN 1 AND 10") else {
            panic!("expected BETWEEN");
        };
        assert!(!negated);

        let Expr::Between { negated, .. } = parse_expr("x NOT BETWEEN 1 AND 10") else {
            panic!("expected BETWEEN");
        };
        assert!(negated);
    }

    #[test]
    fn test_like() {
        let Expr::Like { pattern, negated, .. } = parse_expr("name LIKE 'A%'") else {
            panic!("expected LIKE");
        };
        assert_eq!(*pattern, Expr::String("A%".to_string()));
        assert!(!negated);

        let Expr::Like { negated, .. } = parse_expr("name NOT LIKE '%x%'") else {
            panic!("expected LIKE");
        };
        assert!(negated);
    }

    #[test]
    fn test_is_null() {
        assert!(matches!(
            parse_expr("x IS NULL"),
            Expr::IsNull { negated: false, .. }
        ));
        assert!(matches!(
            parse_expr("x IS NOT NULL"),
            Expr::IsNull { negated: true, .. }
        ));
    }

    #[test]
    fn test_exists() {
        assert!(matches!(
            parse_expr("EXISTS (SELECT level FROM logs)"),
            Expr::Exists { negated: false, .. }
        ));
    }

    #[test]
    fn test_function_call() {
        let Expr::FuncCall(call) = parse_expr("COUNT(*)") else {
            panic!("expected function call");
        };
        assert_eq!(call.name.display(), "COUNT");
        assert_eq!(call.args, vec![Expr::Star(None)]);
        assert!(!call.distinct);

        let Expr::FuncCall(call) = parse_expr("SUM(DISTINCT x)") else {
            panic!("expected function call");
        };
        assert!(call.distinct);
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn test_replace_keyword_as_function() {
        let Expr::FuncCall(call) = parse_expr("REPLACE(message, 'a', 'b')") else {
            panic!("expected function call");
        };
        assert_eq!(call.name.display(), "REPLACE");
        assert_eq!(call.args.len(), 3);
    }

    #[test]
    fn test_window_specification() {
        let Expr::FuncCall(call) =
            parse_expr("SUM(duration) OVER (PARTITION BY service ORDER BY _time DESC)")
        else {
            panic!("expected function call");
        };
        let over = call.over.expect("window spec");
        assert_eq!(over.partition_by.len(), 1);
        assert_eq!(over.order_by.len(), 1);
        assert_eq!(
            over.order_by[0].direction,
            crate::sql::ast::OrderDirection::Desc
        );
    }

    #[test]
    fn test_empty_window_specification() {
        let Expr::FuncCall(call) = parse_expr("COUNT(*) OVER ()") else {
            panic!("expected function call");
        };
        let over = call.over.expect("window spec");
        assert!(over.partition_by.is_empty());
        assert!(over.order_by.is_empty());
    }

    #[test]
    fn test_duplicate_partition_rejected() {
        let mut parser = Parser::new("COUNT(*) OVER (PARTITION BY a PARTITION BY b)");
        let _ = parser.parse_expression(Precedence::Lowest);
        assert!(
            parser
                .errors()
                .iter()
                .any(|e| e.message.contains("duplicate PARTITION"))
        );
    }

    #[test]
    fn test_complex_predicate() {
        let expr = parse_expr("a > 0 AND b < 10 OR c = 5");
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Or,
                ..
            }
        ));
        assert_eq!(parse_expr("NOT (a = 1 OR b = 2)"), {
            Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(Expr::Binary {
                    left: Box::new(Expr::Binary {
                        left: Box::new(ident("a")),
                        op: BinaryOp::Eq,
                        right: Box::new(Expr::Numeric("1".to_string())),
                    }),
                    op: BinaryOp::Or,
                    right: Box::new(Expr::Binary {
                        left: Box::new(ident("b")),
                        op: BinaryOp::Eq,
                        right: Box::new(Expr::Numeric("2".to_string())),
                    }),
                }),
            }
        });
    }
}
