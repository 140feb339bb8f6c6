//! Expressions, by precedence climbing.
//!
//! Lowest to highest: `OR`, `AND`, `NOT`, comparisons (`=`, `LIKE`, `IN`,
//! `IS`, `BETWEEN`), additive and bitwise (`+ - & | ^`), multiplicative
//! (`* / %`), unary, primary.

use sqlparser::tokenizer::Token;

use super::{PResult, Parser};
use crate::ast::{BinaryOperator, Expr, Literal, ObjectName, UnaryOperator};
use crate::cursor::is_reserved;

/// Keywords that stand alone as values.
const VALUE_KEYWORDS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DEFAULT",
    "SESSION_USER",
    "SYSTEM_USER",
];

/// Reserved words that are also built-in function names.
const RESERVED_FUNCTIONS: &[&str] = &["LEFT", "RIGHT"];

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_or)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.cursor.parse_keyword("OR") {
            let right = self.parse_and()?;
            left = binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    pub(crate) fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.cursor.consume(&Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_not()?;
        while self.cursor.parse_keyword("AND") {
            let right = self.parse_not()?;
            left = binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.cursor.parse_keyword("NOT") {
            let expr = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.cursor.peek() {
                Token::Eq => Some(BinaryOperator::Eq),
                Token::Neq => Some(BinaryOperator::NotEq),
                Token::Lt => Some(BinaryOperator::Lt),
                Token::LtEq => Some(BinaryOperator::LtEq),
                Token::Gt => Some(BinaryOperator::Gt),
                Token::GtEq => Some(BinaryOperator::GtEq),
                _ => None,
            };
            if let Some(op) = op {
                self.cursor.next_token();
                let right = self.parse_additive()?;
                left = binary(left, op, right);
                continue;
            }

            let negated = self.cursor.peek_keyword("NOT")
                && (self.cursor.peek_nth_keyword(1, "LIKE")
                    || self.cursor.peek_nth_keyword(1, "IN")
                    || self.cursor.peek_nth_keyword(1, "BETWEEN"));
            if negated {
                self.cursor.next_token();
            }

            let expr = if self.cursor.parse_keyword("LIKE") {
                let pattern = self.parse_additive()?;
                if self.cursor.parse_keyword("ESCAPE") {
                    self.parse_primary()?;
                }
                binary(left, BinaryOperator::Like, pattern)
            } else if self.cursor.parse_keyword("IN") {
                let list = self.parse_in_list()?;
                binary(left, BinaryOperator::In, list)
            } else if self.cursor.parse_keyword("BETWEEN") {
                let low = self.parse_additive()?;
                self.cursor.expect_keyword("AND")?;
                let high = self.parse_additive()?;
                binary(left, BinaryOperator::Between, Expr::Nested(vec![low, high]))
            } else if self.cursor.parse_keyword("IS") {
                let is_not = self.cursor.parse_keyword("NOT");
                self.cursor.expect_keyword("NULL")?;
                let test = binary(left, BinaryOperator::Is, Expr::Literal(Literal::Null));
                if is_not { not(test) } else { test }
            } else {
                return Ok(left);
            };

            left = if negated { not(expr) } else { expr };
        }
    }

    /// `IN (subquery)` or `IN (a, b, c)`.
    fn parse_in_list(&mut self) -> PResult<Expr> {
        self.cursor.expect(&Token::LParen)?;
        let list = if self.cursor.peek_keyword("SELECT") || self.cursor.peek_keyword("WITH") {
            Expr::Subquery(Box::new(self.parse_query()?))
        } else {
            Expr::Nested(self.parse_expr_list()?)
        };
        self.cursor.expect(&Token::RParen)?;
        Ok(list)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.cursor.peek() {
                Token::Plus => BinaryOperator::Plus,
                Token::Minus => BinaryOperator::Minus,
                Token::Ampersand => BinaryOperator::BitAnd,
                Token::Pipe => BinaryOperator::BitOr,
                Token::Caret => BinaryOperator::BitXor,
                _ => return Ok(left),
            };
            // `+=` and friends belong to an enclosing assignment
            if self.cursor.peek_nth(1) == &Token::Eq {
                return Ok(left);
            }
            self.cursor.next_token();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.cursor.peek() {
                Token::Mul => BinaryOperator::Multiply,
                Token::Div => BinaryOperator::Divide,
                Token::Mod => BinaryOperator::Modulo,
                _ => return Ok(left),
            };
            if self.cursor.peek_nth(1) == &Token::Eq {
                return Ok(left);
            }
            self.cursor.next_token();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.cursor.peek() {
            Token::Minus => Some(UnaryOperator::Minus),
            Token::Plus => Some(UnaryOperator::Plus),
            Token::Tilde => Some(UnaryOperator::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.cursor.next_token();
            let expr = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }

        let expr = self.parse_primary()?;
        if self.cursor.parse_keyword("COLLATE") {
            self.parse_identifier()?;
        }
        Ok(expr)
    }

    pub(crate) fn parse_primary(&mut self) -> PResult<Expr> {
        match self.cursor.peek().clone() {
            Token::Number(value, _) => {
                self.cursor.next_token();
                Ok(Expr::Literal(Literal::Number(value)))
            }
            Token::HexStringLiteral(value) => {
                self.cursor.next_token();
                Ok(Expr::Literal(Literal::Number(value)))
            }
            Token::SingleQuotedString(value) => {
                self.cursor.next_token();
                Ok(Expr::Literal(Literal::String {
                    value,
                    national: false,
                }))
            }
            Token::NationalStringLiteral(value) => {
                self.cursor.next_token();
                Ok(Expr::Literal(Literal::String {
                    value,
                    national: true,
                }))
            }
            Token::Mul => {
                self.cursor.next_token();
                Ok(Expr::Wildcard)
            }
            Token::LParen => self.parse_parenthesized_expr(),
            Token::Word(word) if word.quote_style.is_some() => self.parse_name_expr(),
            Token::Word(word) => self.parse_word_expr(&word.value),
            _ => Err(self.cursor.unexpected("expression")),
        }
    }

    /// `(subquery)` or `(a [, b ...])`.
    fn parse_parenthesized_expr(&mut self) -> PResult<Expr> {
        self.cursor.expect(&Token::LParen)?;
        let expr = if self.cursor.peek_keyword("SELECT") || self.cursor.peek_keyword("WITH") {
            Expr::Subquery(Box::new(self.parse_query()?))
        } else {
            Expr::Nested(self.parse_expr_list()?)
        };
        self.cursor.expect(&Token::RParen)?;
        Ok(expr)
    }

    fn parse_word_expr(&mut self, word: &str) -> PResult<Expr> {
        let upper = word.to_ascii_uppercase();
        let followed_by_paren = self.cursor.peek_nth(1) == &Token::LParen;

        if word.starts_with('@') {
            self.cursor.next_token();
            return Ok(Expr::Variable(word.to_string()));
        }

        match upper.as_str() {
            "NULL" => {
                self.cursor.next_token();
                return Ok(Expr::Literal(Literal::Null));
            }
            "CASE" => return self.parse_case(),
            "CAST" | "TRY_CAST" if followed_by_paren => return self.parse_cast(),
            "CONVERT" | "TRY_CONVERT" if followed_by_paren => return self.parse_convert(&upper),
            "EXISTS" => {
                self.cursor.next_token();
                self.cursor.expect(&Token::LParen)?;
                let query = self.parse_query()?;
                self.cursor.expect(&Token::RParen)?;
                return Ok(Expr::Exists(Box::new(query)));
            }
            "NEXT" if self.cursor.peek_nth_keyword(1, "VALUE") => {
                self.cursor.next_token();
                self.cursor.next_token();
                self.cursor.expect_keyword("FOR")?;
                let name = self.parse_object_name()?;
                return Ok(Expr::Function {
                    name,
                    args: Vec::new(),
                });
            }
            _ => {}
        }

        if VALUE_KEYWORDS.contains(&upper.as_str()) && !followed_by_paren {
            self.cursor.next_token();
            return Ok(Expr::Keyword(upper));
        }

        if is_reserved(word) && !(followed_by_paren && RESERVED_FUNCTIONS.contains(&upper.as_str()))
        {
            return Err(self.cursor.unexpected("expression"));
        }

        self.parse_name_expr()
    }

    /// Identifier, `alias.*`, or function call.
    fn parse_name_expr(&mut self) -> PResult<Expr> {
        let name = self.parse_object_name()?;

        if self.cursor.peek() == &Token::Period && self.cursor.peek_nth(1) == &Token::Mul {
            self.cursor.next_token();
            self.cursor.next_token();
            return Ok(Expr::Wildcard);
        }

        if self.cursor.peek() == &Token::LParen {
            return self.parse_function_call(name);
        }

        Ok(Expr::Identifier(name))
    }

    fn parse_function_call(&mut self, name: ObjectName) -> PResult<Expr> {
        self.cursor.expect(&Token::LParen)?;
        let args = if self.cursor.consume(&Token::RParen) {
            Vec::new()
        } else {
            let _ = self.cursor.parse_keyword("DISTINCT") || self.cursor.parse_keyword("ALL");
            let args = self.parse_expr_list()?;
            self.cursor.expect(&Token::RParen)?;
            args
        };

        if self.cursor.parse_keywords(&["WITHIN", "GROUP"]) {
            self.cursor.skip_parenthesized()?;
        }
        if self.cursor.parse_keyword("OVER") {
            self.cursor.skip_parenthesized()?;
        }

        Ok(Expr::Function { name, args })
    }

    fn parse_case(&mut self) -> PResult<Expr> {
        self.cursor.expect_keyword("CASE")?;
        let operand = if self.cursor.peek_keyword("WHEN") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        let mut branches = Vec::new();
        while self.cursor.parse_keyword("WHEN") {
            let condition = self.parse_expr()?;
            self.cursor.expect_keyword("THEN")?;
            let result = self.parse_expr()?;
            branches.push((condition, result));
        }
        if branches.is_empty() {
            return Err(self.cursor.unexpected("WHEN"));
        }

        let else_result = if self.cursor.parse_keyword("ELSE") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.cursor.expect_keyword("END")?;

        Ok(Expr::Case {
            operand,
            branches,
            else_result,
        })
    }

    /// `CAST(expr AS type)`
    fn parse_cast(&mut self) -> PResult<Expr> {
        self.cursor.next_token();
        self.cursor.expect(&Token::LParen)?;
        let expr = self.parse_expr()?;
        self.cursor.expect_keyword("AS")?;
        let data_type = self.parse_data_type()?;
        self.cursor.expect(&Token::RParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            data_type,
        })
    }

    /// `CONVERT(type, expr [, style])`
    fn parse_convert(&mut self, function: &str) -> PResult<Expr> {
        self.cursor.next_token();
        self.cursor.expect(&Token::LParen)?;
        self.parse_data_type()?;
        let mut args = Vec::new();
        while self.cursor.consume(&Token::Comma) {
            args.push(self.parse_expr()?);
        }
        self.cursor.expect(&Token::RParen)?;
        Ok(Expr::Function {
            name: ObjectName::new([function]),
            args,
        })
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn not(expr: Expr) -> Expr {
    Expr::Unary {
        op: UnaryOperator::Not,
        expr: Box::new(expr),
    }
}
