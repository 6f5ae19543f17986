//! Expression-level grammar: the Pratt parsing core.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::{get_precedence, Precedence};

impl Parser {
    /// Parse an expression at the given minimum precedence.
    pub(crate) fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;
        while !self.check(TokenKind::Semicolon) && precedence < get_precedence(self.peek().kind) {
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(token.literal), token.span))
            }
            TokenKind::IntLiteral => {
                self.advance();
                let value = token.literal.parse::<i64>().map_err(|_| {
                    ParserError::invalid_integer(token.literal.clone(), token.span)
                })?;
                Ok(Expr::new(ExprKind::IntLiteral(value), token.span))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(token.literal), token.span))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                let value = token.kind == TokenKind::True;
                Ok(Expr::new(ExprKind::BoolLiteral(value), token.span))
            }
            TokenKind::Bang => self.parse_prefix_op(UnaryOp::Not),
            TokenKind::Minus => self.parse_prefix_op(UnaryOp::Neg),
            TokenKind::LeftParen => self.parse_grouped(),
            TokenKind::If => self.parse_if(),
            TokenKind::Fn => self.parse_function(),
            TokenKind::LeftBracket => self.parse_array(),
            TokenKind::LeftBrace => self.parse_hash(),
            TokenKind::Illegal => Err(ParserError::IllegalToken {
                literal: token.literal,
                span: token.span,
            }),
            _ => Err(ParserError::no_prefix_parser(
                token.kind.to_string(),
                token.span,
            )),
        }
    }

    fn parse_infix(&mut self, left: Expr) -> ParseResult<Expr> {
        let kind = self.peek().kind;
        match kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Less
            | TokenKind::Greater
            | TokenKind::EqualEqual
            | TokenKind::BangEqual => self.parse_binary(left),
            TokenKind::LeftParen => self.parse_call(left),
            TokenKind::LeftBracket => self.parse_index(left),
            // Unreachable: get_precedence only admits the kinds above.
            _ => Ok(left),
        }
    }

    fn parse_prefix_op(&mut self, op: UnaryOp) -> ParseResult<Expr> {
        let token = self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        let span = token.span.merge(right.span);
        Ok(Expr::new(
            ExprKind::Prefix {
                op,
                right: Box::new(right),
            },
            span,
        ))
    }

    /// Infix operators are left-associative: the right side is parsed at
    /// the operator's own precedence.
    fn parse_binary(&mut self, left: Expr) -> ParseResult<Expr> {
        let token = self.advance();
        let op = match token.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::EqualEqual => BinaryOp::Eq,
            TokenKind::BangEqual => BinaryOp::NotEq,
            _ => unreachable!("parse_binary called on non-operator token"),
        };
        let right = self.parse_expression(get_precedence(token.kind))?;
        let span = left.span.merge(right.span);
        Ok(Expr::new(
            ExprKind::Infix {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_grouped(&mut self) -> ParseResult<Expr> {
        self.advance();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RightParen)?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> ParseResult<Expr> {
        let if_token = self.advance();
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RightParen)?;
        let consequence = self.parse_block()?;

        let alternative = if self.match_token(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let end = alternative
            .as_ref()
            .map(|b| b.span)
            .unwrap_or(consequence.span);
        let span = if_token.span.merge(end);
        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            span,
        ))
    }

    fn parse_function(&mut self) -> ParseResult<Expr> {
        let fn_token = self.advance();
        self.expect(TokenKind::LeftParen)?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            params.push(self.expect_identifier()?.literal);
            while self.match_token(TokenKind::Comma) {
                params.push(self.expect_identifier()?.literal);
            }
        }
        self.expect(TokenKind::RightParen)?;

        let body = self.parse_block()?;
        let span = fn_token.span.merge(body.span);
        Ok(Expr::new(ExprKind::Function { params, body }, span))
    }

    fn parse_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        self.advance();
        let args = self.parse_expression_list(TokenKind::RightParen)?;
        let span = callee.span.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let open = self.advance();
        let elements = self.parse_expression_list(TokenKind::RightBracket)?;
        let span = open.span.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Array(elements), span))
    }

    fn parse_index(&mut self, left: Expr) -> ParseResult<Expr> {
        self.advance();
        let index = self.parse_expression(Precedence::Lowest)?;
        let close = self.expect(TokenKind::RightBracket)?;
        let span = left.span.merge(close.span);
        Ok(Expr::new(
            ExprKind::Index {
                left: Box::new(left),
                index: Box::new(index),
            },
            span,
        ))
    }

    /// `{ key: value, … }` — pairs keep their source order.
    fn parse_hash(&mut self) -> ParseResult<Expr> {
        let open = self.advance();
        let mut pairs = Vec::new();
        if !self.check(TokenKind::RightBrace) {
            loop {
                let key = self.parse_expression(Precedence::Lowest)?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression(Precedence::Lowest)?;
                pairs.push((key, value));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightBrace)?;
        Ok(Expr::new(ExprKind::Hash(pairs), open.span.merge(close.span)))
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut list = Vec::new();
        if self.match_token(end) {
            return Ok(list);
        }
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.match_token(TokenKind::Comma) {
            list.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect(end)?;
        Ok(list)
    }

    fn previous_span(&self) -> crate::span::Span {
        self.tokens[self.current - 1].span
    }
}
