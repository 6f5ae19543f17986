//! Statement-level grammar.

use crate::ast::{Block, Stmt, StmtKind};
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::Precedence;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> ParseResult<Stmt> {
        let let_token = self.advance();
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Equal)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        self.match_token(TokenKind::Semicolon);

        let span = let_token.span.merge(value.span);
        Ok(Stmt::new(
            StmtKind::Let {
                name: name.literal,
                value,
            },
            span,
        ))
    }

    fn parse_return_statement(&mut self) -> ParseResult<Stmt> {
        let return_token = self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.match_token(TokenKind::Semicolon);

        let span = return_token.span.merge(value.span);
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.match_token(TokenKind::Semicolon);

        let span = expr.span;
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }

    /// `{ statements }`
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        let open = self.expect(TokenKind::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        let close = self.expect(TokenKind::RightBrace)?;
        Ok(Block::new(statements, open.span.merge(close.span)))
    }
}
