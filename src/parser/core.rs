//! Core parser struct and token helpers.

use crate::ast::Program;
use crate::error::{ParseErrors, ParserError};
use crate::lexer::{Token, TokenKind};
use crate::span::Span;

pub type ParseResult<T> = Result<T, ParserError>;

/// The parser for Lumen.
///
/// Errors accumulate: a malformed statement is recorded and the parser
/// synchronizes to the next statement boundary instead of aborting.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
    pub(crate) errors: Vec<ParserError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Parse a complete program, returning either the AST or the full
    /// batch of accumulated errors.
    pub fn parse(mut self) -> Result<Program, ParseErrors> {
        let program = self.parse_program();
        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err(ParseErrors(self.errors))
        }
    }

    /// Parse every statement, recording errors as they occur.
    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        Program::new(statements)
    }

    /// Errors accumulated so far.
    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    /// Skip tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.match_token(TokenKind::Semicolon) {
                return;
            }
            match self.peek().kind {
                TokenKind::Let | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ===== Token manipulation =====

    pub(crate) fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens[self.current - 1].clone()
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParserError::unexpected_token(
                kind.to_string(),
                self.peek().kind.to_string(),
                self.current_span(),
            ))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> ParseResult<Token> {
        self.expect(TokenKind::Identifier)
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }
}
