//! Error types for all pipeline phases.

use std::fmt;

use crate::span::Span;
use thiserror::Error;

/// Parser errors. These accumulate: the parser reports every error it
/// can recover from rather than stopping at the first.
#[derive(Debug, Clone, Error)]
pub enum ParserError {
    #[error("expected next token to be {expected} but got {found} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("no prefix fn for {token} at {span}")]
    NoPrefixParser { token: String, span: Span },

    #[error("could not parse {literal} as integer at {span}")]
    InvalidInteger { literal: String, span: Span },

    #[error("illegal character '{literal}' at {span}")]
    IllegalToken { literal: String, span: Span },
}

impl ParserError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn no_prefix_parser(token: impl Into<String>, span: Span) -> Self {
        Self::NoPrefixParser {
            token: token.into(),
            span,
        }
    }

    pub fn invalid_integer(literal: impl Into<String>, span: Span) -> Self {
        Self::InvalidInteger {
            literal: literal.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::NoPrefixParser { span, .. } => *span,
            Self::InvalidInteger { span, .. } => *span,
            Self::IllegalToken { span, .. } => *span,
        }
    }
}

/// The full batch of errors from one parse.
#[derive(Debug, Clone)]
pub struct ParseErrors(pub Vec<ParserError>);

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

/// Bytecode compilation errors. The first error aborts compilation.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("undefined variable {0}")]
    UndefinedVariable(String),
}

/// Runtime errors, raised by the VM and the tree-walking evaluator.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    // VM
    #[error("stack overflow")]
    StackOverflow,

    #[error("unsupported types for binary operation: {0} {1}")]
    UnsupportedBinaryTypes(&'static str, &'static str),

    #[error("unknown integer operator: {0}")]
    UnknownIntegerOperator(String),

    #[error("unknown boolean operator: {0}")]
    UnknownBooleanOperator(String),

    #[error("unknown string operator: {0}")]
    UnknownStringOperator(String),

    #[error("unsupported type for minus operation: {0}")]
    UnsupportedMinus(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("calling non-function")]
    CallingNonFunction,

    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongNumberOfArguments { want: usize, got: usize },

    // Evaluator
    #[error("type mismatch: {left} {op} {right}")]
    TypeMismatch {
        left: &'static str,
        op: String,
        right: &'static str,
    },

    #[error("unknown operator: {op}{operand}")]
    UnknownPrefixOperator { op: String, operand: &'static str },

    #[error("unknown operator: {left} {op} {right}")]
    UnknownInfixOperator {
        left: &'static str,
        op: String,
        right: &'static str,
    },

    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),

    #[error("not a function: {0}")]
    NotAFunction(&'static str),

    // Shared
    #[error("index operator not supported: {0}")]
    IndexNotSupported(&'static str),

    #[error("unusable as hash key: {0}")]
    UnusableHashKey(&'static str),

    /// Builtin functions report their own message verbatim.
    #[error("{0}")]
    Builtin(String),
}

impl RuntimeError {
    pub fn builtin(message: impl Into<String>) -> Self {
        Self::Builtin(message.into())
    }
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum LumenError {
    #[error(transparent)]
    Parse(#[from] ParseErrors),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
