//! SQL-flavoured expression language for derived columns.
//!
//! Expressions are parsed once during validation and evaluated per row by
//! the generation engine. Keywords and function names are case-insensitive.

mod ast;
mod functions;
mod lexer;
mod parser;

use thiserror::Error;

pub use ast::{BinaryOp, Expr, Literal, UnaryOp};
pub use functions::Function;
pub use parser::{MAX_DEPTH, parse_expr};

/// Errors raised while tokenizing or parsing an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated string literal starting at offset {pos}")]
    UnterminatedString { pos: usize },
    #[error("invalid number '{text}' at offset {pos}")]
    InvalidNumber { text: String, pos: usize },
    #[error("unexpected '{found}' at offset {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        pos: usize,
    },
    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function {function} expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },
    #[error("invalid argument for {function}: {message}")]
    InvalidArgument { function: String, message: String },
    #[error("unsupported cast type '{0}'")]
    UnsupportedType(String),
    #[error("expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}
