//! Error types for the QASM parser.

use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("Lexer error at position {position}: {message}")]
    LexerError { position: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// Invalid version header.
    #[error("Invalid OPENQASM version: {0}")]
    InvalidVersion(String),

    /// AST error during tree construction.
    #[error("AST error: {0}")]
    Ast(#[from] sleipnir_ast::AstError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
