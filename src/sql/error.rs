//! SQL syntax error types.
//!
//! This module provides the [`SyntaxError`] type for representing SQL syntax
//! errors with source position information for user-friendly error messages.

use std::fmt;

use super::token::Position;

/// SQL syntax error with source position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Position in the source where the error occurred.
    pub pos: Position,
    /// Error message.
    pub message: String,
}

impl SyntaxError {
    /// Creates a new syntax error at the given position.
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }

    /// Creates a new error for an unexpected token.
    pub fn unexpected_token(expected: &str, found: &str, pos: Position) -> Self {
        Self::new(pos, format!("expected {expected}, got {found}"))
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pos.line > 0 && self.pos.column > 0 {
            write!(
                f,
                "line {}, column {}: {}",
                self.pos.line, self.pos.column, self.message
            )
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for SyntaxError {}
