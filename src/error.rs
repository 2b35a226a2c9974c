//! Crate-level errors.
//!
//! Every failure surfaced by the library is one of four tagged kinds, so
//! embedding request handlers dispatch on the tag and forward
//! [`Error::code`] directly as an HTTP status.

use crate::sql::SyntaxError;
use crate::store::StoreError;
use crate::translate::TranslationError;

/// Errors produced while parsing, translating, or persisting.
#[derive(Debug)]
pub enum Error {
    /// SQL syntax error with source position.
    Syntax(SyntaxError),
    /// The AST exceeds the supported dialect.
    Translation(TranslationError),
    /// Table catalog or view store failure.
    Store(StoreError),
    /// Failure reported by a backend executor the caller forwards PipeQL
    /// to. The library never constructs this variant itself.
    Backend(BackendError),
}

/// Error from an external query backend (non-2xx response or transport
/// failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    /// Status code to surface; 502 for transport failures.
    pub code: u16,
    /// Human-readable message.
    pub message: String,
}

impl BackendError {
    /// Creates a backend error mapped to 502 Bad Gateway.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            code: 502,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BackendError {}

impl Error {
    /// Returns the HTTP-style status code for this error.
    pub fn code(&self) -> u16 {
        match self {
            Error::Syntax(_) => 400,
            Error::Translation(e) => e.code,
            Error::Store(e) => e.code(),
            Error::Backend(e) => e.code,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "{}", e),
            Error::Translation(e) => write!(f, "{}", e),
            Error::Store(e) => write!(f, "{}", e),
            Error::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Syntax(e) => Some(e),
            Error::Translation(e) => Some(e),
            Error::Store(e) => Some(e),
            Error::Backend(e) => Some(e),
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Self {
        Error::Syntax(e)
    }
}

impl From<TranslationError> for Error {
    fn from(e: TranslationError) -> Self {
        Error::Translation(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        Error::Backend(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Position;

    #[test]
    fn test_codes_follow_http_semantics() {
        let syntax: Error = SyntaxError::new(Position::new(1, 1), "boom").into();
        assert_eq!(syntax.code(), 400);

        let translation: Error = TranslationError::not_found("missing").into();
        assert_eq!(translation.code(), 404);

        let store: Error = StoreError::Locked {
            name: "v".to_string(),
        }
        .into();
        assert_eq!(store.code(), 423);

        let backend: Error = BackendError::bad_gateway("connection refused").into();
        assert_eq!(backend.code(), 502);
    }

    #[test]
    fn test_display_includes_position_for_syntax_errors() {
        let err: Error = SyntaxError::new(Position::new(3, 4), "unexpected token").into();
        assert_eq!(err.to_string(), "line 3, column 4: unexpected token");
    }
}
