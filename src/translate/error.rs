//! Translation errors.

/// Error produced when the AST exceeds the supported dialect or refers to
/// unknown tables/views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationError {
    /// HTTP-style status code (400 bad request, 404 not found, ...).
    pub code: u16,
    /// Human-readable message.
    pub message: String,
}

impl TranslationError {
    /// Creates a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: 400,
            message: message.into(),
        }
    }

    /// Creates a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: 404,
            message: message.into(),
        }
    }

    /// Creates a 500 Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TranslationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TranslationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(TranslationError::bad_request("nope").code, 400);
        assert_eq!(TranslationError::not_found("missing").code, 404);
        assert_eq!(TranslationError::internal("boom").code, 500);
        assert_eq!(TranslationError::bad_request("nope").to_string(), "nope");
    }
}
