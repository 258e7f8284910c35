//! Error types for the quiz backend
//!
//! Every fallible operation in the crate returns [`QuizError`]. Route handlers
//! turn it into a JSON error body via [`QuizError::status_code`].

use hyper::StatusCode;

/// Main error type for quiz backend operations
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Malformed play event (negative xp, bogus timing, blank category)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The stored record changed between load and save
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl QuizError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::WriteConflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether the client may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::WriteConflict(_))
    }

    /// Stable machine-readable code for JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::WriteConflict(_) => "WRITE_CONFLICT",
            Self::Database(_) => "DB_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
        }
    }
}

impl From<std::io::Error> for QuizError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for QuizError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for QuizError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for QuizError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for QuizError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode failed: {}", err))
    }
}

impl From<bson::de::Error> for QuizError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON decode failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for QuizError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for quiz backend operations
pub type Result<T> = std::result::Result<T, QuizError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_errors_are_retryable() {
        assert!(QuizError::Database("down".into()).is_retryable());
        assert!(QuizError::WriteConflict("raced".into()).is_retryable());
        assert!(!QuizError::Validation("negative xp".into()).is_retryable());
        assert!(!QuizError::Conflict("taken".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            QuizError::Database("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            QuizError::Validation("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            QuizError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
