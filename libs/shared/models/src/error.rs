use serde_json::{json, Value};
use thiserror::Error;

/// Errors as they reach the presentation layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    /// Text shown to the user, without the category prefix.
    pub fn user_message(&self) -> &str {
        match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Internal(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg)
            | AppError::ExternalService(msg) => msg,
        }
    }

    /// Whether the user can fix the problem by changing their input (e.g. picking another slot).
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            AppError::BadRequest(_) | AppError::ValidationError(_) | AppError::Conflict(_)
        )
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": self.user_message(),
            "actionable": self.is_actionable(),
        })
    }
}
