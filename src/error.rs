use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server error: {0}")]
    Server(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AppError {
    /// Whether the same request may succeed if the user simply tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Server(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
