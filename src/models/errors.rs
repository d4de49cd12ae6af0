use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Transport failure: {message}")]
    TransportError { message: String, retryable: bool },

    #[error("Server rejected request ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Unexpected response shape: {message}")]
    ShapeError { message: String },

    #[error("Precondition not met: {message}")]
    PreconditionError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}

impl AppError {
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        AppError::TransportError {
            message: message.into(),
            retryable,
        }
    }

    pub fn server_rejected(status: u16, message: impl Into<String>) -> Self {
        AppError::ServerError {
            status,
            message: message.into(),
        }
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        AppError::ShapeError {
            message: message.into(),
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        AppError::PreconditionError {
            message: message.into(),
        }
    }

    pub fn storage_failed(message: impl Into<String>) -> Self {
        AppError::StorageError {
            message: message.into(),
        }
    }

    /// Whether retrying the same call can reasonably be expected to succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::TransportError { retryable, .. } => *retryable,
            AppError::ServerError { status, .. } => *status >= 500,
            AppError::StorageError { .. } => true,
            AppError::ShapeError { .. } | AppError::PreconditionError { .. } => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::transport(err.to_string(), err.is_connect() || err.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = AppError::server_rejected(401, "Invalid credentials");
        assert_eq!(
            err.to_string(),
            "Server rejected request (401): Invalid credentials"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::transport("connection refused", true).is_retryable());
        assert!(!AppError::transport("bad url", false).is_retryable());
        assert!(AppError::server_rejected(503, "unavailable").is_retryable());
        assert!(!AppError::server_rejected(400, "bad request").is_retryable());
        assert!(!AppError::precondition_failed("no user").is_retryable());
        assert!(!AppError::shape_mismatch("missing field").is_retryable());
    }
}
