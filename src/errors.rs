use thiserror::Error;

/// Failures raised by business services.
///
/// Callers never see these directly; RPC handlers translate them into
/// protocol errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("call canceled")]
    Canceled,
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            AppError::invalid_argument("name too long").to_string(),
            "invalid argument: name too long"
        );
        assert_eq!(AppError::not_found("no user").to_string(), "not found: no user");
        assert_eq!(AppError::Canceled.to_string(), "call canceled");
        assert_eq!(
            AppError::internal("store unavailable").to_string(),
            "internal error: store unavailable"
        );
    }
}
