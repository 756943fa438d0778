//! CLI error types.

use std::fmt;

use calman_core::field::{FieldError, ValidationError};
use calman_google::ApiError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
///
/// Validation failures and remote failures stay distinct so the menu loop
/// (and tests) can tell a rejected input from a failed request without
/// scraping message text.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// User input failed validation; nothing was sent to the service.
    Validation(ValidationError),
    /// The service rejected or failed the request.
    Api(ApiError),
    /// IO error.
    Io(std::io::Error),
    /// No usable session; authentication must run first.
    AuthRequired(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Validation(err) => write!(f, "invalid input: {}", err),
            Self::Api(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Api(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<FieldError> for CliError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Read { source, .. } => Self::Io(source),
            FieldError::Invalid(err) => Self::Validation(err),
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
