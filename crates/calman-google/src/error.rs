//! Error types for Google Calendar API operations.

use std::fmt;
use thiserror::Error;

/// The category of an API error.
///
/// A high-level classification so callers can branch on what happened
/// without scraping message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Authentication failed or credentials are invalid/expired.
    Authentication,
    /// The authenticated account lacks permission (403).
    Authorization,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    Network,
    /// Rate limit exceeded (429).
    RateLimited,
    /// Server returned an error (5xx status codes).
    Server,
    /// Unparseable or unexpected response from the server.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was invalid (400) - bad parameters, malformed body.
    BadRequest,
    /// A conditional write failed (412): the entity changed since it was
    /// fetched, so the update was not applied.
    PreconditionFailed,
    /// Configuration error - missing or invalid config.
    Configuration,
    /// Internal error - unexpected state, bug.
    Internal,
}

impl ApiErrorKind {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited | Self::Server)
    }

    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication_failed",
            Self::Authorization => "authorization_failed",
            Self::Network => "network_error",
            Self::RateLimited => "rate_limited",
            Self::Server => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::PreconditionFailed => "precondition_failed",
            Self::Configuration => "configuration_error",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from the session layer: the request never completed, or the
/// service answered with a failure.
#[derive(Debug, Error)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authentication, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authorization, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Server, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    /// Creates a failed-precondition error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::PreconditionFailed, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Configuration, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A specialized Result type for session operations.
pub type ApiResult<T> = Result<T, ApiError>;
