//! Application error types
//!
//! Every error renders as a JSON body whose `error` key carries the message mobile
//! clients display, optionally with `message` and endpoint specific flags.

use friended_core::DomainError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Incorrect username/password")]
    InvalidCredentials,

    #[error("Refresh Token Not Valid. Please Login")]
    InvalidRefreshToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Missing authentication")]
    MissingAuth,

    /// Third-party sign in rejected; the message is shown as-is
    #[error("{0}")]
    AuthFailed(String),

    #[error("{0}")]
    AuthForbidden(String),

    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Rejection rendered as `{"error": true, "message": ...}` by the public guess endpoints
    #[error("{message}")]
    Rejected { status: u16, message: String },

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::BadRequest(_) | Self::InvalidRefreshToken => 400,

            Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::MissingAuth
            | Self::AuthFailed(_) => 401,

            Self::Forbidden(_) | Self::AuthForbidden(_) => 403,

            Self::NotFound(_) => 404,

            Self::Conflict(_) => 409,

            Self::Rejected { status, .. } => *status,

            Self::RateLimitExceeded => 429,

            Self::ExternalService(_) => 502,

            Self::Database(_) | Self::Cache(_) | Self::Internal(_) | Self::Config(_) => 500,

            Self::Domain(e) => domain_status(e),
        }
    }

    /// Get error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::MissingAuth => "MISSING_AUTH",
            Self::AuthFailed(_) => "AUTH_FAILED",
            Self::AuthForbidden(_) => "AUTH_FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Rejected { .. } => "REJECTED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code())
    }

    #[must_use]
    pub fn not_found(msg: impl fmt::Display) -> Self {
        Self::NotFound(msg.to_string())
    }

    #[must_use]
    pub fn forbidden(msg: impl fmt::Display) -> Self {
        Self::Forbidden(msg.to_string())
    }

    #[must_use]
    pub fn validation(msg: impl fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    #[must_use]
    pub fn rejected(status: u16, message: impl fmt::Display) -> Self {
        Self::Rejected {
            status,
            message: message.to_string(),
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// JSON body returned to the client
    #[must_use]
    pub fn body(&self) -> ErrorResponse {
        ErrorResponse::from(self)
    }
}

/// HTTP status for a domain error
pub fn domain_status(e: &DomainError) -> u16 {
    match e {
        // The post form treats a duplicate as a missing slot
        DomainError::AlreadyPosted => 404,
        DomainError::AccountBanned(_) => 401,
        e if e.is_not_found() => 404,
        e if e.is_authorization() => 403,
        e if e.is_validation() => 400,
        e if e.is_conflict() => 409,
        _ => 500,
    }
}

/// Error body: `{"error": ..., "message"?: ..., <extra>}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Value::String(error.into()),
            message: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::MissingAuth => ErrorResponse::new("unauthorized").with_message(err.to_string()),
            AppError::InvalidRefreshToken => {
                ErrorResponse::new("invalid_refresh_token").with_message(err.to_string())
            }
            AppError::AuthFailed(msg) | AppError::AuthForbidden(msg) => {
                ErrorResponse::new(msg.clone()).with_message(msg.clone())
            }
            AppError::Rejected { message, .. } => ErrorResponse {
                error: Value::Bool(true),
                message: Some(message.clone()),
                extra: Map::new(),
            },
            AppError::Domain(DomainError::AccountBanned(reason)) => {
                ErrorResponse::new(reason.clone()).with_message(reason.clone())
            }
            AppError::Domain(e @ DomainError::PostLimitExceeded { .. }) => {
                ErrorResponse::new(e.to_string()).with("exceeded_post_limit", true)
            }
            AppError::Domain(e @ DomainError::AlreadyPosted) => {
                ErrorResponse::new(e.to_string()).with("success", false)
            }
            // Internal details stay in the logs
            e if e.is_server_error() => ErrorResponse::new("Internal server error"),
            e => ErrorResponse::new(e.to_string()),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
