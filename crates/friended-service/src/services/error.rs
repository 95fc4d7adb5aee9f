//! Errors returned by Friended services
//!
//! Most failures are domain rule violations raised by repositories or entities. The
//! remaining variants cover what services decide on their own: a refusal worded for
//! the mobile client, input the client must fix, a row that is gone, or a service
//! context that was wired without one of its dependencies.

use friended_common::{domain_status, AppError};
use friended_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Auth failures and the public guess page rejections
    #[error(transparent)]
    App(#[from] AppError),

    /// Lookup by id found nothing. Clients only see `"<kind> not found"`.
    #[error("{kind} not found: {id}")]
    Gone { kind: &'static str, id: String },

    /// Shown to the client verbatim under `error`
    #[error("{0}")]
    Refused(String),

    #[error("{0}")]
    BadInput(String),

    #[error("service context built without {0}")]
    MissingDependency(&'static str),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::Gone { kind, id: id.into() }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Refused(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::BadInput(msg.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) => domain_status(e),
            Self::App(e) => e.status_code(),
            Self::Gone { .. } => 404,
            Self::Refused(_) => 403,
            Self::BadInput(_) => 400,
            Self::MissingDependency(_) => 500,
        }
    }

    /// Stable code for log lines
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::Gone { .. } => "NOT_FOUND",
            Self::Refused(_) => "FORBIDDEN",
            Self::BadInput(_) => "VALIDATION_ERROR",
            Self::MissingDependency(_) => "MISSING_DEPENDENCY",
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::Gone { kind, .. } => AppError::NotFound(format!("{kind} not found")),
            ServiceError::Refused(msg) => AppError::Forbidden(msg),
            ServiceError::BadInput(msg) => AppError::Validation(msg),
            err @ ServiceError::MissingDependency(_) => AppError::Internal(anyhow::anyhow!(err.to_string())),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
