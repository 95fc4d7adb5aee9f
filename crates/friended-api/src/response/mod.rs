//! Response types and error handling for API endpoints
//!
//! Every failure is rendered through [`AppError::body`], so clients always receive
//! `{"error": ..., "message"?: ...}` with the status the error maps to.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use friended_common::AppError;
use friended_service::ServiceError;
use thiserror::Error;
use tracing::{debug, error};
use validator::{ValidationErrors, ValidationErrorsKind};

/// API error type for consistent error responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    App(#[from] AppError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid path parameter: {0}")]
    InvalidPath(String),

    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Invalid access token")]
    InvalidAuth,
}

impl ApiError {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self::InvalidBody(msg.into())
    }

    /// The application error this failure is reported as
    fn into_app_error(self) -> (AppError, Option<serde_json::Value>) {
        match self {
            Self::App(e) => (e, None),
            Self::Service(e) => (e.into(), None),
            Self::Validation(errors) => {
                let message = first_message(&errors).unwrap_or_else(|| "Invalid request".to_string());
                let details = serde_json::to_value(&errors).ok();
                (AppError::Validation(message), details)
            }
            Self::InvalidPath(msg) | Self::InvalidQuery(msg) | Self::InvalidBody(msg) => {
                (AppError::BadRequest(msg), None)
            }
            Self::MissingAuth => (AppError::MissingAuth, None),
            Self::InvalidAuth => (AppError::InvalidToken, None),
        }
    }
}

/// First validation message, walking nested structs in field order
fn first_message(errors: &ValidationErrors) -> Option<String> {
    let map = errors.errors();
    let mut fields: Vec<_> = map.keys().collect();
    fields.sort();

    fields.into_iter().find_map(|field| match map.get(field)? {
        ValidationErrorsKind::Field(list) => list.first().map(|e| {
            e.message
                .as_ref()
                .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
        }),
        ValidationErrorsKind::Struct(inner) => first_message(inner),
        ValidationErrorsKind::List(items) => items.values().find_map(|inner| first_message(inner)),
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (err, details) = self.into_app_error();
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = ?err, code = err.error_code(), "Server error occurred");
        } else {
            debug!(error = %err, code = err.error_code(), status = status.as_u16(), "Request rejected");
        }

        let mut body = err.body();
        if let Some(details) = details {
            body = body.with("errors", details);
        }

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// Created response (201) with JSON body
pub struct Created<T>(pub T);

impl<T: IntoResponse> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = self.0.into_response();
        *response.status_mut() = StatusCode::CREATED;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friended_core::DomainError;
    use validator::Validate;

    #[derive(Validate)]
    struct Inner {
        #[validate(length(min = 1, message = "provider is required"))]
        provider: String,
    }

    #[derive(Validate)]
    struct Outer {
        #[validate(nested)]
        token: Inner,
    }

    #[test]
    fn test_api_error_status_codes() {
        let (err, _) = ApiError::MissingAuth.into_app_error();
        assert_eq!(err.status_code(), 401);

        let (err, _) = ApiError::invalid_path("bad id").into_app_error();
        assert_eq!(err.status_code(), 400);

        let (err, _) = ApiError::from(ServiceError::from(DomainError::AlreadyPosted)).into_app_error();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_nested_validation_message() {
        let errors = Outer {
            token: Inner {
                provider: String::new(),
            },
        }
        .validate()
        .unwrap_err();
        assert_eq!(first_message(&errors).as_deref(), Some("provider is required"));

        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_created_sets_status() {
        let response = Created(Json(serde_json::json!({"id": "1"}))).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
