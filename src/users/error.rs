use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::repo_types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Username => f.write_str("username"),
            UniqueField::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    UniqueViolation(UniqueField),

    #[error("invalid stored row: {0}")]
    InvalidRow(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("password digest failed: {0}")]
    Digest(#[from] argon2::Error),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl UserError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::DuplicateUsername(_) | UserError::DuplicateEmail(_) => StatusCode::CONFLICT,
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::Digest(_) | UserError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            UserError::DuplicateUsername(_) => "DUPLICATE_USERNAME",
            UserError::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            UserError::NotFound(_) => "NOT_FOUND",
            UserError::Digest(_) | UserError::Store(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "code": self.code(), "message": message }))).into_response()
    }
}

/// Rejection for requests that fail field validation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": "VALIDATION", "message": self.0 })),
        )
            .into_response()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    User(#[from] UserError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(e) => e.into_response(),
            ApiError::User(e) => e.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            UserError::DuplicateUsername("a".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            UserError::DuplicateEmail("a@x.com".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(UserError::NotFound(3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            UserError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn digest_failure_is_internal_and_typed() {
        use std::error::Error as _;
        let err = UserError::from(argon2::Error::SaltTooShort);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, UserError::Digest(argon2::Error::SaltTooShort)));
        assert!(err.source().is_some());
    }

    #[test]
    fn store_error_keeps_source() {
        use std::error::Error as _;
        let err = UserError::from(StoreError::Database(sqlx::Error::PoolClosed));
        let store = err.source().expect("store error source");
        assert!(store.source().is_some());
    }
}
