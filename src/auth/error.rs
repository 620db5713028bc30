use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::store::StoreError;

/// Typed failures raised by the auth service and middleware. The HTTP layer
/// maps these to status codes; every response body carries a `message`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Current password is incorrect")]
    PasswordMismatch,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("{0}")]
    Conflict(String),
    #[error("User not found")]
    NotFound,
    #[error("Service temporarily unavailable")]
    Unavailable,
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable => AuthError::Unavailable,
            StoreError::DuplicateKey => AuthError::Conflict("Resource already exists".into()),
            StoreError::Backend(e) => AuthError::Internal(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::Validation(_) | AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self {
            AuthError::Internal(cause) => error!(error = %cause, "internal error in auth"),
            AuthError::Unavailable => warn!("user store unavailable"),
            _ => {}
        }

        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_typed_failures() {
        assert!(matches!(
            AuthError::from(StoreError::Unavailable),
            AuthError::Unavailable
        ));
        assert!(matches!(
            AuthError::from(StoreError::DuplicateKey),
            AuthError::Conflict(_)
        ));
        assert!(matches!(
            AuthError::from(StoreError::Backend(anyhow::anyhow!("boom"))),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn internal_message_hides_the_cause() {
        let err = AuthError::Internal(anyhow::anyhow!("connection refused to 10.0.0.5"));
        assert_eq!(err.to_string(), "Internal server error");
    }
}
