use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::{error::AuthError, jwt::JwtKeys, store::User};
use crate::state::AppState;

/// Extracts a bearer token, verifies it and resolves the full user record.
/// Requests without a resolved, active identity never reach the handler.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AuthError::InvalidToken)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token)?;

        // The token may outlive the account; resolve and re-check it.
        let user = state
            .store
            .find_by_id(claims.sub)
            .await
            .map_err(AuthError::from)?;
        match user {
            Some(user) if user.is_active => Ok(CurrentUser(user)),
            Some(user) => {
                warn!(user_id = %user.id, "token for deactivated account");
                Err(AuthError::InvalidToken)
            }
            None => {
                warn!(user_id = %claims.sub, "token for unknown account");
                Err(AuthError::InvalidToken)
            }
        }
    }
}
