use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::auth::{
    dto::{
        AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, ProfileResponse,
        RegisterRequest, UpdateProfileRequest, UpdatedProfileResponse,
    },
    error::AuthError,
    extractors::CurrentUser,
    service::{is_valid_email, AuthService, NewAccount},
    store::ProfileUpdate,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/change-password", put(change_password))
}

fn require(value: Option<String>, message: &str) -> Result<String, AuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AuthError::Validation(message.into())),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    const MISSING: &str = "All fields are required";
    let username = require(payload.username, MISSING)?;
    let email = require(payload.email, MISSING)?.trim().to_lowercase();
    let password = require(payload.password, MISSING)?;
    let first_name = require(payload.first_name, MISSING)?;
    let last_name = require(payload.last_name, MISSING)?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    let service = AuthService::from_ref(&state);
    let (token, user) = service
        .register(NewAccount {
            username,
            email,
            password,
            first_name,
            last_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            token,
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    const MISSING: &str = "Email and password are required";
    let email = require(payload.email, MISSING)?.trim().to_lowercase();
    let password = require(payload.password, MISSING)?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    let service = AuthService::from_ref(&state);
    let (token, user) = service.login(&email, &password).await?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user,
    }))
}

/// Tokens are stateless; logout is a client-side discard.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Logged out successfully".into(),
    })
}

#[instrument(skip(state, current))]
pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ProfileResponse>, AuthError> {
    let service = AuthService::from_ref(&state);
    let user = service.get_user_profile(current.0.id).await?;
    Ok(Json(ProfileResponse { user }))
}

#[instrument(skip(state, current, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UpdatedProfileResponse>, AuthError> {
    let service = AuthService::from_ref(&state);
    let user = service
        .update_profile(
            current.0.id,
            ProfileUpdate {
                first_name: payload.first_name,
                last_name: payload.last_name,
                username: payload.username,
            },
        )
        .await?;

    Ok(Json(UpdatedProfileResponse {
        message: "Profile updated successfully".into(),
        user,
    }))
}

#[instrument(skip(state, current, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    const MISSING: &str = "Current password and new password are required";
    let current_password = require(payload.current_password, MISSING)?;
    let new_password = require(payload.new_password, MISSING)?;

    let service = AuthService::from_ref(&state);
    service
        .change_password(current.0.id, &current_password, &new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::PublicUser;
    use crate::auth::store::Role;
    use uuid::Uuid;

    #[test]
    fn require_rejects_missing_and_blank_values() {
        assert!(require(None, "msg").is_err());
        assert!(require(Some("   ".into()), "msg").is_err());
        assert_eq!(require(Some("x".into()), "msg").unwrap(), "x");
    }

    #[test]
    fn auth_response_shape_matches_the_client() {
        let response = AuthResponse {
            message: "Login successful".into(),
            token: "t".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                username: "alice".into(),
                email: "alice@x.com".into(),
                first_name: "Alice".into(),
                last_name: "A".into(),
                role: Role::User,
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"message\""));
        assert!(json.contains("\"token\""));
        assert!(json.contains("\"firstName\":\"Alice\""));
        assert!(!json.to_lowercase().contains("password"));
    }
}
