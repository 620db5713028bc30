use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::PublicUser,
    error::AuthError,
    jwt::JwtKeys,
    password,
    store::{NewUser, ProfileUpdate, Role, StoreError, UserStore},
};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// A registration submission, validated by the HTTP layer.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Orchestrates registration, login and profile operations against an
/// injected store handle. Every operation checks store availability before
/// touching it; no write is attempted against an unreachable store.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.store.clone(), JwtKeys::from_ref(state))
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    async fn ensure_available(&self) -> Result<(), AuthError> {
        if self.store.is_available().await {
            Ok(())
        } else {
            Err(AuthError::Unavailable)
        }
    }

    pub async fn register(&self, account: NewAccount) -> Result<(String, PublicUser), AuthError> {
        self.ensure_available().await?;

        // Existence pre-check. The unique constraints remain the source of
        // truth; a racing duplicate still surfaces as Conflict on insert.
        let email_taken = self.store.find_by_email(&account.email).await?.is_some();
        let username_taken = self
            .store
            .find_by_username(&account.username)
            .await?
            .is_some();
        if email_taken || username_taken {
            warn!(email = %account.email, username = %account.username, "registration conflict");
            return Err(AuthError::Conflict(
                "User with this email or username already exists".into(),
            ));
        }

        let hash = password::hash_password(&account.password)?;
        let user = self
            .store
            .insert(NewUser {
                username: account.username,
                email: account.email,
                password_hash: hash,
                first_name: account.first_name,
                last_name: account.last_name,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                StoreError::DuplicateKey => AuthError::Conflict(
                    "User with this email or username already exists".into(),
                ),
                other => other.into(),
            })?;

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok((token, user.into()))
    }

    pub async fn login(&self, email: &str, pass: &str) -> Result<(String, PublicUser), AuthError> {
        self.ensure_available().await?;

        // Unknown email, inactive account and wrong password all produce the
        // same error so the failing factor is not leaked.
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on inactive account");
            return Err(AuthError::InvalidCredentials);
        }
        if !password::verify_password(pass, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok((token, user.into()))
    }

    pub async fn get_user_profile(&self, user_id: Uuid) -> Result<PublicUser, AuthError> {
        self.ensure_available().await?;
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        Ok(user.into())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileUpdate,
    ) -> Result<PublicUser, AuthError> {
        self.ensure_available().await?;

        if let Some(username) = &changes.username {
            if let Some(existing) = self.store.find_by_username(username).await? {
                if existing.id != user_id {
                    warn!(user_id = %user_id, username = %username, "username already taken");
                    return Err(AuthError::Conflict("Username already exists".into()));
                }
            }
        }

        let user = self
            .store
            .update_profile(user_id, changes)
            .await
            .map_err(|e| match e {
                StoreError::DuplicateKey => AuthError::Conflict("Username already exists".into()),
                other => other.into(),
            })?
            .ok_or(AuthError::NotFound)?;
        info!(user_id = %user.id, "profile updated");
        Ok(user.into())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.ensure_available().await?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !password::verify_password(current_password, &user.password_hash)? {
            warn!(user_id = %user.id, "password change with wrong current password");
            return Err(AuthError::PasswordMismatch);
        }

        let hash = password::hash_password(new_password)?;
        if !self.store.set_password_hash(user.id, &hash).await? {
            return Err(AuthError::NotFound);
        }
        info!(user_id = %user.id, "password updated");
        Ok(())
    }
}
