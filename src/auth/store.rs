use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// User role. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

/// Fields for creating a user. The password is already hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Partial profile update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store is unreachable")]
    Unavailable,
    #[error("unique constraint violated")]
    DuplicateKey,
    #[error("user store query failed")]
    Backend(anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Liveness probe. Service operations check this before touching the
    /// store and fail fast when it reports false.
    async fn is_available(&self) -> bool;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_admin(&self) -> Result<Option<User>, StoreError>;

    /// Insert a new user. A duplicate email or username surfaces as
    /// `DuplicateKey`; the DB constraint is the source of truth for races.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Apply a partial profile update. Returns `None` if the user no longer
    /// exists. A username collision surfaces as `DuplicateKey`.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Replace the stored password hash. Returns whether a row was updated.
    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, StoreError>;
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable,
        sqlx::Error::Io(_) => StoreError::Unavailable,
        other => StoreError::Backend(other.into()),
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, role, is_active, created_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn is_available(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_admin(&self) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 LIMIT 1"
        ))
        .bind(Role::Admin)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name  = COALESCE($3, last_name),
                username   = COALESCE($4, username)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-memory store used by tests and `AppState::fake()`. Enforces the same
/// uniqueness rules as the Postgres schema and can simulate an outage via
/// `set_available(false)`.
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    available: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Flip a user's active flag. Returns whether the user existed.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.guard()?;
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.guard()?;
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.guard()?;
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_admin(&self) -> Result<Option<User>, StoreError> {
        self.guard()?;
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.role == Role::Admin).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.guard()?;
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::DuplicateKey);
        }
        let record = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        self.guard()?;
        let mut users = self.users.lock().unwrap();
        if let Some(username) = &changes.username {
            if users.values().any(|u| u.id != id && &u.username == username) {
                return Err(StoreError::DuplicateKey);
            }
        }
        match users.get_mut(&id) {
            Some(user) => {
                if let Some(first_name) = changes.first_name {
                    user.first_name = first_name;
                }
                if let Some(last_name) = changes.last_name {
                    user.last_name = last_name;
                }
                if let Some(username) = changes.username {
                    user.username = username;
                }
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, StoreError> {
        self.guard()?;
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) => {
                user.password_hash = hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email_and_username() {
        let store = MemoryUserStore::new();
        store.insert(new_user("alice", "alice@x.com")).await.unwrap();

        let err = store
            .insert(new_user("bob", "alice@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey));

        let err = store
            .insert(new_user("alice", "bob@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey));
    }

    #[tokio::test]
    async fn update_profile_rejects_taken_username_but_allows_own() {
        let store = MemoryUserStore::new();
        let alice = store.insert(new_user("alice", "alice@x.com")).await.unwrap();
        store.insert(new_user("bob", "bob@x.com")).await.unwrap();

        let err = store
            .update_profile(
                alice.id,
                ProfileUpdate {
                    username: Some("bob".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey));

        // Re-submitting your own username is not a collision
        let updated = store
            .update_profile(
                alice.id,
                ProfileUpdate {
                    username: Some("alice".into()),
                    first_name: Some("Alicia".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.first_name, "Alicia");
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = MemoryUserStore::new();
        store.set_available(false);

        assert!(!store.is_available().await);
        assert!(matches!(
            store.find_by_email("a@x.com").await.unwrap_err(),
            StoreError::Unavailable
        ));
        assert!(matches!(
            store.insert(new_user("a", "a@x.com")).await.unwrap_err(),
            StoreError::Unavailable
        ));
    }

    #[tokio::test]
    async fn set_password_hash_reports_missing_user() {
        let store = MemoryUserStore::new();
        let updated = store
            .set_password_hash(Uuid::new_v4(), "new-hash")
            .await
            .unwrap();
        assert!(!updated);
    }
}
