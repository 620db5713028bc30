use tracing::{debug, info, warn};

use crate::auth::password;
use crate::auth::store::{NewUser, Role, StoreError};
use crate::state::AppState;

/// One-time admin bootstrap, run explicitly at process start. Only active
/// when seeding credentials are configured (SEED_ADMIN env gate); never
/// triggered by any other code path.
pub async fn seed_default_admin(state: &AppState) -> anyhow::Result<()> {
    let Some(seed) = &state.config.seed_admin else {
        debug!("admin seeding disabled");
        return Ok(());
    };

    if !state.store.is_available().await {
        warn!("user store unavailable, skipping admin seeding");
        return Ok(());
    }

    if let Some(existing) = state.store.find_admin().await? {
        info!(email = %existing.email, "admin account already present, skipping seed");
        return Ok(());
    }

    let hash = password::hash_password(&seed.password)?;
    let result = state
        .store
        .insert(NewUser {
            username: seed.username.clone(),
            email: seed.email.trim().to_lowercase(),
            password_hash: hash,
            first_name: "Admin".into(),
            last_name: "User".into(),
            role: Role::Admin,
        })
        .await;

    match result {
        Ok(user) => {
            // Credentials themselves are never logged.
            info!(user_id = %user.id, email = %user.email, "default admin account created");
            Ok(())
        }
        Err(StoreError::DuplicateKey) => {
            warn!("admin seed lost a race with another instance, skipping");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
