use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials for the one-time admin bootstrap. Only present when
/// SEED_ADMIN is set in the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdminConfig {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub seed_admin: Option<SeedAdminConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "meditec".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "meditec-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let seed_enabled = std::env::var("SEED_ADMIN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let seed_admin = if seed_enabled {
            Some(SeedAdminConfig {
                email: std::env::var("SEED_ADMIN_EMAIL")
                    .context("SEED_ADMIN_EMAIL is required when SEED_ADMIN is set")?,
                username: std::env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
                password: std::env::var("SEED_ADMIN_PASSWORD")
                    .context("SEED_ADMIN_PASSWORD is required when SEED_ADMIN is set")?,
            })
        } else {
            None
        };

        Ok(Self {
            database_url,
            jwt,
            seed_admin,
        })
    }
}
