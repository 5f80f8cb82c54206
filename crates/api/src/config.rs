//! API server configuration

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub supabase_jwt_secret: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables, failing fast on
    /// anything required.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let supabase_jwt_secret =
            std::env::var("SUPABASE_JWT_SECRET").context("SUPABASE_JWT_SECRET must be set")?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            bind_address,
            supabase_jwt_secret,
            allowed_origins,
        })
    }
}
