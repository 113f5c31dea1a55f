use anyhow::{ensure, Context};
use serde::Deserialize;

use crate::users::password::MIN_SALT_LEN;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub password_salt: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>().context("APP_PORT must be a port number")?,
            Err(_) => 8000,
        };
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let password_salt = std::env::var("PASSWORD_SALT")
            .unwrap_or_else(|_| "userdesk-placeholder-salt".into());

        let config = Self {
            database_url,
            host,
            port,
            max_connections,
            password_salt,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.password_salt.len() >= MIN_SALT_LEN,
            "PASSWORD_SALT must be at least {} bytes",
            MIN_SALT_LEN
        );
        ensure!(self.max_connections > 0, "DB_MAX_CONNECTIONS must be positive");
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
