//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, the JWT signing secret, and the SMTP
//! credentials used for password-reset mail. Configuration is loaded once at
//! startup and treated as immutable afterwards; everything that needs it
//! receives it by injection rather than re-reading the environment.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub server_port: u16,
    /// Base URL embedded in password-reset links sent by email.
    pub reset_base_url: String,
    /// Upper bound on a single store or mailer call.
    pub collaborator_timeout_seconds: u64,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
}

/// SMTP transport settings, present only when mail is fully configured.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let reset_base_url =
            env::var("RESET_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let collaborator_timeout_seconds = env::var("COLLABORATOR_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .context("COLLABORATOR_TIMEOUT_SECONDS must be a valid number")?;

        let smtp_port = match env::var("SMTP_PORT") {
            Ok(port) => Some(port.parse::<u16>().context("SMTP_PORT must be a valid number")?),
            Err(_) => None,
        };

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            server_port,
            reset_base_url,
            collaborator_timeout_seconds,
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_port,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            from_email: env::var("FROM_EMAIL").ok(),
            from_name: env::var("FROM_NAME").ok(),
        })
    }

    /// Returns the SMTP settings when every required field is present.
    pub fn email_config(&self) -> Option<EmailConfig> {
        Some(EmailConfig {
            smtp_host: self.smtp_host.clone()?,
            smtp_port: self.smtp_port.unwrap_or(465),
            smtp_username: self.smtp_username.clone()?,
            smtp_password: self.smtp_password.clone()?,
            from_email: self.from_email.clone()?,
            from_name: self
                .from_name
                .clone()
                .unwrap_or_else(|| "GogaBlog".to_string()),
        })
    }
}
