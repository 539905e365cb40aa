//! Application settings loaded from environment variables.

use std::env;
use std::str::FromStr;

use super::constants::{
    DEFAULT_CONFIRMATION_TTL_SECONDS, DEFAULT_DATABASE_URL, DEFAULT_JWT_EXPIRATION_HOURS,
    DEFAULT_REDIS_URL, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, DEFAULT_STORAGE_BACKEND,
    MIN_JWT_SECRET_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Which persistence adapter backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through SeaORM, confirmations in Redis
    Relational,
    /// In-process document store, confirmations in memory
    Document,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relational" | "postgres" => Ok(StorageBackend::Relational),
            "document" | "memory" => Ok(StorageBackend::Document),
            other => Err(AppError::validation(format!(
                "Unknown STORAGE_BACKEND '{}', expected 'relational' or 'document'",
                other
            ))),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub storage_backend: StorageBackend,
    /// Emails that are registered with the admin role
    pub admin_emails: Vec<String>,
    pub confirmation_ttl_seconds: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("storage_backend", &self.storage_backend)
            .field("admin_emails", &self.admin_emails.len())
            .field("confirmation_ttl_seconds", &self.confirmation_ttl_seconds)
            .finish()
    }
}

impl Config {
    /// Build a configuration with defaults around the given signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> AppResult<Self> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        Ok(Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            jwt_secret,
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            storage_backend: StorageBackend::Relational,
            admin_emails: Vec::new(),
            confirmation_ttl_seconds: DEFAULT_CONFIRMATION_TTL_SECONDS,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// A missing JWT_SECRET falls back to an insecure default in debug
    /// builds only.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            }
            Err(_) => {
                return Err(AppError::validation(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        let mut config = Self::with_secret(jwt_secret)?;

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(url) = env::var("REDIS_URL") {
            config.redis_url = url;
        }
        if let Some(hours) = parse_var("JWT_EXPIRATION_HOURS") {
            config.jwt_expiration_hours = hours;
        }
        if let Ok(host) = env::var("SERVER_HOST") {
            config.server_host = host;
        }
        if let Some(port) = parse_var("SERVER_PORT") {
            config.server_port = port;
        }
        if let Some(ttl) = parse_var("CONFIRMATION_TTL_SECONDS") {
            config.confirmation_ttl_seconds = ttl;
        }

        config.storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| DEFAULT_STORAGE_BACKEND.to_string())
            .parse()?;

        config.admin_emails = env::var("ADMIN_EMAILS")
            .map(|v| parse_email_list(&v))
            .unwrap_or_default();

        Ok(config)
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Whether an email is configured for the admin role at registration.
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        assert!(Config::with_secret("short").is_err());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!(
            "Document".parse::<StorageBackend>().unwrap(),
            StorageBackend::Document
        );
        assert_eq!(
            "postgres".parse::<StorageBackend>().unwrap(),
            StorageBackend::Relational
        );
        assert!("mongo".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_bootstrap_admin_is_case_insensitive() {
        let mut config = Config::with_secret("a-test-secret-that-is-long-enough!").unwrap();
        config.admin_emails = parse_email_list(" root@rentease.io, ,ops@rentease.io");

        assert_eq!(config.admin_emails.len(), 2);
        assert!(config.is_bootstrap_admin("Root@RentEase.io"));
        assert!(!config.is_bootstrap_admin("someone@rentease.io"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::with_secret("a-test-secret-that-is-long-enough!").unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("a-test-secret"));
        assert!(printed.contains("[REDACTED]"));
    }
}
