// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Environment-based configuration management

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use recipe_core::constants::{endpoints, pictures, ports};
use tracing::{info, warn};

/// Signing key used when none is configured outside production
pub const DEVELOPMENT_TOKEN_SIGN_KEY: &str = "development-only-token-sign-key";

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development: seed data, `OpenAPI` docs, default signing key
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from a `sqlite:` URL or a bare file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite://").or_else(|| s.strip_prefix("sqlite:")).unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/recipes.db"),
        }
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Public HTTP API port
    pub http_port: u16,
    /// Internal HTTP port (notification trigger)
    pub internal_port: u16,
    /// Prefix of every public route
    pub base_path: String,
    /// Prefix of every internal route
    pub internal_path: String,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token and password configuration
    pub auth: AuthConfig,
    /// Picture processing configuration
    pub pictures: PictureConfig,
    /// Outgoing mail configuration
    pub mail: MailConfig,
    /// Notification digest configuration
    pub notifications: NotificationConfig,
    /// CORS allowed origins (`*` allows any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database location
    pub url: DatabaseUrl,
    /// Insert demo data into an empty development database
    pub seed_demo_data: bool,
}

/// Token and password configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret for access and refresh tokens
    pub token_sign_key: String,
    /// Lifetime of access tokens
    pub token_validity: Duration,
    /// Lifetime of refresh tokens
    pub refresh_token_validity: Duration,
    /// How long a password reset key stays usable
    pub reset_link_validity: Duration,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_sign_key: DEVELOPMENT_TOKEN_SIGN_KEY.to_owned(),
            token_validity: Duration::from_secs(60 * 60),
            refresh_token_validity: Duration::from_secs(30 * 24 * 60 * 60),
            reset_link_validity: Duration::from_secs(12 * 60 * 60),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Picture processing configuration
#[derive(Debug, Clone, Copy)]
pub struct PictureConfig {
    /// Bounding box edge of stored pictures
    pub image_dimension: u32,
    /// Edge of square thumbnails
    pub thumbnail_dimension: u32,
    /// Largest accepted upload body
    pub max_upload_bytes: usize,
}

impl Default for PictureConfig {
    fn default() -> Self {
        Self {
            image_dimension: pictures::DEFAULT_IMAGE_DIMENSION,
            thumbnail_dimension: pictures::DEFAULT_THUMBNAIL_DIMENSION,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Outgoing mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP relay host; mail is only logged when unset
    pub host: Option<String>,
    /// SMTP port
    pub port: u16,
    /// Use implicit TLS instead of STARTTLS
    pub secure: bool,
    /// SMTP user
    pub user: Option<String>,
    /// SMTP password
    pub password: Option<String>,
    /// Sender address
    pub from: String,
    /// Public URL of the web client, used in links
    pub app_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            secure: false,
            user: None,
            password: None,
            from: "Recipes <recipes@localhost>".to_owned(),
            app_url: "http://localhost:3000".to_owned(),
        }
    }
}

/// Notification digest configuration
#[derive(Debug, Clone, Copy)]
pub struct NotificationConfig {
    /// Recipes created within this many days are announced
    pub range_days: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { range_days: 1 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            http_port: ports::DEFAULT_HTTP_PORT,
            internal_port: ports::DEFAULT_INTERNAL_PORT,
            base_path: endpoints::API_BASE.to_owned(),
            internal_path: endpoints::INTERNAL_BASE.to_owned(),
            database: DatabaseConfig {
                url: DatabaseUrl::default(),
                seed_demo_data: true,
            },
            auth: AuthConfig::default(),
            pictures: PictureConfig::default(),
            mail: MailConfig::default(),
            notifications: NotificationConfig::default(),
            cors_origins: vec!["*".to_owned()],
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result fails validation
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let defaults = Self::default();
        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development"));

        let config = Self {
            environment,
            http_port: env_parse("PORT", defaults.http_port)?,
            internal_port: env_parse("INTERNAL_PORT", defaults.internal_port)?,
            base_path: normalize_base_path(&env_var_or("BASE_PATH", &defaults.base_path)),
            internal_path: normalize_base_path(&env_var_or("INTERNAL_PATH", &defaults.internal_path)),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_or_else(|_| DatabaseUrl::default(), |url| DatabaseUrl::parse_url(&url)),
                seed_demo_data: env_parse("SEED_DEMO_DATA", environment.is_development())?,
            },
            auth: AuthConfig {
                token_sign_key: env_var_or("TOKEN_SIGN_KEY", ""),
                token_validity: env_duration("TOKEN_VALIDITY", "1h", SECOND)?,
                refresh_token_validity: env_duration("REFRESH_TOKEN_VALIDITY", "30d", SECOND)?,
                reset_link_validity: env_duration("RESET_LINK_VALIDITY", "12", HOUR)?,
                bcrypt_cost: env_parse("BCRYPT_COST", defaults.auth.bcrypt_cost)?,
            },
            pictures: PictureConfig {
                image_dimension: env_parse("IMAGE_DIMENSION", defaults.pictures.image_dimension)?,
                thumbnail_dimension: env_parse(
                    "THUMBNAIL_DIMENSION",
                    defaults.pictures.thumbnail_dimension,
                )?,
                max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", defaults.pictures.max_upload_bytes)?,
            },
            mail: MailConfig {
                host: env_optional("EMAIL_HOST"),
                port: env_parse("EMAIL_PORT", defaults.mail.port)?,
                secure: env_parse("EMAIL_SECURE", defaults.mail.secure)?,
                user: env_optional("EMAIL_USER"),
                password: env_optional("EMAIL_PASS"),
                from: env_var_or("EMAIL_FROM", &defaults.mail.from),
                app_url: env_var_or("APP_URL", &defaults.mail.app_url),
            },
            notifications: NotificationConfig {
                range_days: env_parse("NOTIFICATION_RANGE_DAYS", defaults.notifications.range_days)?,
            },
            cors_origins: parse_origins(&env_var_or("CORS_ORIGINS", "*")),
        };

        let config = config.with_development_sign_key();
        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Fall back to the development signing key outside production
    fn with_development_sign_key(mut self) -> Self {
        if self.auth.token_sign_key.is_empty() && !self.environment.is_production() {
            warn!("TOKEN_SIGN_KEY not set, using the development signing key");
            DEVELOPMENT_TOKEN_SIGN_KEY.clone_into(&mut self.auth.token_sign_key);
        }
        self
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.http_port == self.internal_port {
            return Err(anyhow::anyhow!("PORT and INTERNAL_PORT cannot be the same"));
        }

        if self.auth.token_sign_key.is_empty() {
            return Err(anyhow::anyhow!("TOKEN_SIGN_KEY must be set"));
        }

        if self.environment.is_production() && self.auth.token_sign_key == DEVELOPMENT_TOKEN_SIGN_KEY {
            return Err(anyhow::anyhow!(
                "TOKEN_SIGN_KEY must not use the development key in production"
            ));
        }

        if self.pictures.image_dimension == 0 || self.pictures.thumbnail_dimension == 0 {
            return Err(anyhow::anyhow!(
                "IMAGE_DIMENSION and THUMBNAIL_DIMENSION must be positive"
            ));
        }

        if self.notifications.range_days < 1 {
            return Err(anyhow::anyhow!("NOTIFICATION_RANGE_DAYS must be at least 1"));
        }

        if self.mail.host.is_none() {
            warn!("EMAIL_HOST not set, outgoing mail will only be logged");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Recipe Server Configuration:\n\
             - Environment: {}\n\
             - HTTP Port: {} ({})\n\
             - Internal Port: {} ({})\n\
             - Database: {}\n\
             - Token Validity: {}\n\
             - Refresh Token Validity: {}\n\
             - Picture Dimensions: {}px / thumbnail {}px\n\
             - Mail: {}\n\
             - CORS Origins: {}",
            self.environment,
            self.http_port,
            self.base_path,
            self.internal_port,
            self.internal_path,
            if self.database.url.is_memory() {
                "SQLite (memory)"
            } else {
                "SQLite"
            },
            humantime::format_duration(self.auth.token_validity),
            humantime::format_duration(self.auth.refresh_token_validity),
            self.pictures.image_dimension,
            self.pictures.thumbnail_dimension,
            self.mail.host.as_deref().unwrap_or("log only"),
            self.cors_origins.join(", "),
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get a non-empty environment variable
fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {value}")),
        Err(_) => Ok(default),
    }
}

const SECOND: Duration = Duration::from_secs(1);
const HOUR: Duration = Duration::from_secs(3600);

/// Read a duration variable; a bare number counts in `unit`
fn env_duration(key: &str, default: &str, unit: Duration) -> Result<Duration> {
    let value = env_var_or(key, default);
    parse_duration(&value, unit).with_context(|| format!("Invalid {key} value: {value}"))
}

/// Parse a human-readable duration such as `1h` or `30d`
///
/// A bare integer such as `12` is a count of `unit`, so `RESET_LINK_VALIDITY=12`
/// means twelve hours and `TOKEN_VALIDITY=3600` means one hour.
///
/// # Errors
///
/// Returns an error if the value is not a valid duration
pub fn parse_duration(value: &str, unit: Duration) -> Result<Duration> {
    let value = value.trim();
    if let Ok(count) = value.parse::<u32>() {
        return Ok(unit * count);
    }
    Ok(humantime::parse_duration(value)?)
}

/// Ensure a route prefix starts with `/` and has no trailing slash
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::from_str_or_default("production"), Environment::Production);
        assert_eq!(Environment::from_str_or_default("PROD"), Environment::Production);
        assert_eq!(Environment::from_str_or_default("test"), Environment::Testing);
        assert_eq!(Environment::from_str_or_default("dev"), Environment::Development);
        assert_eq!(Environment::from_str_or_default("invalid"), Environment::Development);
    }

    #[test]
    fn test_database_url_parsing() {
        let sqlite_url = DatabaseUrl::parse_url("sqlite:./test.db");
        assert_eq!(sqlite_url.to_connection_string(), "sqlite:./test.db");

        assert!(DatabaseUrl::parse_url("sqlite::memory:").is_memory());
        assert!(!DatabaseUrl::parse_url("./some/path.db").is_memory());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("http://localhost:3000, https://app.example.com"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h", SECOND).unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("30d", SECOND).unwrap(), Duration::from_secs(30 * 86_400));
        assert!(parse_duration("soon", SECOND).is_err());
    }

    #[test]
    fn test_bare_numbers_use_the_variable_unit() {
        assert_eq!(parse_duration("12", HOUR).unwrap(), Duration::from_secs(12 * 3600));
        assert_eq!(parse_duration(" 900 ", SECOND).unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("90m", HOUR).unwrap(), Duration::from_secs(90 * 60));
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("api/"), "/api");
        assert_eq!(normalize_base_path("/api/v1"), "/api/v1");
        assert_eq!(normalize_base_path("/"), "");
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.internal_port = config.http_port;
        assert!(config.validate().is_err());
        config.internal_port = ports::DEFAULT_INTERNAL_PORT;

        config.environment = Environment::Production;
        assert!(config.validate().is_err(), "development key rejected in production");

        config.auth.token_sign_key = "a-real-production-secret".to_owned();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_overrides() {
        env::set_var("TOKEN_VALIDITY", "15m");
        env::set_var("RESET_LINK_VALIDITY", "2");
        env::set_var("EMAIL_HOST", "smtp.example.com");
        env::set_var("EMAIL_PASS", "secret");
        env::set_var("BASE_PATH", "recipes-api/");
        env::set_var("ENVIRONMENT", "testing");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.auth.token_validity, Duration::from_secs(15 * 60));
        assert_eq!(config.auth.reset_link_validity, Duration::from_secs(2 * 3600));
        assert_eq!(config.mail.host.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.mail.password.as_deref(), Some("secret"));
        assert_eq!(config.base_path, "/recipes-api");
        assert_eq!(config.auth.token_sign_key, DEVELOPMENT_TOKEN_SIGN_KEY);
        assert!(!config.database.seed_demo_data);

        env::remove_var("TOKEN_VALIDITY");
        env::remove_var("RESET_LINK_VALIDITY");
        env::remove_var("EMAIL_HOST");
        env::remove_var("EMAIL_PASS");
        env::remove_var("BASE_PATH");
        env::remove_var("ENVIRONMENT");
    }
}
