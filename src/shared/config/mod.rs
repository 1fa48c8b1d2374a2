//! Application configuration module
//!
//! Provides the configuration types for the server and its integrations
//! (SMS gateway, SMTP, payment gateway). Values are usually populated from
//! the environment by `backend::server::config`, but the builder keeps tests
//! free of environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default port used when `SERVER_PORT` is not set
pub const DEFAULT_PORT: u16 = 3000;

/// Default SQLite database URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite:feedesk.db?mode=rwc";

/// SMS gateway credentials (Africa's Talking style API)
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Messaging endpoint
    pub api_url: String,
    /// Account username
    pub username: String,
    /// API key; `None` means messages are logged instead of sent
    pub api_key: Option<String>,
    /// Optional alphanumeric sender id
    pub sender_id: Option<String>,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.africastalking.com/version1/messaging".to_string(),
            username: "sandbox".to_string(),
            api_key: None,
            sender_id: None,
        }
    }
}

/// SMTP settings for outgoing email
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP server binds to
    pub port: u16,
    /// sqlx connection URL
    pub database_url: String,
    /// HMAC secret for JWT signing
    pub jwt_secret: String,
    /// Payment gateway secret used to verify webhook signatures
    pub gateway_secret: Option<String>,
    /// Name printed on receipts and messages
    pub school_name: String,
    /// SMS gateway settings
    pub sms: SmsConfig,
    /// SMTP settings; `None` disables email delivery
    pub smtp: Option<SmtpConfig>,
    /// TOML file with fee structures and deadlines to seed on start-up
    pub reference_data_path: Option<PathBuf>,
    /// Lifetime of an idle USSD session
    pub ussd_session_ttl: Duration,
    /// Lifetime of a one-time password
    pub otp_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            jwt_secret: String::new(),
            gateway_secret: None,
            school_name: "School".to_string(),
            sms: SmsConfig::default(),
            smtp: None,
            reference_data_path: None,
            ussd_session_ttl: Duration::from_secs(180),
            otp_ttl: Duration::from_secs(600),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingValue("JWT_SECRET"));
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("DATABASE_URL"));
        }
        if self.ussd_session_ttl.is_zero() || self.otp_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TTL",
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(smtp) = &self.smtp {
            if !smtp.from.contains('@') {
                return Err(ConfigError::InvalidValue {
                    key: "SMTP_FROM",
                    message: format!("'{}' is not an email address", smtp.from),
                });
            }
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    pub fn gateway_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.gateway_secret = Some(secret.into());
        self
    }

    pub fn school_name(mut self, name: impl Into<String>) -> Self {
        self.config.school_name = name.into();
        self
    }

    pub fn sms(mut self, sms: SmsConfig) -> Self {
        self.config.sms = sms;
        self
    }

    pub fn smtp(mut self, smtp: SmtpConfig) -> Self {
        self.config.smtp = Some(smtp);
        self
    }

    pub fn reference_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.reference_data_path = Some(path.into());
        self
    }

    pub fn ussd_session_ttl(mut self, ttl: Duration) -> Self {
        self.config.ussd_session_ttl = ttl;
        self
    }

    pub fn otp_ttl(mut self, ttl: Duration) -> Self {
        self.config.otp_ttl = ttl;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}
