/**
 * Server Configuration
 *
 * This module loads the application configuration from environment
 * variables (a `.env` file is read first by `main`).
 *
 * # Configuration Sources
 *
 * | Variable | Default |
 * |----------|---------|
 * | `SERVER_PORT` | 3000 |
 * | `DATABASE_URL` | `sqlite:feedesk.db?mode=rwc` |
 * | `JWT_SECRET` | required |
 * | `PAYSTACK_SECRET_KEY` | unset, webhooks answer 503 |
 * | `SMS_API_URL`, `SMS_USERNAME` | Africa's Talking, `sandbox` |
 * | `SMS_API_KEY` | unset, SMS are logged only |
 * | `SMS_SENDER_ID` | unset |
 * | `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` | unset, email is logged only |
 * | `SCHOOL_NAME` | `School` |
 * | `REFERENCE_DATA_PATH` | unset |
 * | `USSD_SESSION_TTL_SECS` | 180 |
 * | `OTP_TTL_SECS` | 600 |
 *
 * # Error Handling
 *
 * Missing required values and unparsable numbers are fatal: the server
 * refuses to start rather than run with a half-applied configuration.
 */

use std::path::PathBuf;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::backend::db;
use crate::shared::{AppConfig, ConfigError, SmsConfig, SmtpConfig, DEFAULT_DATABASE_URL, DEFAULT_PORT};

/// Read a variable through a lookup function, treating blank values as unset
fn lookup(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(get, key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key,
            message: format!("'{}' is not a valid number", raw),
        }),
        None => Ok(default),
    }
}

/// Build configuration from an arbitrary variable source
pub fn config_from_source(get: impl Fn(&str) -> Option<String>) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();

    let jwt_secret = lookup(&get, "JWT_SECRET").ok_or(ConfigError::MissingValue("JWT_SECRET"))?;

    let sms_defaults = SmsConfig::default();
    let sms = SmsConfig {
        api_url: lookup(&get, "SMS_API_URL").unwrap_or(sms_defaults.api_url),
        username: lookup(&get, "SMS_USERNAME").unwrap_or(sms_defaults.username),
        api_key: lookup(&get, "SMS_API_KEY"),
        sender_id: lookup(&get, "SMS_SENDER_ID"),
    };

    let smtp = match lookup(&get, "SMTP_HOST") {
        Some(host) => Some(SmtpConfig {
            host,
            username: lookup(&get, "SMTP_USERNAME").unwrap_or_default(),
            password: lookup(&get, "SMTP_PASSWORD").unwrap_or_default(),
            from: lookup(&get, "SMTP_FROM").ok_or(ConfigError::MissingValue("SMTP_FROM"))?,
        }),
        None => None,
    };

    let mut builder = AppConfig::builder()
        .port(parse_number(&get, "SERVER_PORT", DEFAULT_PORT)?)
        .database_url(lookup(&get, "DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()))
        .jwt_secret(jwt_secret)
        .school_name(lookup(&get, "SCHOOL_NAME").unwrap_or(defaults.school_name))
        .sms(sms)
        .ussd_session_ttl(Duration::from_secs(parse_number(
            &get,
            "USSD_SESSION_TTL_SECS",
            defaults.ussd_session_ttl.as_secs(),
        )?))
        .otp_ttl(Duration::from_secs(parse_number(&get, "OTP_TTL_SECS", defaults.otp_ttl.as_secs())?));

    if let Some(secret) = lookup(&get, "PAYSTACK_SECRET_KEY") {
        builder = builder.gateway_secret(secret);
    }
    if let Some(smtp) = smtp {
        builder = builder.smtp(smtp);
    }
    if let Some(path) = lookup(&get, "REFERENCE_DATA_PATH") {
        builder = builder.reference_data_path(PathBuf::from(path));
    }

    builder.build()
}

/// Load configuration from the process environment
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let config = config_from_source(|key| std::env::var(key).ok())?;

    if config.gateway_secret.is_none() {
        tracing::warn!("PAYSTACK_SECRET_KEY not set. Payment webhooks will be refused.");
    }
    if config.sms.api_key.is_none() {
        tracing::warn!("SMS_API_KEY not set. SMS messages will be logged only.");
    }
    if config.smtp.is_none() {
        tracing::warn!("SMTP_HOST not set. Emails will be logged only.");
    }
    Ok(config)
}

/// Open the database and seed reference data
///
/// Unlike optional integrations, the database is required: failure to
/// connect aborts start-up.
pub async fn load_database(config: &AppConfig) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("Connecting to database...");
    let pool = db::connect(&config.database_url).await?;
    tracing::info!("Database ready");

    if let Some(path) = &config.reference_data_path {
        match db::reference::seed_from_file(&pool, path).await {
            Ok(summary) => tracing::info!(
                "Seeded {} fee structures and {} deadlines from {}",
                summary.fee_structures,
                summary.deadlines,
                path.display()
            ),
            Err(e) => tracing::error!("Failed to seed reference data from {}: {}", path.display(), e),
        }
    }

    Ok(pool)
}
