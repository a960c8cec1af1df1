//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG.get().expect("Config not initialized. Call salon_common::config::init() first.")
}

/// Install an already-built configuration (used by tests and embedders).
pub fn install(cfg: AppConfig) -> &'static AppConfig {
    CONFIG.get_or_init(|| cfg)
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cfg = defaults()?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (SALON__SERVER__PORT, SALON__DATABASE__URL, etc.)
        .add_source(
            config::Environment::with_prefix("SALON")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(install(app_config))
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.gateway_port", 8081)?
        .set_default("server.public_url", "http://localhost:8080")?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 2)?
        .set_default("auth.access_token_ttl_secs", 3600)? // 1 hour
        .set_default("auth.refresh_token_ttl_secs", 1_209_600)? // 14 days
        .set_default("auth.cookie_secure", false)?
        .set_default("storage.endpoint", "http://localhost:9000")?
        .set_default("storage.bucket", "salon-images")?
        .set_default("storage.access_key", "")?
        .set_default("storage.secret_key", "")?
        .set_default("storage.region", "us-east-1")?
        .set_default("payment.base_url", "https://api.xendit.co")?
        .set_default("payment.secret_key", "")?
        .set_default("payment.callback_token", "")?
        .set_default("payment.success_redirect_url", "http://localhost:3000/payment/success")?
        .set_default("payment.failure_redirect_url", "http://localhost:3000/payment/failed")?
        .set_default("payment.invoice_duration_secs", 86_400)?
        .set_default("payment.currency", "PHP")?
        .set_default("schedule.opening_hour", 10)?
        .set_default("schedule.closing_hour", 17)?
        .set_default("schedule.utc_offset_minutes", 480)?
        .set_default("limits.max_image_bytes", 5_242_880)? // 5MB
        .set_default("limits.default_page_size", 20)?
        .set_default("limits.max_page_size", 100)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub payment: PaymentConfig,
    /// SMTP relay. Omit the section entirely to disable outbound email.
    pub smtp: Option<SmtpConfig>,
    pub schedule: ScheduleConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub gateway_port: u16,
    /// Externally reachable base URL, used in outbound emails.
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (HS256) — should be 256+ bits of entropy
    pub jwt_secret: String,
    /// Access token TTL in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token TTL in seconds
    pub refresh_token_ttl_secs: u64,
    /// Mark auth cookies `Secure` (set in production behind TLS)
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// S3 endpoint URL (e.g., http://localhost:9000 for MinIO)
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Public CDN base URL; image URLs are built from it when set.
    pub public_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Invoice API base URL
    pub base_url: String,
    /// API secret key, sent as the basic-auth username
    pub secret_key: String,
    /// Shared token the provider echoes in `x-callback-token` on webhooks
    pub callback_token: String,
    pub success_redirect_url: String,
    pub failure_redirect_url: String,
    pub invoice_duration_secs: u64,
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// First bookable hour of the day (24h clock)
    pub opening_hour: u32,
    /// Hour at which the last slot must have ended
    pub closing_hour: u32,
    /// Salon wall-clock offset from UTC, in minutes
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_image_bytes: usize,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl ScheduleConfig {
    /// Current wall-clock time at the salon.
    pub fn local_now(&self) -> chrono::NaiveDateTime {
        let offset = chrono::Duration::minutes(i64::from(self.utc_offset_minutes));
        (chrono::Utc::now() + offset).naive_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_section_but_secrets() {
        let cfg = defaults()
            .and_then(|b| b.set_override("database.url", "postgres://localhost/salon"))
            .and_then(|b| b.set_override("auth.jwt_secret", "secret"))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize::<AppConfig>())
            .expect("defaults should deserialize");

        assert_eq!(cfg.schedule.opening_hour, 10);
        assert_eq!(cfg.schedule.closing_hour, 17);
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.smtp.is_none());
        assert!(cfg.storage.public_url.is_none());
    }
}
