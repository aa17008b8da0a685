use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2id cost parameters used when hashing new passwords.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// `None` switches to the log-only mailer.
    pub smtp: Option<SmtpConfig>,
    pub from_email: String,
    pub from_name: String,
    /// Origin of the frontend that serves `/password/resetPasswordPage/<id>`.
    /// This service does not render that page itself.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub download_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub gateway: GatewayConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "expense-tracker"),
            audience: env_or("JWT_AUDIENCE", "expense-tracker-users"),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60 * 24),
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or("PASSWORD_MEMORY_KIB", defaults.memory_kib),
            iterations: parse_or("PASSWORD_ITERATIONS", defaults.iterations),
            parallelism: parse_or("PASSWORD_PARALLELISM", defaults.parallelism),
        };

        let gateway = GatewayConfig {
            key_id: required("RAZORPAY_KEY_ID")?,
            key_secret: required("RAZORPAY_KEY_SECRET")?,
            base_url: env_or("RAZORPAY_BASE_URL", "https://api.razorpay.com"),
            amount: parse_or("PREMIUM_AMOUNT", 1000),
            currency: env_or("PREMIUM_CURRENCY", "INR"),
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", 587),
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
            }),
            Err(_) => None,
        };
        let mail = MailConfig {
            smtp,
            from_email: env_or("MAIL_FROM_EMAIL", "noreply@localhost"),
            from_name: env_or("MAIL_FROM_NAME", "Expense Tracker"),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:8080"),
        };

        let storage = StorageConfig {
            endpoint: required("S3_ENDPOINT")?,
            bucket: required("S3_BUCKET")?,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: env_or("S3_REGION", "us-east-1"),
            download_ttl_secs: parse_or("DOWNLOAD_URL_TTL_SECS", 600),
        };

        Ok(Self {
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            host: env_or("APP_HOST", "0.0.0.0"),
            port: parse_or("APP_PORT", 8080),
            jwt,
            password,
            gateway,
            mail,
            storage,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
