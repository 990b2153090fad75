//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PACANDE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PACANDE_JWT_SECRET` - Bearer token signing key (min 32 chars, high entropy)
//!
//! ## Optional
//! - `PACANDE_HOST` - Bind address (default: 127.0.0.1)
//! - `PACANDE_PORT` - Listen port (default: 5000)
//! - `PACANDE_ENV` - `production` or `development` (default: production)
//! - `PACANDE_TOKEN_TTL_MINUTES` - Bearer token lifetime, at most one year (default: 120)
//! - `PACANDE_CORS_ORIGINS` - Comma-separated allowed origins (default: `http://localhost:5173`)
//! - `SHIPPING_POLICY` - `flat` or `tiered` (default: flat)
//! - `SHIPPING_FLAT_COST` - Flat shipping cost (default: 10000)
//! - `SHIPPING_BASE_COST` - Tiered base cost (default: 15000)
//! - `SHIPPING_FREE_UNITS` - Units covered by the tiered base cost (default: 5)
//! - `SHIPPING_UNIT_SURCHARGE` - Tiered cost per extra unit (default: 2000)
//! - `PAYMENT_APPROVAL_RATE` - Simulated card approval probability (default: 0.9)
//! - `STEP_UP_TTL_SECONDS` - Lifetime of a password confirmation (default: 300)
//! - `CART_IDLE_MINUTES` - Idle expiry of server-held carts (default: 1440)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use pacande_core::pricing::ShippingPolicy;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Internal error details are hidden from clients.
    #[default]
    Production,
    /// Internal error details are returned to clients.
    Development,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Bearer token settings
    pub auth: AuthConfig,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Shipping charged at checkout and in cart totals
    pub shipping: ShippingPolicy,
    /// Probability that a simulated card payment is approved (0.0 - 1.0)
    pub payment_approval_rate: f64,
    /// How long a server-held cart survives without being touched
    pub cart_idle: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Authentication settings.
///
/// Implements `Debug` manually to redact the signing key.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing key for bearer tokens
    pub jwt_secret: SecretString,
    /// Bearer token lifetime
    pub token_ttl: Duration,
    /// How long a successful password confirmation authorizes one sensitive action
    pub step_up_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("step_up_ttl", &self.step_up_ttl)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("PACANDE_DATABASE_URL")?;
        let host = parse_env("PACANDE_HOST", "127.0.0.1")?;
        let port = parse_env("PACANDE_PORT", "5000")?;
        let environment = get_env_or_default("PACANDE_ENV", "production")
            .parse::<Environment>()
            .map_err(|e| ConfigError::InvalidEnvVar("PACANDE_ENV".to_string(), e))?;

        let auth = AuthConfig::from_env()?;
        let cors_origins = get_env_or_default("PACANDE_CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();
        let shipping = shipping_policy_from_env()?;

        let payment_approval_rate: f64 = parse_env("PAYMENT_APPROVAL_RATE", "0.9")?;
        if !(0.0..=1.0).contains(&payment_approval_rate) {
            return Err(ConfigError::InvalidEnvVar(
                "PAYMENT_APPROVAL_RATE".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }
        let cart_idle =
            Duration::from_secs(parse_env::<u64>("CART_IDLE_MINUTES", "1440")?.saturating_mul(60));

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            auth,
            cors_origins,
            shipping,
            payment_approval_rate,
            cart_idle,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether internal error details may be sent to clients.
    #[must_use]
    pub fn expose_error_details(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("PACANDE_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "PACANDE_JWT_SECRET")?;

        Ok(Self {
            jwt_secret,
            token_ttl: token_ttl(parse_env("PACANDE_TOKEN_TTL_MINUTES", "120")?)?,
            step_up_ttl: Duration::from_secs(parse_env("STEP_UP_TTL_SECONDS", "300")?),
        })
    }
}

/// Longest accepted bearer token lifetime, one year.
const MAX_TOKEN_TTL_MINUTES: u64 = 365 * 24 * 60;

fn token_ttl(minutes: u64) -> Result<Duration, ConfigError> {
    if minutes == 0 || minutes > MAX_TOKEN_TTL_MINUTES {
        return Err(ConfigError::InvalidEnvVar(
            "PACANDE_TOKEN_TTL_MINUTES".to_string(),
            format!("must be between 1 and {MAX_TOKEN_TTL_MINUTES}"),
        ));
    }
    Ok(Duration::from_secs(minutes * 60))
}

fn shipping_policy_from_env() -> Result<ShippingPolicy, ConfigError> {
    match get_env_or_default("SHIPPING_POLICY", "flat")
        .trim()
        .to_lowercase()
        .as_str()
    {
        "flat" => Ok(ShippingPolicy::Flat {
            cost: parse_amount("SHIPPING_FLAT_COST", "10000")?,
        }),
        "tiered" => Ok(ShippingPolicy::Tiered {
            base: parse_amount("SHIPPING_BASE_COST", "15000")?,
            free_units: parse_env("SHIPPING_FREE_UNITS", "5")?,
            unit_surcharge: parse_amount("SHIPPING_UNIT_SURCHARGE", "2000")?,
        }),
        other => Err(ConfigError::InvalidEnvVar(
            "SHIPPING_POLICY".to_string(),
            format!("expected flat or tiered, got {other}"),
        )),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
/// Database URL alone, for tools that do not need the full configuration.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `PACANDE_DATABASE_URL`
/// nor `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("PACANDE_DATABASE_URL")
}

fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a non-negative decimal amount.
fn parse_amount(key: &str, default: &str) -> Result<Decimal, ConfigError> {
    let amount: Decimal = parse_env(key, default)?;
    if amount.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(amount)
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
