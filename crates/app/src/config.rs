//! App configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPI_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOPI_BASE_URL` - Public URL of the app (used for the OAuth redirect)
//! - `SHOPI_SESSION_SECRET` - Cookie session secret (min 32 chars)
//! - `SHOPIFY_API_KEY` - App client ID from the Partner dashboard
//! - `SHOPIFY_API_SECRET` - App client secret (signs session tokens and OAuth HMACs)
//!
//! ## Optional
//! - `SHOPI_HOST` - Bind address (default: 0.0.0.0)
//! - `SHOPI_PORT` / `PORT` - Listen port (default: 3000)
//! - `SCOPES` - Comma-separated OAuth scopes (default: `write_products,read_themes,write_themes`)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-01)
//! - `SHOPIFY_FALLBACK_API_VERSION` - Version retried when an asset upload 404s (default: 2024-10)
//! - `SHOPIFY_API_ENDPOINT` - Override for `https://{shop}` (proxies, tests)
//! - `SHOPI_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `SHOPI_TLS_CERT` - PEM-encoded certificate chain
//! - `SHOPI_TLS_KEY` - PEM-encoded private key

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Scopes requested when `SCOPES` is unset. Theme writes need both theme scopes.
pub const DEFAULT_SCOPES: &str = "write_products,read_themes,write_themes";
/// Default Admin API version.
pub const DEFAULT_API_VERSION: &str = "2025-01";
/// Default fallback Admin API version for asset uploads.
pub const DEFAULT_FALLBACK_API_VERSION: &str = "2024-10";

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

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the app
    pub base_url: String,
    /// Cookie session secret
    pub session_secret: SecretString,
    /// Shopify app configuration
    pub shopify: ShopifyAppConfig,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Shopify app credentials and API settings.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// OAuth client ID (a.k.a. API key)
    pub api_key: String,
    /// OAuth client secret
    pub api_secret: SecretString,
    /// OAuth scopes requested at install time
    pub scopes: Vec<String>,
    /// Admin API version (e.g., 2025-01)
    pub api_version: String,
    /// Admin API version retried when an asset upload returns 404
    pub fallback_api_version: String,
    /// Base URL used instead of `https://{shop}` (proxies, tests)
    pub endpoint_override: Option<Url>,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("api_version", &self.api_version)
            .field("fallback_api_version", &self.fallback_api_version)
            .field("endpoint_override", &self.endpoint_override)
            .finish()
    }
}

impl ShopifyAppConfig {
    /// Build a config with default scopes and API versions.
    ///
    /// Useful for tests and tools that do not read the environment.
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: SecretString) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
            scopes: parse_scopes(DEFAULT_SCOPES),
            api_version: DEFAULT_API_VERSION.to_string(),
            fallback_api_version: DEFAULT_FALLBACK_API_VERSION.to_string(),
            endpoint_override: None,
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let endpoint_override = env::optional("SHOPIFY_API_ENDPOINT")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("SHOPIFY_API_ENDPOINT".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let scopes = parse_scopes(&env::or_default("SCOPES", DEFAULT_SCOPES));
        if scopes.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "SCOPES".to_string(),
                "at least one scope is required".to_string(),
            ));
        }

        Ok(Self {
            api_key: env::required("SHOPIFY_API_KEY")?,
            api_secret: API_SECRET_POLICY.load("SHOPIFY_API_SECRET")?,
            scopes,
            api_version: env::or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            fallback_api_version: env::or_default(
                "SHOPIFY_FALLBACK_API_VERSION",
                DEFAULT_FALLBACK_API_VERSION,
            ),
            endpoint_override,
        })
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = env::optional("SHOPI_TLS_CERT");
        let key_pem = env::optional("SHOPI_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SHOPI_TLS_*".to_string(),
                "Both SHOPI_TLS_CERT and SHOPI_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl AppConfig {
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

        let database_url = env::first_of(&["SHOPI_DATABASE_URL", "DATABASE_URL"])
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("SHOPI_DATABASE_URL".to_string()))?;
        let host: IpAddr = env::parsed("SHOPI_HOST", IpAddr::from([0, 0, 0, 0]))?;
        // Hosting platforms hand out the port as plain `PORT`
        let port = env::first_of(&["SHOPI_PORT", "PORT"])
            .map_or(Ok(3000), |raw| raw.parse::<u16>())
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPI_PORT".to_string(), e.to_string()))?;
        let base_url = env::required("SHOPI_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let session_secret = SESSION_SECRET_POLICY.load("SHOPI_SESSION_SECRET")?;

        let shopify = ShopifyAppConfig::from_env()?;
        let log_json = env::optional("SHOPI_LOG_JSON").is_some();
        let sentry_dsn = env::optional("SENTRY_DSN");
        let sentry_environment = env::optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env::parsed("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = env::parsed("SENTRY_TRACES_SAMPLE_RATE", 0.1)?;
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            shopify,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// OAuth redirect URI registered with Shopify.
    #[must_use]
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.base_url)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Split a comma-separated scope list, dropping blanks.
#[must_use]
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Rules a secret must satisfy before the app will start with it.
struct SecretPolicy {
    min_len: usize,
    reject_placeholders: bool,
    min_bits_per_char: f64,
}

/// Cookie session secret: long enough to sign with.
const SESSION_SECRET_POLICY: SecretPolicy = SecretPolicy {
    min_len: MIN_SESSION_SECRET_LENGTH,
    reject_placeholders: false,
    min_bits_per_char: 0.0,
};

/// Shopify client secret: must look randomly generated.
const API_SECRET_POLICY: SecretPolicy = SecretPolicy {
    min_len: 1,
    reject_placeholders: true,
    min_bits_per_char: MIN_ENTROPY_BITS_PER_CHAR,
};

impl SecretPolicy {
    fn check(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let insecure = |reason: String| Err(ConfigError::InsecureSecret(key.to_string(), reason));

        if value.len() < self.min_len {
            return insecure(format!(
                "must be at least {} characters (got {})",
                self.min_len,
                value.len()
            ));
        }

        if self.reject_placeholders {
            let lower = value.to_lowercase();
            if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
                return insecure(format!("appears to be a placeholder (contains '{pattern}')"));
            }
        }

        let bits = bits_per_char(value);
        if bits < self.min_bits_per_char {
            return insecure(format!(
                "entropy too low ({bits:.2} bits/char, need >= {:.1}). Use a randomly generated secret.",
                self.min_bits_per_char
            ));
        }
        Ok(())
    }

    /// Read `key` and check it.
    fn load(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = env::required(key)?;
        self.check(key, &value)?;
        Ok(SecretString::from(value))
    }
}

/// Shannon entropy of `s` in bits per character.
fn bits_per_char(s: &str) -> f64 {
    let mut counts: BTreeMap<char, u32> = BTreeMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }

    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Environment lookups. Empty values count as unset.
mod env {
    use std::fmt::Display;
    use std::str::FromStr;

    use super::ConfigError;

    pub fn optional(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    pub fn required(key: &str) -> Result<String, ConfigError> {
        optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    pub fn or_default(key: &str, default: &str) -> String {
        optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Value of the first variable in `keys` that is set.
    pub fn first_of(keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| optional(key))
    }

    /// Parse `key`, or fall back to `default` when unset.
    pub fn parsed<T>(key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        optional(key).map_or(Ok(default), |raw| {
            raw.parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}
