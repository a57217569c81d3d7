//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONSOLE_BASE_URL` - Public URL of the console (decides `Secure` cookies)
//!
//! ## Optional
//! - `CONSOLE_HOST` - Bind address (default: 127.0.0.1)
//! - `CONSOLE_PORT` - Listen port (default: 3000)
//! - `SERVICEFLOW_API_BASE` - ServiceFlow REST API root
//!   (default: <http://localhost:8000/api/v1>)
//! - `SERVICEFLOW_API_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `CONSOLE_CACHE_TTL_SECS` - Lifetime of cached API reads (default: 30)
//! - `CONSOLE_STATIC_DIR` - Static asset directory (default: crates/console/static)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - 0.0 to 1.0 (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default ServiceFlow API root.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";

const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Console application configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the console
    pub base_url: String,
    /// ServiceFlow REST API settings
    pub api: ApiConfig,
    /// How long API reads stay cached
    pub cache_ttl: Duration,
    /// Directory served under `/static`
    pub static_dir: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// ServiceFlow REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API root, e.g. `http://localhost:8000/api/v1`
    pub base_url: Url,
    /// Timeout applied to every request
    pub timeout: Duration,
}

impl ApiConfig {
    /// API settings pointing at `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_api_base(base_url)?,
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
        })
    }
}

impl ConsoleConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = env_or("CONSOLE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CONSOLE_HOST".to_string(), e.to_string()))?;
        let port = env_or("CONSOLE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CONSOLE_PORT".to_string(), e.to_string()))?;
        let base_url = lookup("CONSOLE_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("CONSOLE_BASE_URL".to_string()))?;

        let api_base = parse_api_base(&env_or("SERVICEFLOW_API_BASE", DEFAULT_API_BASE))?;
        let timeout_secs = parse_secs(
            "SERVICEFLOW_API_TIMEOUT_SECS",
            lookup("SERVICEFLOW_API_TIMEOUT_SECS"),
            DEFAULT_API_TIMEOUT_SECS,
        )?;
        let cache_ttl_secs = parse_secs(
            "CONSOLE_CACHE_TTL_SECS",
            lookup("CONSOLE_CACHE_TTL_SECS"),
            DEFAULT_CACHE_TTL_SECS,
        )?;

        let sentry_sample_rate = lookup("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = lookup("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            api: ApiConfig {
                base_url: api_base,
                timeout: Duration::from_secs(timeout_secs),
            },
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            static_dir: env_or("CONSOLE_STATIC_DIR", "crates/console/static"),
            sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the console is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Parse and validate the API root. A trailing slash is stripped so paths
/// can be appended verbatim.
fn parse_api_base(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| {
        ConfigError::InvalidEnvVar("SERVICEFLOW_API_BASE".to_string(), e.to_string())
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SERVICEFLOW_API_BASE".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}

fn parse_secs(key: &str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    value.map_or(Ok(default), |v| {
        v.parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
