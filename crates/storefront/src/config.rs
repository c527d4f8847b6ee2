//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_URL` - Origin of the remote storefront API (every request is prefixed with it)
//!
//! ## Optional
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `STOREFRONT_QUERY_CACHE_TTL_SECS` - Query cache time-to-live (default: 300)
//! - `STOREFRONT_QUERY_CACHE_CAPACITY` - Query cache entry limit (default: 1000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_QUERY_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_QUERY_CACHE_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote API origin.
    pub api: ApiConfig,
    /// Query cache sizing.
    pub query_cache: QueryCacheConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto.
    pub base_url: Url,
    /// Timeout applied to each request.
    pub request_timeout: Duration,
}

/// Query cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct QueryCacheConfig {
    /// Maximum number of cached queries.
    pub max_capacity: u64,
    /// How long a cached query stays fresh.
    pub time_to_live: Duration,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_QUERY_CACHE_CAPACITY,
            time_to_live: Duration::from_secs(DEFAULT_QUERY_CACHE_TTL_SECS),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `API_URL` is missing or any variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let query_cache = QueryCacheConfig {
            max_capacity: get_parsed_env_or_default(
                "STOREFRONT_QUERY_CACHE_CAPACITY",
                DEFAULT_QUERY_CACHE_CAPACITY,
            )?,
            time_to_live: Duration::from_secs(get_parsed_env_or_default(
                "STOREFRONT_QUERY_CACHE_TTL_SECS",
                DEFAULT_QUERY_CACHE_TTL_SECS,
            )?),
        };

        Ok(Self {
            api,
            query_cache,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Build a configuration for the given API origin with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an absolute
    /// http(s) URL.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiConfig {
                base_url: parse_api_url(api_url)?,
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            query_cache: QueryCacheConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_api_url(&get_required_env("API_URL")?)?;
        let request_timeout = Duration::from_secs(get_parsed_env_or_default(
            "STOREFRONT_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        Ok(Self {
            base_url,
            request_timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and normalize the API origin.
///
/// A trailing slash is appended so relative endpoint paths are joined beneath
/// any path prefix (`https://host/api` + `cart/1` = `https://host/api/cart/1`).
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("API_URL".to_string(), reason);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get a numeric environment variable with a default value.
fn get_parsed_env_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let url = parse_api_url("https://api.farmerspot.ng/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.farmerspot.ng/v1/");
        assert_eq!(
            url.join("cart/abc").unwrap().as_str(),
            "https://api.farmerspot.ng/v1/cart/abc"
        );
    }

    #[test]
    fn test_api_url_origin_only() {
        let url = parse_api_url("http://localhost:8080").unwrap();
        assert_eq!(url.join("items").unwrap().as_str(), "http://localhost:8080/items");
    }

    #[test]
    fn test_api_url_rejects_other_schemes() {
        let err = parse_api_url("ftp://example.org").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "API_URL"));
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_for_api_url_defaults() {
        let config = StorefrontConfig::for_api_url("http://127.0.0.1:3000").unwrap();
        assert_eq!(config.api.request_timeout, Duration::from_secs(10));
        assert_eq!(config.query_cache.max_capacity, 1000);
        assert_eq!(config.query_cache.time_to_live, Duration::from_secs(300));
        assert!(config.sentry_dsn.is_none());
    }
}
