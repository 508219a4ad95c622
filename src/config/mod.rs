//! Configuration module - environment variable parsing
//!
//! Required:
//! - `DATABASE_URL` - PostgreSQL connection string
//! - `JWT_SECRET` - HS256 signing secret for access/refresh tokens
//!
//! Optional (with defaults):
//! - `PORT` / `SERVER_ADDR` - bind address (default 0.0.0.0:8080)
//! - `LOG_LEVEL` - tracing filter (default info)
//! - `ACCESS_TOKEN_TTL_SECS` - access token lifetime (default 900)
//! - `REFRESH_TOKEN_TTL_SECS` - refresh token lifetime (default 604800)
//! - `REDIS_HOST` / `REDIS_PORT` / `REDIS_DB` - item cache location
//! - `CACHE_TTL_SECS` - item cache entry lifetime (default 300)
//! - `CACHE_INVALIDATE_ON_WRITE` - drop cache entries on update/delete (default true)
//! - `CLIENT_ORIGIN` - allowed CORS origin(s), comma-separated

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// JWT signing secret for token issuance and verification
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: u64,

    /// Redis host for the item cache
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Redis logical database index
    pub redis_db: u32,
    /// Item cache entry TTL in seconds
    pub cache_ttl_secs: u64,
    /// Drop an item's cache entry after a successful update/delete.
    /// `false` reproduces serve-stale-until-TTL behavior.
    pub cache_invalidate_on_write: bool,

    /// Allowed client origin(s) for CORS (comma-separated)
    pub client_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            access_token_ttl_secs: parse_or("ACCESS_TOKEN_TTL_SECS", 900)?,
            refresh_token_ttl_secs: parse_or("REFRESH_TOKEN_TTL_SECS", 604_800)?,

            redis_host: env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            redis_port: parse_or("REDIS_PORT", 6379)?,
            redis_db: parse_or("REDIS_DB", 0)?,
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", 300)?,
            cache_invalidate_on_write: parse_or("CACHE_INVALIDATE_ON_WRITE", true)?,

            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    /// Connection URL for the item cache
    pub fn redis_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        )
    }
}

/// Parse an environment variable, falling back to a default when unset
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_addr: "127.0.0.1:8080".parse().unwrap(),
            log_level: "info".to_string(),
            database_url: "postgres://localhost/inventory".to_string(),
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604_800,
            redis_host: "cache.internal".to_string(),
            redis_port: 6380,
            redis_db: 2,
            cache_ttl_secs: 300,
            cache_invalidate_on_write: true,
            client_origin: "http://localhost:3000".to_string(),
        }
    }

    #[test]
    fn redis_url_includes_host_port_and_db_index() {
        let config = test_config();
        assert_eq!(config.redis_url(), "redis://cache.internal:6380/2");
    }
}
