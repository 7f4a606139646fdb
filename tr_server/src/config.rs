//! Server configuration management.
//!
//! Every environment variable is read here once at startup and validated
//! before the server binds.

use std::{net::SocketAddr, time::Duration};
use ton_rewards::{db::DatabaseConfig, wallet::Funds};

const DEFAULT_BIND: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 8080);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address
    pub bind: SocketAddr,
    pub database: DatabaseConfig,
    /// HS256 secret shared with the identity service
    pub jwt_secret: String,
    /// Seed balances of newly registered wallets
    pub starting_funds: Funds,
    pub leaderboard_cache_ttl: Duration,
    pub stats_cache_ttl: Duration,
    /// Prometheus scrape listener; disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Bind address from the command line
    /// * `database_url_override` - Database URL from the command line
    ///
    /// # Errors
    ///
    /// Returns error if `JWT_SECRET` is missing or a set variable does not parse
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DatabaseConfig::development().database_url);

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 2)?,
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 10)?,
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 600)?,
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800)?,
        };

        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use the HS256 secret of the identity service".to_string(),
        })?;

        let starting_funds = Funds {
            gems: parse_env_or("STARTING_GEMS", 100)?,
            diamonds: parse_env_or("STARTING_DIAMONDS", 10)?,
            ..Funds::zero()
        };

        Ok(ServerConfig {
            bind,
            database,
            jwt_secret,
            starting_funds,
            leaderboard_cache_ttl: Duration::from_secs(parse_env_or(
                "LEADERBOARD_CACHE_TTL_SECS",
                300,
            )?),
            stats_cache_ttl: Duration::from_secs(parse_env_or("STATS_CACHE_TTL_SECS", 60)?),
            metrics_bind: parse_env("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.starting_funds.gems < 0 {
            return Err(ConfigError::Invalid {
                var: "STARTING_GEMS".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        if self.starting_funds.diamonds < 0 {
            return Err(ConfigError::Invalid {
                var: "STARTING_DIAMONDS".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an optional variable; a set but malformed value is an error
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_env(key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            database: DatabaseConfig::new("test"),
            jwt_secret: "a".repeat(32),
            starting_funds: ton_rewards::users::DEFAULT_STARTING_FUNDS,
            leaderboard_cache_ttl: Duration::from_secs(300),
            stats_cache_ttl: Duration::from_secs(60),
            metrics_bind: None,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Ask the identity team".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Ask the identity team"));
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let config = ServerConfig {
            jwt_secret: "short".to_string(),
            ..config()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    fn test_pool_bounds_rejected() {
        let mut config = config();
        config.database.min_connections = config.database.max_connections + 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_negative_starting_balance_rejected() {
        let config = ServerConfig {
            starting_funds: Funds::gems(-1),
            ..config()
        };
        assert!(config.validate().is_err());
    }
}
