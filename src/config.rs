//! Configuration module for environment variables and application settings

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Errors that prevent the server from starting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}

/// Deployment environment, drives storage selection and debug routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Where user accounts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Process-local store, wiped on restart
    Memory,
    Postgres { url: String, max_connections: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Clone)]
pub struct Config {
    /// HMAC secret shared by access and refresh tokens
    pub jwt_secret: String,
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("server", &self.server)
            .field("storage", &self.storage.kind())
            .finish()
    }
}

impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageConfig::Memory => "In-Memory (Local)",
            StorageConfig::Postgres { .. } => "Database (PostgreSQL)",
        }
    }
}

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_MAX_CONNECTIONS: usize = 16;

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingVar("JWT_SECRET"))?;

        let environment = match lookup("APP_ENV").as_deref() {
            None | Some("") | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    name: "APP_ENV",
                    value: other.to_string(),
                });
            }
        };

        let host = match lookup("HOST") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "HOST",
                value: raw,
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        let force_local = lookup("USE_LOCAL_STORAGE").as_deref() == Some("true");

        let use_memory = !environment.is_production()
            && (force_local
                || database_url
                    .as_deref()
                    .is_none_or(|url| url.contains("localhost")));

        let storage = if use_memory {
            StorageConfig::Memory
        } else {
            StorageConfig::Postgres {
                url: database_url.ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    lookup("DATABASE_MAX_CONNECTIONS"),
                    DEFAULT_MAX_CONNECTIONS,
                )?,
            }
        };

        Ok(Self {
            jwt_secret,
            environment,
            server: ServerConfig { host, port },
            storage,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn missing_secret_is_fatal() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingVar("JWT_SECRET"));
        assert_eq!(
            load(&[("JWT_SECRET", "")]).unwrap_err(),
            ConfigError::MissingVar("JWT_SECRET")
        );
    }

    #[test]
    fn defaults_to_memory_storage_in_development() {
        let config = load(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.addr().to_string(), "0.0.0.0:5001");
    }

    #[test]
    fn localhost_database_falls_back_to_memory() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "postgres://u:p@localhost/db"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn remote_database_selects_postgres() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "postgres://u:p@db.internal/shop"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Postgres {
                url: "postgres://u:p@db.internal/shop".to_string(),
                max_connections: 4,
            }
        );
    }

    #[test]
    fn use_local_storage_overrides_remote_database() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "postgres://u:p@db.internal/shop"),
            ("USE_LOCAL_STORAGE", "true"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn production_always_uses_postgres() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("APP_ENV", "production"),
            ("USE_LOCAL_STORAGE", "true"),
            ("DATABASE_URL", "postgres://u:p@localhost/db"),
        ])
        .unwrap();
        assert!(matches!(config.storage, StorageConfig::Postgres { .. }));

        assert_eq!(
            load(&[("JWT_SECRET", "s"), ("APP_ENV", "production")]).unwrap_err(),
            ConfigError::MissingVar("DATABASE_URL")
        );
    }

    #[test]
    fn malformed_port_is_rejected() {
        assert_eq!(
            load(&[("JWT_SECRET", "s"), ("PORT", "eighty")]).unwrap_err(),
            ConfigError::InvalidVar {
                name: "PORT",
                value: "eighty".to_string(),
            }
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = load(&[("JWT_SECRET", "super-secret")]).unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
