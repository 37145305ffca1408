//! Runtime settings read from the environment (and `.env`).

pub mod validator;

pub use validator::*;

use crate::auth::password::DEFAULT_ITERATIONS;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SCHEMA: &str = "bookshelf";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Two weeks.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 336;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub db_schema: String,
    pub db_max_connections: u32,
    pub session_ttl_hours: i64,
    pub body_limit_bytes: usize,
    pub password_iterations: u32,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_schema: DEFAULT_SCHEMA.to_string(),
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            password_iterations: DEFAULT_ITERATIONS,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();
        let settings = Settings {
            database_url: get("DATABASE_URL"),
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", defaults.bind_addr)?,
            db_schema: get("DB_SCHEMA").unwrap_or(defaults.db_schema),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            session_ttl_hours: parse_or(get("SESSION_TTL_HOURS"), "SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            body_limit_bytes: parse_or(get("BODY_LIMIT_BYTES"), "BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
            password_iterations: parse_or(get("PASSWORD_ITERATIONS"), "PASSWORD_ITERATIONS", defaults.password_iterations)?,
            admin_username: get("ADMIN_USERNAME"),
            admin_password: get("ADMIN_PASSWORD"),
        };
        validate(&settings)?;
        Ok(settings)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = from(&[]).unwrap();
        assert!(s.database_url.is_none());
        assert_eq!(s.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(s.db_schema, "bookshelf");
        assert_eq!(s.session_ttl_hours, 336);
        assert_eq!(s.body_limit_bytes, 1_048_576);
    }

    #[test]
    fn reads_overrides() {
        let s = from(&[
            ("DATABASE_URL", "postgres://localhost/shelf"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_PASSWORD", "   "),
        ])
        .unwrap();
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/shelf"));
        assert_eq!(s.bind_addr.port(), 8080);
        assert_eq!(s.db_max_connections, 12);
        assert_eq!(s.admin_username.as_deref(), Some("root"));
        assert!(s.admin_password.is_none());
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = from(&[("SESSION_TTL_HOURS", "forever")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "SESSION_TTL_HOURS", .. }));
    }
}
