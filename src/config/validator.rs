//! Settings validation: values that parse but cannot be used.

use crate::config::Settings;
use crate::error::ConfigError;

/// Ten years.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Schema names are interpolated (quoted) into DDL, so they must be plain identifiers.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if !is_valid_identifier(&settings.db_schema) {
        return Err(ConfigError::InvalidValue {
            key: "DB_SCHEMA",
            value: settings.db_schema.clone(),
        });
    }
    if settings.db_max_connections == 0 {
        return Err(ConfigError::InvalidValue {
            key: "DB_MAX_CONNECTIONS",
            value: "0".into(),
        });
    }
    if settings.session_ttl_hours <= 0 || settings.session_ttl_hours > MAX_SESSION_TTL_HOURS {
        return Err(ConfigError::InvalidValue {
            key: "SESSION_TTL_HOURS",
            value: settings.session_ttl_hours.to_string(),
        });
    }
    if settings.password_iterations == 0 {
        return Err(ConfigError::InvalidValue {
            key: "PASSWORD_ITERATIONS",
            value: "0".into(),
        });
    }
    if settings.admin_username.is_some() != settings.admin_password.is_some() {
        return Err(ConfigError::Load(
            "ADMIN_USERNAME and ADMIN_PASSWORD must be set together".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_valid_identifier("bookshelf"));
        assert!(is_valid_identifier("_tmp2"));
        assert!(!is_valid_identifier("2shelf"));
        assert!(!is_valid_identifier("shelf; drop"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn session_ttl_bounds() {
        let ttl = |hours| Settings {
            session_ttl_hours: hours,
            ..Settings::default()
        };
        assert!(validate(&ttl(1)).is_ok());
        assert!(validate(&ttl(MAX_SESSION_TTL_HOURS)).is_ok());
        assert!(matches!(
            validate(&ttl(MAX_SESSION_TTL_HOURS + 1)),
            Err(ConfigError::InvalidValue { key: "SESSION_TTL_HOURS", .. })
        ));
        assert!(validate(&ttl(0)).is_err());
        assert!(validate(&ttl(3_000_000_000_000)).is_err());
    }

    #[test]
    fn admin_credentials_come_in_pairs() {
        let settings = Settings {
            admin_username: Some("root".into()),
            ..Settings::default()
        };
        assert!(matches!(validate(&settings), Err(ConfigError::Load(_))));
    }
}
