//! Process settings read once at startup from the environment (`.env` honoured by the binary).

use crate::error::ConfigError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct DbSettings {
    /// Full connection URL; overrides the individual parts when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Pool capacity: simultaneously open connections never exceed this.
    pub max_connections: u32,
    /// How long a request waits for a free pooled connection.
    pub acquire_timeout: Duration,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: String::new(),
            database: "sample".into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl DbSettings {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: url.clone(),
                reason: e.to_string(),
            });
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database))
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub db: DbSettings,
    pub listen_addr: String,
    pub body_limit: usize,
    /// Create the database and tables on startup when missing.
    pub auto_migrate: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db: DbSettings::default(),
            listen_addr: "0.0.0.0:3000".into(),
            body_limit: 1024 * 1024,
            auto_migrate: true,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let db = DbSettings {
            url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            host: lookup("DB_HOST").unwrap_or(defaults.db.host),
            port: parse_or(&lookup, "DB_PORT", defaults.db.port)?,
            user: lookup("DB_USER").unwrap_or(defaults.db.user),
            password: lookup("DB_PASSWORD").unwrap_or(defaults.db.password),
            database: lookup("DB_NAME").unwrap_or(defaults.db.database),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db.max_connections)?,
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db.acquire_timeout.as_secs(),
            )?),
        };
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".into(),
                reason: "pool capacity must be at least 1".into(),
            });
        }
        Ok(Settings {
            db,
            listen_addr: lookup("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            body_limit: parse_or(&lookup, "BODY_LIMIT_BYTES", defaults.body_limit)?,
            auto_migrate: parse_or(&lookup, "AUTO_MIGRATE", defaults.auto_migrate)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.db.host, "localhost");
        assert_eq!(s.db.database, "sample");
        assert_eq!(s.db.max_connections, 5);
        assert_eq!(s.listen_addr, "0.0.0.0:3000");
        assert!(s.auto_migrate);
        assert!(s.db.url.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let s = settings(&[
            ("DB_PORT", "6543"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "3"),
            ("AUTO_MIGRATE", "false"),
        ])
        .unwrap();
        assert_eq!(s.db.port, 6543);
        assert_eq!(s.db.max_connections, 12);
        assert_eq!(s.db.acquire_timeout, Duration::from_secs(3));
        assert!(!s.auto_migrate);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = settings(&[("DB_PORT", "fivefourthreetwo")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_PORT", .. }));
        let err = settings(&[("DB_MAX_CONNECTIONS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. }));
    }

    #[test]
    fn url_overrides_parts() {
        let s = settings(&[("DATABASE_URL", "postgres://u:p@db.internal:5433/sales")]).unwrap();
        let opts = s.db.connect_options().unwrap();
        assert_eq!(opts.get_host(), "db.internal");
        assert_eq!(opts.get_port(), 5433);
        assert_eq!(opts.get_database(), Some("sales"));
    }
}
