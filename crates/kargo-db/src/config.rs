//! Database configuration
//!
//! The presence of `DATABASE_URL` selects the networked Postgres backend;
//! otherwise the embedded SQLite file at `DB_PATH` is used.

use chrono_tz::Tz;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default per-statement deadline.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default IANA zone for calendar-day semantics.
pub const DEFAULT_TIME_ZONE: &str = "Africa/Douala";

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("failed to parse environment variable {variable}: {message}")]
    ParseError { variable: String, message: String },
}

/// Which backend the URL selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Postgres,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub backend: BackendKind,
    pub max_connections: u32,
    pub statement_timeout: Duration,
    pub time_zone: Tz,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let _ = dotenvy::dotenv();

        let (url, backend) = match env::var("DATABASE_URL") {
            Ok(url) => (url, BackendKind::Postgres),
            Err(_) => {
                let path = env::var("DB_PATH").unwrap_or_else(|_| "kargo.db".to_string());
                (format!("sqlite://{}?mode=rwc", path), BackendKind::Sqlite)
            }
        };

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().map_err(|e| DbConfigError::ParseError {
                variable: "DATABASE_MAX_CONNECTIONS".to_string(),
                message: format!("{}", e),
            })?,
            Err(_) => 10,
        };

        let time_zone = time_zone_from_env()?;

        Ok(Self {
            url,
            backend,
            max_connections,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            time_zone,
        })
    }

    /// A SQLite configuration for the given file path.
    pub fn sqlite(path: &str) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path),
            backend: BackendKind::Sqlite,
            max_connections: 10,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            time_zone: DEFAULT_TIME_ZONE.parse().expect("valid default zone"),
        }
    }
}

fn time_zone_from_env() -> Result<Tz, DbConfigError> {
    let raw = env::var("TIME_ZONE").unwrap_or_else(|_| DEFAULT_TIME_ZONE.to_string());
    raw.parse().map_err(|_| DbConfigError::ParseError {
        variable: "TIME_ZONE".to_string(),
        message: format!("unknown IANA time zone {:?}", raw),
    })
}
