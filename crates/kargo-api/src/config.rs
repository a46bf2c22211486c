//! API configuration
//!
//! Loaded once from the environment at startup and treated as immutable.

use chrono::NaiveTime;
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is missing")]
    MissingVariable(String),
    #[error("failed to parse environment variable {variable}: {message}")]
    ParseError { variable: String, message: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub ingestion: IngestionConfig,
    pub report: ReportConfig,
    pub cors: CorsConfig,
    pub admin: AdminSeed,
    pub bridge: Option<BridgeSettings>,
    pub session: SessionConfig,
    pub time_zone: Tz,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Tenant used first when auto-provisioning unknown groups.
    pub default_agency_id: Option<i64>,
    /// When set, only this external group id is ingested.
    pub allowed_group: Option<String>,
    pub send_confirmations: bool,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub enabled: bool,
    /// Local wall-clock time of the daily summary.
    pub time: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// First-run super-admin credentials; both unset means no seeding.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Isolates the WhatsApp session directory per deployment.
    pub client_id: String,
    pub base_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();

        let server = ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("SERVER_PORT", 8080)?,
        };

        let auth = AuthConfig {
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::MissingVariable("JWT_SECRET".to_string()))?,
            jwt_expires_in: parse_or("JWT_EXPIRES_IN", 86_400)?,
        };

        let ingestion = IngestionConfig {
            default_agency_id: parse_optional("DEFAULT_AGENCY_ID")?,
            allowed_group: env::var("GROUP_ID").ok().filter(|v| !v.is_empty()),
            send_confirmations: parse_bool("SEND_CONFIRMATIONS", false)?,
        };

        let report = ReportConfig {
            enabled: parse_bool("REPORT_ENABLED", false)?,
            time: parse_report_time()?,
        };

        let cors = CorsConfig {
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
        };

        let admin = AdminSeed {
            email: env::var("ADMIN_EMAIL").ok(),
            password: env::var("ADMIN_PASSWORD").ok(),
        };

        let bridge = env::var("WA_BRIDGE_URL").ok().map(|url| BridgeSettings {
            url,
            token: env::var("WA_BRIDGE_TOKEN").ok(),
        });

        let session = SessionConfig {
            client_id: env::var("CLIENT_ID").unwrap_or_else(|_| "default".to_string()),
            base_dir: env::var("WA_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".wa-sessions")),
        };

        let time_zone = {
            let raw = env::var("TIME_ZONE")
                .unwrap_or_else(|_| kargo_db::config::DEFAULT_TIME_ZONE.to_string());
            raw.parse().map_err(|_| ConfigError::ParseError {
                variable: "TIME_ZONE".to_string(),
                message: format!("unknown IANA time zone {:?}", raw),
            })?
        };

        Ok(Self {
            server,
            auth,
            ingestion,
            report,
            cors,
            admin,
            bridge,
            session,
            time_zone,
        })
    }
}

fn parse_or<T: std::str::FromStr>(variable: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(variable) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::ParseError {
            variable: variable.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_optional<T: std::str::FromStr>(variable: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(variable) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::ParseError {
                variable: variable.to_string(),
                message: e.to_string(),
            }),
        _ => Ok(None),
    }
}

fn parse_bool(variable: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(ConfigError::ParseError {
                variable: variable.to_string(),
                message: format!("expected a boolean, got {:?}", other),
            }),
        },
        Err(_) => Ok(default),
    }
}

fn parse_report_time() -> Result<NaiveTime, ConfigError> {
    match env::var("REPORT_TIME") {
        Ok(raw) => NaiveTime::parse_from_str(&raw, "%H:%M").map_err(|_| ConfigError::ParseError {
            variable: "REPORT_TIME".to_string(),
            message: format!("expected HH:MM, got {:?}", raw),
        }),
        Err(_) => Ok(NaiveTime::from_hms_opt(20, 0, 0).expect("valid default time")),
    }
}
