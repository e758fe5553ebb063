//! # Bot Configuration Module
//!
//! Runtime settings read from the environment (optionally seeded from a
//! `.env` file), plus the recovery and upload limits used by the Google
//! clients.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_SHEET_NAME: &str = "Sheet1";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 300;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024; // Bot API download limit

/// Recovery configuration for calls to remote services
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts for idempotent reads
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single HTTP request in seconds
    pub operation_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            operation_timeout_secs: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl RecoveryConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Which record store backs the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sheets,
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" | "google" => Ok(Self::Sheets),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Where Google bearer tokens come from. Minting them is done outside the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Fixed token
    Static(String),
    /// File re-read on every request, so an external refresher can rotate it
    File(PathBuf),
}

/// Spreadsheet coordinates
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// Numeric sheet id, needed for row deletion
    pub sheet_gid: i64,
}

/// Drive folders receiving uploaded documents
#[derive(Debug, Clone, Default)]
pub struct FolderConfig {
    pub testimonials: String,
    pub education: String,
}

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub backend: StoreBackend,
    pub sheets: Option<SheetsConfig>,
    pub google_token: Option<TokenSource>,
    pub database_url: Option<String>,
    pub folders: FolderConfig,
    pub rating_webhook_url: Option<String>,
    pub admin_user_ids: Vec<u64>,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub max_upload_bytes: u64,
    pub recovery: RecoveryConfig,
}

impl BotConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let telegram_token = require("TELEGRAM_BOT_TOKEN")?;

        let backend = match get("STORE_BACKEND") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "STORE_BACKEND".to_string(),
                message,
            })?,
            None => StoreBackend::Sheets,
        };

        let google_token = match (get("GOOGLE_ACCESS_TOKEN"), get("GOOGLE_ACCESS_TOKEN_FILE")) {
            (Some(token), _) => Some(TokenSource::Static(token)),
            (None, Some(path)) => Some(TokenSource::File(PathBuf::from(path))),
            (None, None) => None,
        };

        let sheets = match backend {
            StoreBackend::Sheets => {
                if google_token.is_none() {
                    return Err(ConfigError::MissingEnvVar(
                        "GOOGLE_ACCESS_TOKEN or GOOGLE_ACCESS_TOKEN_FILE".to_string(),
                    ));
                }
                Some(SheetsConfig {
                    spreadsheet_id: require("SPREADSHEET_ID")?,
                    sheet_name: get("SHEET_NAME").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
                    sheet_gid: parse_or("SHEET_GID", get("SHEET_GID"), 0)?,
                })
            }
            _ => None,
        };

        let database_url = match backend {
            StoreBackend::Postgres => Some(require("DATABASE_URL")?),
            _ => get("DATABASE_URL"),
        };

        let folders = FolderConfig {
            testimonials: get("TESTIMONIAL_FOLDER_ID").unwrap_or_default(),
            education: get("EDUCATION_FOLDER_ID").unwrap_or_default(),
        };

        let admin_user_ids = match get("ADMIN_USER_IDS") {
            Some(raw) => parse_id_list(&raw).map_err(|message| ConfigError::InvalidValue {
                key: "ADMIN_USER_IDS".to_string(),
                message,
            })?,
            None => Vec::new(),
        };

        let session_ttl_secs = parse_or("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), DEFAULT_SESSION_TTL_SECS)?;
        let sweep_secs = parse_or(
            "SESSION_SWEEP_SECS",
            get("SESSION_SWEEP_SECS"),
            DEFAULT_SESSION_SWEEP_SECS,
        )?;
        if session_ttl_secs == 0 || sweep_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SESSION_TTL_SECS/SESSION_SWEEP_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            telegram_token,
            backend,
            sheets,
            google_token,
            database_url,
            folders,
            rating_webhook_url: get("RATING_WEBHOOK_URL"),
            admin_user_ids,
            session_ttl: Duration::from_secs(session_ttl_secs),
            session_sweep_interval: Duration::from_secs(sweep_secs),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES)?,
            recovery: RecoveryConfig::default(),
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parse a comma or whitespace separated list of user ids
fn parse_id_list(raw: &str) -> Result<Vec<u64>, String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().map_err(|e| format!("'{s}': {e}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_memory_backend_needs_only_token() {
        let config = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("STORE_BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.backend, StoreBackend::Memory);
        assert!(config.sheets.is_none());
        assert_eq!(config.session_ttl, Duration::from_secs(DEFAULT_SESSION_TTL_SECS));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.rating_webhook_url.is_none());
    }

    #[test]
    fn test_sheets_backend_is_default() {
        let config = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("SPREADSHEET_ID", "sheet-1"),
            ("GOOGLE_ACCESS_TOKEN_FILE", "/run/token"),
            ("SHEET_GID", "42"),
            ("ADMIN_USER_IDS", "1, 2 3"),
        ]))
        .unwrap();

        assert_eq!(config.backend, StoreBackend::Sheets);
        let sheets = config.sheets.unwrap();
        assert_eq!(sheets.sheet_name, DEFAULT_SHEET_NAME);
        assert_eq!(sheets.sheet_gid, 42);
        assert_eq!(config.google_token, Some(TokenSource::File(PathBuf::from("/run/token"))));
        assert_eq!(config.admin_user_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_values_are_reported() {
        let err = BotConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TELEGRAM_BOT_TOKEN"));

        let err = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("STORE_BACKEND", "postgres"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "DATABASE_URL"));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("STORE_BACKEND", "memory"),
            ("SESSION_TTL_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SESSION_TTL_SECS"));

        let err = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("STORE_BACKEND", "excel"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "STORE_BACKEND"));
    }
}
