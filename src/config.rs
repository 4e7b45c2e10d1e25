//! Environment-driven settings.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const APP_NAME: &str = "Heart Disease Risk Assessment API";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_LOG_FILE: &str = "logs/heartrisk.log";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub model_dir: PathBuf,
    pub cors_origins: CorsOrigins,
    pub require_manifest: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an unparseable variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an unparseable variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("HEARTRISK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
            var: "HEARTRISK_BIND_ADDR",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let cors_origins = match get("HEARTRISK_CORS_ORIGINS") {
            None => CorsOrigins::Any,
            Some(v) if v == "*" => CorsOrigins::Any,
            Some(v) => CorsOrigins::List(
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        };

        let log_mode = match get("HEARTRISK_LOG_MODE").as_deref() {
            None | Some("stdout") => LogMode::Stdout,
            Some("file") => LogMode::File,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "HEARTRISK_LOG_MODE",
                    value: other.to_string(),
                    reason: "expected 'stdout' or 'file'".into(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            model_dir: PathBuf::from(get("HEARTRISK_MODEL_DIR").unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string())),
            cors_origins,
            require_manifest: get("HEARTRISK_REQUIRE_MANIFEST").is_some_and(|v| parse_bool(&v)),
            log_mode,
            log_file: PathBuf::from(get("HEARTRISK_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())),
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
