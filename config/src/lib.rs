//! Configuration loading and parsing.
//!
//! Configuration lives in a TOML file at the platform config directory
//! (`<config dir>/gantry/config.toml`), overridable with the
//! `GANTRY_CONFIG` environment variable. Every section is optional; an
//! absent file is not an error.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

/// Environment variable naming an explicit config file path.
pub const CONFIG_ENV: &str = "GANTRY_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct GantryConfig {
    pub server: Option<ServerConfig>,
    pub session: Option<SessionConfig>,
    pub log: Option<LogConfig>,
}

impl GantryConfig {
    /// Address to listen on. Default: loopback on port 8080.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        self.server
            .as_ref()
            .and_then(|server| server.bind.clone())
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
    }

    /// Session cookie name. Default: `gantry_session`.
    #[must_use]
    pub fn session_cookie(&self) -> String {
        self.session
            .as_ref()
            .and_then(|session| session.cookie.clone())
            .unwrap_or_else(|| "gantry_session".to_string())
    }

    /// Session time-to-live in seconds. Default: 30 minutes.
    #[must_use]
    pub fn session_ttl_secs(&self) -> i64 {
        self.session
            .as_ref()
            .and_then(|session| session.ttl_secs)
            .unwrap_or(1800)
    }

    /// Log filter directive when none is set in the environment.
    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log.as_ref()?.filter.as_deref()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:3000".
    pub bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Cookie carrying the session id.
    pub cookie: Option<String>,
    /// Seconds a session survives without being touched.
    pub ttl_secs: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// tracing-subscriber filter directive, e.g. "gantry=debug,info".
    pub filter: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config at {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config at {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Default config file location, if a platform config dir exists.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("gantry").join("config.toml"))
}

/// Load the config file, `None` when there is none to load.
pub fn load() -> Result<Option<GantryConfig>, ConfigError> {
    let Some(path) = config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        return Ok(None);
    }
    load_from(&path).map(Some)
}

/// Load and parse a specific config file.
pub fn load_from(path: &Path) -> Result<GantryConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
