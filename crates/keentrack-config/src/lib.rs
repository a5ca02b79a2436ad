//! Shared configuration for the keentrack daemon.
//!
//! TOML config file, `KEENETIC_`-prefixed environment overrides,
//! credential resolution (env + keyring + plaintext), and translation
//! to `keentrack_core::TrackerConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keentrack_core::TrackerConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured (set router.username and a password source)")]
    NoCredentials,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// The single tracked router.
    #[serde(default)]
    pub router: RouterSection,
}

/// `[router]` table.
#[derive(Debug, Deserialize, Serialize)]
pub struct RouterSection {
    /// Router command endpoint.
    #[serde(default = "default_url")]
    pub url: String,

    /// Digest auth username.
    pub username: Option<String>,

    /// Digest auth password (plaintext — prefer env var or keyring).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Poll interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// DHCP pool queried for lease bindings.
    #[serde(default = "default_pool")]
    pub dhcp_pool: String,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            password_env: None,
            interval: default_interval(),
            timeout: default_timeout(),
            dhcp_pool: default_pool(),
        }
    }
}

fn default_url() -> String {
    "http://192.168.1.1/ci".into()
}
fn default_interval() -> u64 {
    10
}
fn default_timeout() -> u64 {
    30
}
fn default_pool() -> String {
    "_WEBADMIN".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "keentrack", "keentrack").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("keentrack");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults + file + environment.
///
/// Environment variables use the `KEENETIC_` prefix with `_`-separated
/// nesting, e.g. `KEENETIC_ROUTER_USERNAME`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("KEENETIC_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load from the canonical config path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config, returning defaults if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the router password from the credential chain.
pub fn resolve_password(router: &RouterSection) -> Result<SecretString, ConfigError> {
    // 1. Named env var from the config
    if let Some(ref env_name) = router.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Conventional env var
    if let Ok(val) = std::env::var("KEENETIC_PASSWORD") {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new("keentrack", "router/password") {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = router.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials)
}

// ── Translation to TrackerConfig ────────────────────────────────────

/// Build a `TrackerConfig` from the loaded config.
pub fn to_tracker_config(cfg: &Config) -> Result<TrackerConfig, ConfigError> {
    let router = &cfg.router;

    let url: url::Url = router.url.parse().map_err(|_| ConfigError::Validation {
        field: "router.url".into(),
        reason: format!("invalid URL: {}", router.url),
    })?;

    let username = router
        .username
        .clone()
        .or_else(|| std::env::var("KEENETIC_USERNAME").ok())
        .ok_or(ConfigError::NoCredentials)?;

    let password = resolve_password(router)?;

    Ok(TrackerConfig {
        url,
        username,
        password,
        poll_interval_secs: router.interval,
        timeout: Duration::from_secs(router.timeout),
        dhcp_pool: router.dhcp_pool.clone(),
    })
}
