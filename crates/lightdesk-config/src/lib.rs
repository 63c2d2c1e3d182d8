//! Shared configuration for lightdesk tools.
//!
//! TOML profiles layered with `LIGHTDESK_*` environment overrides, and
//! translation to `lightdesk_core::DeskConfig`. The CLI adds flag-aware
//! wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lightdesk_core::{DeskConfig, ReconnectConfig, TlsMode};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

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
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named lighting backends.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// REST request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Channel level coalescing window in milliseconds.
    #[serde(default = "default_channel_debounce_ms")]
    pub channel_debounce_ms: u64,

    /// Keep-alive ping period in seconds.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            channel_debounce_ms: default_channel_debounce_ms(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_channel_debounce_ms() -> u64 {
    100
}
fn default_ping_interval_secs() -> u64 {
    10
}

/// A named lighting backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// REST base URL (e.g., "http://desk.local:8080/").
    pub server: String,

    /// WebSocket URL override. Derived from `server` when unset.
    pub ws_url: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept any TLS certificate.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// First reconnect delay (milliseconds).
    pub reconnect_initial_ms: Option<u64>,

    /// Reconnect delay ceiling (milliseconds).
    pub reconnect_max_ms: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "lightdesk", "lightdesk").map_or_else(
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
    p.push("lightdesk");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys use `__` between levels, e.g.
/// `LIGHTDESK_DEFAULTS__TIMEOUT=5` or `LIGHTDESK_DEFAULT_PROFILE=stage`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LIGHTDESK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

impl Config {
    /// Pick a profile: the explicit name, else `default_profile`, else
    /// the only profile if there is exactly one.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let wanted = name.or(self.default_profile.as_deref());

        if let Some(wanted) = wanted {
            if let Some((key, profile)) = self.profiles.get_key_value(wanted) {
                return Ok((key.as_str(), profile));
            }
            // A stale default is not fatal when there is nothing to choose from.
            if name.is_some() || self.profiles.len() != 1 {
                return Err(ConfigError::UnknownProfile {
                    name: wanted.to_owned(),
                });
            }
        }

        let mut only = self.profiles.iter();
        match (only.next(), only.next()) {
            (Some((key, profile)), None) => Ok((key.as_str(), profile)),
            _ => Err(ConfigError::UnknownProfile {
                name: name.unwrap_or("default").to_owned(),
            }),
        }
    }
}

/// Build a `DeskConfig` from a profile and the global defaults.
pub fn profile_to_desk_config(profile: &Profile, defaults: &Defaults) -> Result<DeskConfig, ConfigError> {
    let base_url = parse_url("server", &profile.server)?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("expected http:// or https://, got {}", profile.server),
        });
    }

    let mut desk = DeskConfig::new(base_url);

    if let Some(ref raw) = profile.ws_url {
        let ws_url = parse_url("ws_url", raw)?;
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Validation {
                field: "ws_url".into(),
                reason: format!("expected ws:// or wss://, got {raw}"),
            });
        }
        desk.ws_url = Some(ws_url);
    }

    desk.tls = if profile.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    desk.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if defaults.channel_debounce_ms == 0 {
        return Err(ConfigError::Validation {
            field: "channel_debounce_ms".into(),
            reason: "must be at least 1".into(),
        });
    }
    desk.channel_debounce = Duration::from_millis(defaults.channel_debounce_ms);
    desk.ping_interval = Duration::from_secs(defaults.ping_interval_secs.max(1));

    let fallback = ReconnectConfig::default();
    let initial_delay = profile
        .reconnect_initial_ms
        .map_or(fallback.initial_delay, Duration::from_millis);
    let max_delay = profile
        .reconnect_max_ms
        .map_or(fallback.max_delay, Duration::from_millis);
    if initial_delay.is_zero() || max_delay < initial_delay {
        return Err(ConfigError::Validation {
            field: "reconnect".into(),
            reason: "reconnect_initial_ms must be non-zero and at most reconnect_max_ms".into(),
        });
    }
    desk.reconnect = ReconnectConfig {
        initial_delay,
        max_delay,
    };

    Ok(desk)
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}
