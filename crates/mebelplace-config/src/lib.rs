//! Shared configuration for MebelPlace clients.
//!
//! TOML config file, `MEBELPLACE_*` environment overrides, and translation
//! into `mebelplace_api::TransportConfig` plus a durable credential storage
//! backend. The CLI adds flag-aware wrappers on top.

mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use url::Url;

use mebelplace_api::transport::DEFAULT_BASE_URL;
use mebelplace_api::{CredentialStorage, MemoryStorage, TlsMode, TransportConfig};

pub use storage::{FileStorage, KEYRING_SERVICE, KeyringStorage};

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "MEBELPLACE_CONFIG";
/// Prefix for environment overrides (`MEBELPLACE_API_URL`, `MEBELPLACE_DEFAULTS__TIMEOUT`, ...).
pub const ENV_PREFIX: &str = "MEBELPLACE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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

/// Where the access/refresh pair is persisted between runs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CredentialBackend {
    /// JSON file in the platform data directory.
    #[default]
    File,
    /// OS keyring (Keychain, Secret Service, Credential Manager).
    Keyring,
    /// Nothing persisted; every run starts logged out.
    Memory,
}

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// API root, e.g. `https://mebelplace.com.kz/api/v2`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub credential_store: CredentialBackend,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            credential_store: CredentialBackend::default(),
            ca_cert: None,
            defaults: Defaults::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_output() -> String {
    "plain".into()
}
fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Parse and validate `api_url`.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self.api_url.parse().map_err(|e| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL {:?}: {e}", self.api_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    /// Transport settings: base URL, TLS mode and timeout.
    pub fn transport(&self) -> Result<TransportConfig, ConfigError> {
        let tls = if self.defaults.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        Ok(TransportConfig::new(self.base_url()?)
            .with_tls(tls)
            .with_timeout(Duration::from_secs(self.defaults.timeout)))
    }

    /// The durable storage backend selected by `credential_store`.
    pub fn credential_storage(&self) -> Arc<dyn CredentialStorage> {
        match self.credential_store {
            CredentialBackend::File => Arc::new(FileStorage::new(credentials_path())),
            CredentialBackend::Keyring => Arc::new(KeyringStorage::new()),
            CredentialBackend::Memory => Arc::new(MemoryStorage::new()),
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("kz", "mebelplace", "mebelplace")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("mebelplace");
    p
}

/// Resolve the config file path: `MEBELPLACE_CONFIG`, else the platform config dir.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// File used by [`FileStorage`] when `credential_store = "file"`.
pub fn credentials_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("credentials.json"),
        |dirs| dirs.data_dir().join("credentials.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from `path` layered under `MEBELPLACE_*` environment overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}
