//! CLI configuration: thin wrapper around `mebelplace_config`.
//!
//! Loads the shared config and layers `GlobalOpts` flag overrides
//! (--api-url, --insecure, --timeout) on top.

use clap::ValueEnum;

use mebelplace_api::ApiClient;
use mebelplace_core::QueryClient;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use mebelplace_config::{
    Config, CredentialBackend, config_path, credentials_path, load_config, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Load the config file and apply flag overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config()?;
    apply_overrides(&mut cfg, global);
    // Fail early on a bad URL, before any command runs.
    cfg.base_url()?;
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.api_url {
        cfg.api_url.clone_from(url);
    }
    if global.insecure {
        cfg.defaults.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.defaults.timeout = timeout;
    }
}

/// Output format: flag > config `defaults.output` > plain.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Plain)
}

/// Build the cached client, restoring the persisted session.
pub fn build_client(cfg: &Config) -> Result<QueryClient, CliError> {
    let transport = cfg.transport()?;
    let api = ApiClient::with_storage(&transport, cfg.credential_storage())?;
    Ok(QueryClient::new(api))
}
