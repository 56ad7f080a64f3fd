//! Config subcommand handlers.

use std::str::FromStr;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, CredentialBackend};
use crate::error::CliError;
use crate::output::{self, Printer};

const VALID_KEYS: &str =
    "api_url, credential_store, ca_cert, defaults.output, defaults.insecure, defaults.timeout";

// ── Helpers ─────────────────────────────────────────────────────────

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Apply one `key = value` assignment to the config.
fn set_value(cfg: &mut Config, key: &str, value: &str) -> Result<(), CliError> {
    match key {
        "api_url" | "api-url" => {
            let previous = std::mem::replace(&mut cfg.api_url, value.to_owned());
            if let Err(e) = cfg.base_url() {
                cfg.api_url = previous;
                return Err(e.into());
            }
        }
        "credential_store" | "credential-store" => {
            cfg.credential_store = CredentialBackend::from_str(value)
                .map_err(|_| invalid("credential_store", "must be 'file', 'keyring', or 'memory'"))?;
        }
        "ca_cert" | "ca-cert" => cfg.ca_cert = Some(value.into()),
        "defaults.output" | "output" => {
            <OutputFormat as clap::ValueEnum>::from_str(value, true).map_err(|_| {
                invalid("defaults.output", "must be 'json', 'json-compact', 'yaml', or 'plain'")
            })?;
            cfg.defaults.output = value.to_ascii_lowercase();
        }
        "defaults.insecure" | "insecure" => {
            cfg.defaults.insecure = value
                .parse()
                .map_err(|_| invalid("defaults.insecure", "must be 'true' or 'false'"))?;
        }
        "defaults.timeout" | "timeout" => {
            cfg.defaults.timeout = value
                .parse()
                .map_err(|_| invalid("defaults.timeout", "must be a number (seconds)"))?;
        }
        other => {
            return Err(invalid(
                other,
                format!("unknown config key '{other}'. Valid keys: {VALID_KEYS}"),
            ));
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::needless_pass_by_value)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::resolve(global)?;
            let printer = Printer::new(config::output_format(global, &cfg), global.color, global.quiet);
            let mut value = serde_json::to_value(&cfg)?;
            value["config_file"] = config::config_path().display().to_string().into();
            value["credentials_file"] = match cfg.credential_store {
                CredentialBackend::File => config::credentials_path().display().to_string().into(),
                CredentialBackend::Keyring | CredentialBackend::Memory => serde_json::Value::Null,
            };
            printer.value(&value)
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            set_value(&mut cfg, &key, &value)?;
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} = {value}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_known_keys() {
        let mut cfg = Config::default();
        set_value(&mut cfg, "api_url", "http://localhost:3000/api/v2").unwrap();
        set_value(&mut cfg, "credential_store", "keyring").unwrap();
        set_value(&mut cfg, "defaults.timeout", "5").unwrap();
        set_value(&mut cfg, "output", "JSON").unwrap();

        assert_eq!(cfg.api_url, "http://localhost:3000/api/v2");
        assert_eq!(cfg.credential_store, CredentialBackend::Keyring);
        assert_eq!(cfg.defaults.timeout, 5);
        assert_eq!(cfg.defaults.output, "json");
    }

    #[test]
    fn rejects_bad_values_and_keeps_previous() {
        let mut cfg = Config::default();
        let before = cfg.api_url.clone();
        assert!(set_value(&mut cfg, "api_url", "ftp://nope").is_err());
        assert_eq!(cfg.api_url, before);

        assert!(set_value(&mut cfg, "defaults.timeout", "soon").is_err());
        assert!(set_value(&mut cfg, "credential_store", "vault").is_err());
        assert!(matches!(
            set_value(&mut cfg, "profile", "x"),
            Err(CliError::Validation { .. })
        ));
    }
}
