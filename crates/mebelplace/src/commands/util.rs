//! Shared helpers for command handlers.

use std::path::Path;

use secrecy::SecretString;

use crate::cli::BodyArgs;
use crate::error::CliError;

/// Split a `KEY=VALUE` argument.
pub fn parse_pair(raw: &str, field: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(CliError::Validation {
            field: field.into(),
            reason: format!("expected KEY=VALUE, got {raw:?}"),
        }),
    }
}

pub fn parse_pairs(raw: &[String], field: &str) -> Result<Vec<(String, String)>, CliError> {
    raw.iter().map(|pair| parse_pair(pair, field)).collect()
}

/// Read and parse a JSON file for `--data-file`.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "data-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// The request body from `--data` or `--data-file`, if any.
pub fn read_body(body: &BodyArgs) -> Result<Option<serde_json::Value>, CliError> {
    if let Some(ref inline) = body.data {
        let value = serde_json::from_str(inline).map_err(|e| CliError::Validation {
            field: "data".into(),
            reason: format!("invalid JSON: {e}"),
        })?;
        return Ok(Some(value));
    }
    body.data_file.as_deref().map(read_json_file).transpose()
}

/// Use the supplied password or prompt for one without echo.
pub fn resolve_password(supplied: Option<&str>) -> Result<SecretString, CliError> {
    if let Some(password) = supplied {
        return Ok(SecretString::from(password.to_owned()));
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(SecretString::from(password))
}
