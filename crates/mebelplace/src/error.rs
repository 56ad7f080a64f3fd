//! CLI error types with miette diagnostics.
//!
//! Maps API, cache and config errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use mebelplace_config::ConfigError;
use mebelplace_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const RATE_LIMITED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the MebelPlace API")]
    #[diagnostic(
        code(mebelplace::connection_failed),
        help(
            "Check your network connection and the API URL.\n\
             Reason: {reason}\n\
             Override with --api-url or MEBELPLACE_API_URL."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not logged in")]
    #[diagnostic(code(mebelplace::not_logged_in), help("Run: mebelplace login"))]
    NotLoggedIn,

    #[error("Session expired")]
    #[diagnostic(
        code(mebelplace::session_expired),
        help("The refresh token was rejected. Run: mebelplace login")
    )]
    SessionExpired,

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(mebelplace::auth_failed),
        help("Check your phone number and password, then run: mebelplace login")
    )]
    AuthFailed { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Not found: {message}")]
    #[diagnostic(code(mebelplace::not_found))]
    NotFound { message: String },

    #[error("Rate limited: {message}")]
    #[diagnostic(
        code(mebelplace::rate_limited),
        help("Retry after {retry_after}.")
    )]
    RateLimited {
        message: String,
        retry_after: String,
    },

    #[error("API error (HTTP {status}): {message}")]
    #[diagnostic(code(mebelplace::api_error))]
    Api { status: u16, message: String },

    #[error("Unexpected response from the API: {message}")]
    #[diagnostic(code(mebelplace::invalid_response))]
    InvalidResponse { message: String },

    #[error("Request cancelled")]
    #[diagnostic(code(mebelplace::cancelled))]
    Cancelled,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mebelplace::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(mebelplace::config),
        help("Inspect the file with: mebelplace config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(mebelplace::json), help("Check the JSON body and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(mebelplace::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotLoggedIn | Self::SessionExpired | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── API / core error mapping ─────────────────────────────────────────

impl From<mebelplace_api::Error> for CliError {
    fn from(err: mebelplace_api::Error) -> Self {
        if err.is_session_expired() {
            return Self::SessionExpired;
        }

        match err {
            mebelplace_api::Error::Http {
                status: 401,
                message,
                ..
            } => Self::AuthFailed { message },
            mebelplace_api::Error::Http {
                status: 404,
                message,
                ..
            } => Self::NotFound { message },
            mebelplace_api::Error::Http {
                status: 429,
                message,
                retry_after,
                ..
            } => Self::RateLimited {
                message,
                retry_after: retry_after
                    .map_or_else(|| "a moment".into(), |d| format!("{}s", d.as_secs())),
            },
            mebelplace_api::Error::Http {
                status, message, ..
            } => Self::Api { status, message },
            mebelplace_api::Error::Network { message } => Self::ConnectionFailed { reason: message },
            mebelplace_api::Error::Unknown { message } => Self::InvalidResponse { message },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(api) => api.into(),
            CoreError::Cancelled => Self::Cancelled,
        }
    }
}
