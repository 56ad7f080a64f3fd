use std::time::Duration;

use thiserror::Error;

/// Error code attached to the terminal 401 surfaced after a failed refresh.
pub const SESSION_EXPIRED_CODE: &str = "SESSION_EXPIRED";

/// Top-level error type for the `mebelplace-api` crate.
///
/// A closed taxonomy: the server answered with a non-2xx status, no answer
/// arrived at all, or the answer could not be understood. Every layer below
/// the facade returns these as values; `mebelplace-core` wraps them
/// transparently.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The server responded with a non-2xx status.
    ///
    /// 401 is consumed by the refresh coordinator where possible; 429 carries
    /// the parsed `Retry-After` so callers can back off (never auto-retried).
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        code: Option<String>,
        details: Option<serde_json::Value>,
        retry_after: Option<Duration>,
    },

    /// No response reached the client (DNS, connect, timeout, reset).
    #[error("Network error: {message}")]
    Network { message: String },

    /// A response arrived but its body did not match the envelope contract.
    #[error("Unexpected response: {message}")]
    Unknown { message: String },
}

/// Discriminant of [`Error`], for branching without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Http,
    Network,
    Unknown,
}

impl Error {
    /// The terminal authorization error surfaced once the session is gone.
    pub(crate) fn session_expired() -> Self {
        Self::Http {
            status: 401,
            message: "session expired -- please log in again".into(),
            code: Some(SESSION_EXPIRED_CODE.into()),
            details: None,
            retry_after: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http { .. } => ErrorKind::Http,
            Self::Network { .. } => ErrorKind::Network,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for HTTP 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns `true` when the refresh cycle failed and the store was cleared.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Http { code: Some(code), .. } if code == SESSION_EXPIRED_CODE)
    }

    /// Returns `true` for HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Back-off hint from a 429 response's `Retry-After` header.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error a caller may choose to retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. }) || self.is_rate_limited()
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Extract the backend error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
