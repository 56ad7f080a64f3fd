// ── Core error types ──
//
// API failures pass through unchanged so callers can still branch on
// status, code and `Retry-After`. The cache layer adds only cancellation.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] mebelplace_api::Error),

    /// Interest was withdrawn before the fetch resolved; nothing was applied.
    #[error("request cancelled before it resolved")]
    Cancelled,
}

impl CoreError {
    /// The underlying API error, if any.
    pub fn api(&self) -> Option<&mebelplace_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api().is_some_and(mebelplace_api::Error::is_unauthorized)
    }
}
