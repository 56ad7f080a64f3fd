// Credential model and the process-wide credential store.
//
// The store is the single authoritative holder of the access/refresh pair.
// Reads go through an `ArcSwap`, so a reader always observes either the
// previous or the next credential in full, never a partially written one.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Fixed storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Fixed storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Fixed storage key for the access token expiry (RFC 3339).
pub const EXPIRES_AT_KEY: &str = "expires_at";

// ── Credential ───────────────────────────────────────────────────────

/// The access/refresh token pair for one session.
///
/// `Debug` output never contains token material.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(SecretString::from(access_token.into())),
            ..Self::default()
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.into()));
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// An access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// A refresh cycle is possible.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// The server-declared expiry has passed. Unknown expiry is never expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// `Authorization` header value, if an access token is present.
    pub(crate) fn bearer(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    /// Both credentials carry the same access token (or both carry none).
    pub(crate) fn same_access_token(&self, other: &Self) -> bool {
        match (&self.access_token, &other.access_token) {
            (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Plain serializable form of a [`Credential`], keyed by the fixed storage keys.
///
/// Only storage backends should ever hold one of these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Credential> for StoredCredential {
    fn from(credential: &Credential) -> Self {
        Self {
            access_token: credential
                .access_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            refresh_token: credential
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            expires_at: credential.expires_at,
        }
    }
}

impl From<StoredCredential> for Credential {
    fn from(stored: StoredCredential) -> Self {
        Self {
            access_token: stored.access_token.map(SecretString::from),
            refresh_token: stored.refresh_token.map(SecretString::from),
            expires_at: stored.expires_at,
        }
    }
}

// ── Durable storage ──────────────────────────────────────────────────

/// Failure reported by a [`CredentialStorage`] backend.
#[derive(Debug, Error)]
#[error("credential storage error: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Durable client-side storage for the credential pair.
///
/// Implemented in-memory here; file and OS keyring backends live in
/// `mebelplace-config`.
pub trait CredentialStorage: Send + Sync {
    /// Read the persisted credential, `None` if nothing was stored.
    fn load(&self) -> Result<Option<Credential>, StorageError>;

    fn save(&self, credential: &Credential) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

/// Non-durable storage. Used by tests and by sessions that must not persist.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<StoredCredential>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the slot, as if a previous process had saved it.
    pub fn with_credential(credential: &Credential) -> Self {
        Self {
            slot: Mutex::new(Some(StoredCredential::from(credential))),
        }
    }

    /// Raw view of what has been persisted.
    pub fn stored(&self) -> Option<StoredCredential> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| StorageError::new("memory slot poisoned"))?;
        Ok(slot.clone().map(Credential::from))
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| StorageError::new("memory slot poisoned"))?;
        *slot = Some(StoredCredential::from(credential));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| StorageError::new("memory slot poisoned"))?;
        *slot = None;
        Ok(())
    }
}

// ── Credential store ─────────────────────────────────────────────────

/// The single authoritative credential holder for a session.
///
/// Shared as `Arc<CredentialStore>` between the executor path, the refresh
/// coordinator and the auth endpoints. Mutations are written through to the
/// configured [`CredentialStorage`]; storage failures are logged and never
/// roll back the in-memory value.
pub struct CredentialStore {
    current: ArcSwap<Credential>,
    storage: Arc<dyn CredentialStorage>,
}

impl CredentialStore {
    /// A store backed by [`MemoryStorage`], starting logged out.
    pub fn in_memory() -> Self {
        Self {
            current: ArcSwap::from_pointee(Credential::default()),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    /// Build a store and restore whatever the storage backend persisted.
    pub fn restore(storage: Arc<dyn CredentialStorage>) -> Self {
        let initial = match storage.load() {
            Ok(Some(credential)) => {
                debug!(
                    authenticated = credential.is_authenticated(),
                    "restored persisted credential"
                );
                credential
            }
            Ok(None) => Credential::default(),
            Err(e) => {
                warn!(error = %e, "failed to restore credential, starting logged out");
                Credential::default()
            }
        };

        Self {
            current: ArcSwap::from_pointee(initial),
            storage,
        }
    }

    /// The latest credential. Never hold the result across an await that
    /// may race a refresh; re-read instead.
    pub fn get(&self) -> Arc<Credential> {
        self.current.load_full()
    }

    pub fn set(&self, credential: Credential) {
        if let Err(e) = self.storage.save(&credential) {
            warn!(error = %e, "failed to persist credential");
        }
        self.current.store(Arc::new(credential));
        debug!("credential updated");
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "failed to clear persisted credential");
        }
        self.current.store(Arc::new(Credential::default()));
        debug!("credential cleared");
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.load().is_authenticated()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("current", &self.current.load())
            .finish_non_exhaustive()
    }
}
