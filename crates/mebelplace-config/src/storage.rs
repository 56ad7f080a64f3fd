// ── Durable credential storage ──
//
// Both backends persist the same three fixed keys (`access_token`,
// `refresh_token`, `expires_at`) so a session survives a restart.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use mebelplace_api::auth::{ACCESS_TOKEN_KEY, EXPIRES_AT_KEY, REFRESH_TOKEN_KEY, StoredCredential};
use mebelplace_api::{Credential, CredentialStorage, StorageError};

// ── File ─────────────────────────────────────────────────────────────

/// Credentials as a JSON object in a single file, readable only by the owner.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::new(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let stored: StoredCredential = serde_json::from_str(&raw).map_err(|e| {
            StorageError::new(format!("corrupt credential file {}: {e}", self.path.display()))
        })?;
        Ok(Some(stored.into()))
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::new(format!("failed to create {}: {e}", parent.display())))?;
        }

        let json = serde_json::to_string_pretty(&StoredCredential::from(credential))
            .map_err(|e| StorageError::new(e.to_string()))?;
        let write_err =
            |e: std::io::Error| StorageError::new(format!("failed to write {}: {e}", self.path.display()));
        let mut file = open_owner_only(&self.path).map_err(write_err)?;
        // A file left by an older build may still be group or world readable.
        restrict_permissions(&self.path)?;
        file.write_all(json.as_bytes()).map_err(write_err)?;

        debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::new(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// Open for writing, creating the file as `0o600` on unix so the token
/// is never readable by others, not even briefly.
#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| StorageError::new(format!("failed to chmod {}: {e}", path.display())))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

// ── Keyring ──────────────────────────────────────────────────────────

/// Keyring service name under which the three entries live.
pub const KEYRING_SERVICE: &str = "mebelplace";

/// Credentials in the OS keyring, one entry per fixed key.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| StorageError::new(format!("keyring entry {key}: {e}")))
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::new(format!("keyring read {key}: {e}"))),
        }
    }

    fn write(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(value) => self
                .entry(key)?
                .set_password(value)
                .map_err(|e| StorageError::new(format!("keyring write {key}: {e}"))),
            None => self.delete(key),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::new(format!("keyring delete {key}: {e}"))),
        }
    }
}

impl CredentialStorage for KeyringStorage {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let access_token = self.read(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.read(REFRESH_TOKEN_KEY)?;
        if access_token.is_none() && refresh_token.is_none() {
            return Ok(None);
        }

        let expires_at = self
            .read(EXPIRES_AT_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));

        Ok(Some(
            StoredCredential {
                access_token,
                refresh_token,
                expires_at,
            }
            .into(),
        ))
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let stored = StoredCredential::from(credential);
        self.write(ACCESS_TOKEN_KEY, stored.access_token.as_deref())?;
        self.write(REFRESH_TOKEN_KEY, stored.refresh_token.as_deref())?;
        let expires_at = stored.expires_at.map(|at| at.to_rfc3339());
        self.write(EXPIRES_AT_KEY, expires_at.as_deref())?;
        debug!(service = %self.service, "credential saved to keyring");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY] {
            self.delete(key)?;
        }
        Ok(())
    }
}
