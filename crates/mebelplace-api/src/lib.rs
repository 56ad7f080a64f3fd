// mebelplace-api: Async Rust client for the MebelPlace backend with transparent token refresh

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod refresh;
pub mod session;
pub mod transport;

pub use auth::{Credential, CredentialStorage, CredentialStore, MemoryStorage, StorageError};
pub use client::ApiClient;
pub use error::{Error, ErrorKind};
pub use executor::{RequestDescriptor, Upload};
pub use refresh::SessionEvent;
pub use session::{AuthSession, RegisterRequest, UserRole};
pub use transport::{TlsMode, TransportConfig};
