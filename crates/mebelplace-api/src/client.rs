// API facade
//
// Typed per-verb helpers over the refresh coordinator. Every call goes
// through `TokenRefresher::send`; only login and register (session.rs)
// reach the executor directly, since a 401 there means bad credentials.
// Successful payloads are unwrapped from the `{ data, message?, status }`
// envelope before the caller sees them.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::auth::{CredentialStorage, CredentialStore};
use crate::envelope::unwrap_envelope;
use crate::error::Error;
use crate::executor::{HttpExecutor, RequestDescriptor, Upload};
use crate::refresh::{SessionEvent, TokenRefresher};
use crate::transport::TransportConfig;

/// Authenticated client for the MebelPlace backend.
///
/// Cheaply cloneable; clones share the credential store and the
/// single-flight refresh lock.
#[derive(Debug, Clone)]
pub struct ApiClient {
    refresher: Arc<TokenRefresher>,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client whose credential lives only in memory.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let store = Arc::new(CredentialStore::in_memory());
        Self::with_store(transport, store)
    }

    /// Build a client restoring (and persisting) its credential through
    /// the given storage backend.
    pub fn with_storage(
        transport: &TransportConfig,
        storage: Arc<dyn CredentialStorage>,
    ) -> Result<Self, Error> {
        let store = Arc::new(CredentialStore::restore(storage));
        Self::with_store(transport, store)
    }

    /// Build a client around an existing credential store.
    pub fn with_store(
        transport: &TransportConfig,
        store: Arc<CredentialStore>,
    ) -> Result<Self, Error> {
        let executor = HttpExecutor::new(transport)?;
        Ok(Self::from_parts(executor, store))
    }

    pub fn from_parts(executor: HttpExecutor, store: Arc<CredentialStore>) -> Self {
        Self {
            refresher: Arc::new(TokenRefresher::new(executor, store)),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.refresher.store()
    }

    pub fn base_url(&self) -> &url::Url {
        self.refresher.executor().base_url()
    }

    /// Watch refresh/logout transitions (e.g. to route to a login view).
    pub fn session_events(&self) -> watch::Receiver<SessionEvent> {
        self.refresher.subscribe()
    }

    pub(crate) fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(RequestDescriptor::get(path)).await
    }

    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let descriptor = params
            .iter()
            .fold(RequestDescriptor::get(path), |desc, (key, value)| {
                desc.query_param(*key, value.clone())
            });
        self.send(descriptor).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.send(RequestDescriptor::post(path).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.send(RequestDescriptor::put(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.send(RequestDescriptor::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(RequestDescriptor::delete(path)).await
    }

    /// POST a multipart body. No JSON serialization, no JSON content type.
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, upload: Upload) -> Result<T, Error> {
        self.send(RequestDescriptor::post(path).multipart(upload))
            .await
    }

    // ── Descriptor-level entry points ────────────────────────────────

    /// Send a prepared descriptor and unwrap `data` as `T`.
    pub async fn send<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, Error> {
        let payload = self.refresher.send(descriptor).await.into_result()?;
        unwrap_envelope(payload)
    }

    /// Send a prepared descriptor for an endpoint whose body carries no
    /// meaningful `data` (logout, mark-read, deletes returning `{message}`).
    pub async fn send_unit(&self, descriptor: RequestDescriptor) -> Result<(), Error> {
        self.refresher.send(descriptor).await.into_result().map(|_| ())
    }
}
