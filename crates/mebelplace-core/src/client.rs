// ── Query client ──
//
// Binds the API facade to the query cache: reads are cached by key,
// mutations declare the families they invalidate, and the session
// lifecycle (login, logout, forced logout after a failed refresh) keeps
// the cache in step with the credential store.

use std::sync::Arc;

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use mebelplace_api::executor::RequestDescriptor;
use mebelplace_api::{ApiClient, AuthSession, RegisterRequest, SessionEvent};

use crate::cache::{QueryCache, QueryKey};
use crate::error::CoreError;
use crate::keys;

/// Cached, invalidation-aware access to the backend.
#[derive(Debug, Clone)]
pub struct QueryClient {
    api: ApiClient,
    cache: Arc<QueryCache>,
}

impl QueryClient {
    pub fn new(api: ApiClient) -> Self {
        Self::with_cache(api, Arc::new(QueryCache::new()))
    }

    pub fn with_cache(api: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// `GET path`, cached under `key`.
    pub async fn query<T>(&self, key: &QueryKey, path: &str) -> Result<Arc<T>, CoreError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.cache.read(key, || self.api.get::<T>(path)).await
    }

    /// `GET path?params`, cached under `key`. The key should encode the
    /// params so that each filter gets its own entry.
    pub async fn query_with_params<T>(
        &self,
        key: &QueryKey,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Arc<T>, CoreError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.cache
            .read(key, || self.api.get_with_params::<T>(path, params))
            .await
    }

    /// `GET path`, discarding the result if `cancel` fires first.
    pub async fn query_until<T>(
        &self,
        key: &QueryKey,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<T>, CoreError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.cache
            .read_until(key, cancel, || self.api.get::<T>(path))
            .await
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Send a mutating request; on success mark `invalidates` stale.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
        invalidates: &[QueryKey],
    ) -> Result<T, CoreError> {
        self.cache
            .mutate(invalidates, self.api.send::<T>(descriptor))
            .await
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Log in and seed the current-user entry.
    pub async fn login(
        &self,
        phone: &str,
        password: &SecretString,
        sms_code: Option<&str>,
    ) -> Result<AuthSession, CoreError> {
        let session = self.api.login(phone, password, sms_code).await?;
        self.cache
            .set(&keys::auth::current_user(), session.user.clone());
        Ok(session)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, CoreError> {
        let session = self.api.register(request).await?;
        self.cache
            .set(&keys::auth::current_user(), session.user.clone());
        Ok(session)
    }

    /// Log out and drop every cached entry, whatever the server said.
    pub async fn logout(&self) -> Result<(), CoreError> {
        let outcome = self.api.logout().await;
        self.cache.clear();
        outcome.map_err(CoreError::from)
    }

    /// The user record seeded at login, if still cached.
    pub fn current_user(&self) -> Option<Arc<serde_json::Value>> {
        self.cache.peek(&keys::auth::current_user())
    }

    /// Clear the cache whenever the session is torn down by a failed
    /// refresh. Runs until `cancel` fires or the client is dropped.
    pub fn watch_session(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let events = self.api.session_events();
        let cache = Arc::clone(&self.cache);
        tokio::spawn(session_watch_task(events, cache, cancel))
    }
}

async fn session_watch_task(
    mut events: watch::Receiver<SessionEvent>,
    cache: Arc<QueryCache>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = events.changed() => {
                if changed.is_err() {
                    debug!("session event channel closed");
                    break;
                }
                let event = *events.borrow_and_update();
                if event == SessionEvent::LoggedOut {
                    info!("session ended, clearing query cache");
                    cache.clear();
                }
            }
        }
    }
}
