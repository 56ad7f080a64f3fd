// Token refresh coordination
//
// Wraps the executor. A 401 on a first attempt triggers at most one refresh
// cycle for that request, followed by exactly one replay. Refreshes are
// single-flight: the critical section is one async mutex, and a request
// that enters it after someone else already rotated the token just replays.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::auth::{Credential, CredentialStore};
use crate::envelope::unwrap_envelope;
use crate::error::Error;
use crate::executor::{HttpExecutor, NormalizedResponse, RequestDescriptor};
use crate::session::TokenGrant;

/// Refresh endpoint, relative to the API root.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Session lifecycle notifications for external collaborators.
///
/// Navigation listens for [`LoggedOut`](Self::LoggedOut) to send the user
/// back to a login view; the core never redirects on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// No refresh has happened yet in this process.
    Idle,
    /// A refresh cycle stored a new credential.
    Refreshed,
    /// The credential store was cleared after a failed or impossible refresh.
    LoggedOut,
}

/// What a 401 turned into once the critical section was passed.
#[derive(Debug)]
enum Recovery {
    /// A newer credential is in the store; replay the request once.
    Replay,
    /// No refresh was possible; surface the original 401.
    Surface,
    /// The session is gone; surface the terminal authorization error.
    LoggedOut,
}

/// Per-request refresh state machine plus the shared single-flight lock.
pub struct TokenRefresher {
    executor: HttpExecutor,
    store: Arc<CredentialStore>,
    refresh_lock: Mutex<()>,
    events: watch::Sender<SessionEvent>,
}

impl TokenRefresher {
    pub fn new(executor: HttpExecutor, store: Arc<CredentialStore>) -> Self {
        let (events, _) = watch::channel(SessionEvent::Idle);
        Self {
            executor,
            store,
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    pub fn executor(&self) -> &HttpExecutor {
        &self.executor
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Execute a request, resolving a first 401 through one refresh cycle.
    ///
    /// The credential is re-read from the store on every attempt, never
    /// carried across the refresh await.
    pub async fn send(&self, mut descriptor: RequestDescriptor) -> NormalizedResponse {
        loop {
            let credential = self.store.get();
            let response = self.executor.execute(&descriptor, &credential).await;

            if !response.is_unauthorized() {
                return response;
            }

            if descriptor.retried {
                debug!(path = %descriptor.path, "replay still unauthorized, not refreshing again");
                return response;
            }

            match self.recover(&credential).await {
                Recovery::Replay => {
                    descriptor.retried = true;
                    debug!(path = %descriptor.path, "replaying request with refreshed credential");
                }
                Recovery::Surface => return response,
                Recovery::LoggedOut => return NormalizedResponse::failure(Error::session_expired()),
            }
        }
    }

    /// Refresh unconditionally (subject to single-flight).
    pub async fn refresh(&self) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;
        let current = self.store.get();
        let Some(refresh_token) = current.refresh_token.clone() else {
            return Err(Error::session_expired());
        };
        self.rotate(&refresh_token).await
    }

    /// Handle a 401 observed with `failed` as the credential in use.
    async fn recover(&self, failed: &Credential) -> Recovery {
        let _guard = self.refresh_lock.lock().await;
        let current = self.store.get();

        if current.is_authenticated() && !current.same_access_token(failed) {
            debug!("credential already rotated by a concurrent refresh");
            return Recovery::Replay;
        }

        if failed.is_authenticated() && !current.is_authenticated() && !current.can_refresh() {
            debug!("credential store cleared while request was in flight");
            return Recovery::LoggedOut;
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            if current.is_authenticated() {
                info!("access token rejected and no refresh token available, logging out");
                self.log_out();
            }
            return Recovery::Surface;
        };

        match self.rotate(&refresh_token).await {
            Ok(()) => Recovery::Replay,
            Err(_) => Recovery::LoggedOut,
        }
    }

    /// Call the refresh endpoint and store the new credential.
    ///
    /// Must be called with `refresh_lock` held. On failure the store is
    /// cleared: no partially authenticated state survives a failed refresh.
    async fn rotate(&self, refresh_token: &SecretString) -> Result<(), Error> {
        debug!("refreshing access token");

        let descriptor = RequestDescriptor::post(REFRESH_PATH)
            .json_value(json!({ "refresh_token": refresh_token.expose_secret() }));

        // The refresh call goes straight to the executor, without a bearer.
        let outcome = self
            .executor
            .execute(&descriptor, &Credential::default())
            .await
            .into_result()
            .and_then(unwrap_envelope::<TokenGrant>)
            .and_then(|grant| grant.into_credential(Some(refresh_token), Utc::now()));

        match outcome {
            Ok(credential) => {
                self.store.set(credential);
                self.events.send_replace(SessionEvent::Refreshed);
                info!("access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                self.log_out();
                Err(Error::session_expired())
            }
        }
    }

    fn log_out(&self) {
        self.store.clear();
        self.events.send_replace(SessionEvent::LoggedOut);
    }
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("executor", &self.executor)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
