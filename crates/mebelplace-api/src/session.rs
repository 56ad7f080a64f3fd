// Session endpoints
//
// Login, registration, logout and explicit refresh. Token-bearing responses
// are parsed into a `TokenGrant` and written to the credential store before
// the call returns, so the next request already carries the new bearer.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::Credential;
use crate::client::ApiClient;
use crate::envelope::unwrap_envelope;
use crate::error::Error;
use crate::executor::RequestDescriptor;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";

// ── Token grant ──────────────────────────────────────────────────────

/// Token material returned by login, register and refresh.
///
/// The backend has shipped `token`, `access_token` and `accessToken` for
/// the same field over time; all are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenGrant {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(default, alias = "expiresIn")]
    expires_in: Option<i64>,
}

impl TokenGrant {
    /// Turn the grant into a credential.
    ///
    /// A grant without a new refresh token keeps `previous_refresh`.
    pub fn into_credential(
        self,
        previous_refresh: Option<&SecretString>,
        now: DateTime<Utc>,
    ) -> Result<Credential, Error> {
        let access = self
            .access_token
            .or(self.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Unknown {
                message: "token response carried no access token".into(),
            })?;

        let refresh_token = match self.refresh_token.filter(|t| !t.is_empty()) {
            Some(fresh) => Some(SecretString::from(fresh)),
            None => previous_refresh.cloned(),
        };

        Ok(Credential {
            access_token: Some(SecretString::from(access)),
            refresh_token,
            expires_at: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        })
    }
}

// ── Request / response shapes ────────────────────────────────────────

/// Body for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub phone: String,
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub role: UserRole,
}

fn expose<S: serde::Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Account role chosen at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Master,
    Admin,
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    #[serde(default)]
    user: serde_json::Value,
    #[serde(flatten)]
    grant: TokenGrant,
}

/// Outcome of a successful login or registration.
///
/// The user record is kept as raw JSON; callers deserialize the shape they need.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: serde_json::Value,
}

// ── Endpoints ────────────────────────────────────────────────────────

impl ApiClient {
    /// Log in with phone and password.
    ///
    /// `sms_code` is only sent when the backend asked for a second factor.
    pub async fn login(
        &self,
        phone: &str,
        password: &SecretString,
        sms_code: Option<&str>,
    ) -> Result<AuthSession, Error> {
        let mut body = json!({
            "phone": phone,
            "password": password.expose_secret(),
        });
        if let Some(code) = sms_code {
            body["smsCode"] = json!(code);
        }

        debug!(phone, "logging in");
        let session = self
            .authenticate(RequestDescriptor::post(LOGIN_PATH).json_value(body))
            .await?;
        info!("login successful");
        Ok(session)
    }

    /// Create an account. The backend logs the new account in immediately.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, Error> {
        debug!(phone = %request.phone, role = ?request.role, "registering account");
        let descriptor = RequestDescriptor::post(REGISTER_PATH).json(request)?;
        let session = self.authenticate(descriptor).await?;
        info!("registration successful");
        Ok(session)
    }

    /// End the session.
    ///
    /// The server call is best effort; the local credential is cleared
    /// whatever it returns. A server-side failure is still reported.
    pub async fn logout(&self) -> Result<(), Error> {
        let outcome = if self.credentials().is_authenticated() {
            self.send_unit(RequestDescriptor::post(LOGOUT_PATH)).await
        } else {
            Ok(())
        };

        self.credentials().clear();

        if let Err(ref e) = outcome {
            warn!(error = %e, "server-side logout failed, local session cleared");
        }
        debug!("logged out");
        outcome
    }

    /// Rotate the access token now, without waiting for a 401.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.refresher().refresh().await
    }

    async fn authenticate(&self, descriptor: RequestDescriptor) -> Result<AuthSession, Error> {
        let payload = self
            .refresher()
            .executor()
            .execute(&descriptor, &Credential::default())
            .await
            .into_result()?;
        let AuthPayload { user, grant } = unwrap_envelope(payload)?;

        let credential = grant.into_credential(None, Utc::now())?;
        self.credentials().set(credential);
        Ok(AuthSession { user })
    }
}
