// Request executor
//
// Performs exactly one HTTP exchange for a `RequestDescriptor` and folds
// every outcome -- success, HTTP error, transport failure, undecodable
// body -- into a `NormalizedResponse`. Nothing escapes as a panic or `Err`.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::Credential;
use crate::error::Error;
use crate::transport::{TransportConfig, endpoint_url};

// ── Request descriptor ───────────────────────────────────────────────

/// One named part of a multipart upload.
#[derive(Debug, Clone)]
pub enum UploadPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Bytes,
    },
}

/// A multipart body kept in replayable form.
///
/// `reqwest::multipart::Form` is single-use, so the form is rebuilt from
/// these parts on every attempt (the refresh coordinator may send twice).
#[derive(Debug, Clone, Default)]
pub struct Upload {
    parts: Vec<UploadPart>,
}

impl Upload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(UploadPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(UploadPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        });
        self
    }

    pub fn file_with_mime(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(UploadPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: Some(mime.into()),
            bytes: bytes.into(),
        });
        self
    }

    pub fn parts(&self) -> &[UploadPart] {
        &self.parts
    }

    fn to_form(&self) -> Result<reqwest::multipart::Form, Error> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                UploadPart::Text { name, value } => form.text(name.clone(), value.clone()),
                UploadPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.to_vec())
                        .file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| Error::Unknown {
                            message: format!("invalid MIME type {mime:?}: {e}"),
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Request body variants.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Upload),
}

/// Everything needed to (re)issue one API call.
///
/// Immutable after construction except for `retried`, which the refresh
/// coordinator sets exactly once before replaying.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub(crate) retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body. A value that fails to serialize is an
    /// `Error::Unknown`, reported before anything is sent.
    pub fn json(mut self, body: &(impl Serialize + ?Sized)) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| Error::Unknown {
            message: format!("failed to serialize request body: {e}"),
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, upload: Upload) -> Self {
        self.body = RequestBody::Multipart(upload);
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }

    /// Whether this request has already been replayed after a refresh.
    pub fn retried(&self) -> bool {
        self.retried
    }
}

// ── Normalized response ──────────────────────────────────────────────

/// Result of one HTTP exchange, with failures carried as values.
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    /// `None` when no response was received.
    pub status: Option<u16>,
    /// Parsed JSON body on success (`Null` for an empty body).
    pub payload: Option<serde_json::Value>,
    pub error: Option<Error>,
}

impl NormalizedResponse {
    fn success(status: u16, payload: serde_json::Value) -> Self {
        Self {
            status: Some(status),
            payload: Some(payload),
            error: None,
        }
    }

    pub(crate) fn failure(error: Error) -> Self {
        Self {
            status: error.status(),
            payload: None,
            error: Some(error),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// Collapse into a `Result` for the facade.
    pub fn into_result(self) -> Result<serde_json::Value, Error> {
        match (self.error, self.payload) {
            (Some(err), _) => Err(err),
            (None, Some(payload)) => Ok(payload),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}

/// Backend error body: `{ message, code? }`, sometimes `{ error }`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Executor ─────────────────────────────────────────────────────────

/// Issues single HTTP calls against the configured backend root.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpExecutor {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url: transport.base_url.clone(),
        })
    }

    /// Wrap a pre-built client (tests, custom middleware).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Perform one exchange. Attaches `Authorization: Bearer …` when the
    /// credential carries an access token.
    pub async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        credential: &Credential,
    ) -> NormalizedResponse {
        let url = match endpoint_url(&self.base_url, &descriptor.path) {
            Ok(url) => url,
            Err(e) => return NormalizedResponse::failure(e),
        };
        debug!(method = %descriptor.method, %url, retried = descriptor.retried, "sending request");

        let mut builder = self.http.request(descriptor.method.clone(), url);
        if !descriptor.query.is_empty() {
            builder = builder.query(&descriptor.query);
        }
        if let Some(bearer) = credential.bearer() {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        builder = match &descriptor.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(upload) => match upload.to_form() {
                Ok(form) => builder.multipart(form),
                Err(e) => return NormalizedResponse::failure(e),
            },
        };

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "request failed before a response arrived");
                return NormalizedResponse::failure(Error::Network {
                    message: e.to_string(),
                });
            }
        };

        let status = resp.status();
        trace!(status = status.as_u16(), "response received");

        if status.is_success() {
            parse_success(status, resp).await
        } else {
            NormalizedResponse::failure(parse_error(status, resp).await)
        }
    }
}

async fn parse_success(status: StatusCode, resp: reqwest::Response) -> NormalizedResponse {
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            return NormalizedResponse::failure(Error::Network {
                message: format!("failed to read response body: {e}"),
            });
        }
    };

    if body.trim().is_empty() {
        return NormalizedResponse::success(status.as_u16(), serde_json::Value::Null);
    }

    match serde_json::from_str(&body) {
        Ok(payload) => NormalizedResponse::success(status.as_u16(), payload),
        Err(e) => {
            let preview = &body[..floor_char_boundary(&body, 200)];
            NormalizedResponse::failure(Error::Unknown {
                message: format!("{e} (body preview: {preview:?})"),
            })
        }
    }
}

async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
    let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
        resp.headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    } else {
        None
    };
    if let Some(after) = retry_after {
        warn!(retry_after_secs = after.as_secs(), "rate limited");
    }

    let raw = resp.text().await.unwrap_or_default();
    let details = serde_json::from_str::<serde_json::Value>(&raw).ok();
    let parsed = details
        .as_ref()
        .and_then(|v| serde_json::from_value::<ErrorBody>(v.clone()).ok());

    let (message, code) = match parsed {
        Some(body) => (body.message.or(body.error), body.code),
        None => (None, None),
    };

    Error::Http {
        status: status.as_u16(),
        message: message.unwrap_or_else(|| format!("HTTP Error {}", status.as_u16())),
        code,
        details,
        retry_after,
    }
}

/// Largest index `<= max` that falls on a char boundary.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
