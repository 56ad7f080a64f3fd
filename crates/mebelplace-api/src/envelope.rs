// Backend response envelope.
//
// Every successful body is `{ data: T, message?, status }`. `status` is a
// number on the v2 API and a `"success"` label on older routes; both parse.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::Error;

/// Envelope status, numeric or labelled depending on the backend route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeStatus {
    Code(u16),
    Label(String),
}

/// The uniform `{ data, message?, status }` wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<EnvelopeStatus>,
}

/// Deserialize a payload as `Envelope<T>` and return `data`.
///
/// A missing or mistyped `data` field is an [`Error::Unknown`] rather than
/// a silently defaulted value.
pub fn unwrap_envelope<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value::<Envelope<T>>(payload)
        .map(|envelope| envelope.data)
        .map_err(|e| Error::Unknown {
            message: format!("malformed response envelope: {e}"),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        username: String,
    }

    #[test]
    fn unwraps_numeric_status() {
        let user: User = unwrap_envelope(json!({
            "data": { "id": 1, "username": "master" },
            "status": 200
        }))
        .unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                username: "master".into()
            }
        );
    }

    #[test]
    fn accepts_label_status_and_message() {
        let envelope: Envelope<Vec<u32>> = serde_json::from_value(json!({
            "data": [1, 2, 3],
            "message": "ok",
            "status": "success"
        }))
        .unwrap();
        assert_eq!(envelope.status, Some(EnvelopeStatus::Label("success".into())));
        assert_eq!(envelope.message.as_deref(), Some("ok"));
    }

    #[test]
    fn missing_data_is_unknown_error() {
        let result: Result<User, Error> = unwrap_envelope(json!({ "status": 200 }));
        assert!(matches!(result, Err(Error::Unknown { .. })));
    }

    #[test]
    fn mistyped_data_is_unknown_error() {
        let result: Result<User, Error> = unwrap_envelope(json!({ "data": "nope" }));
        assert!(matches!(result, Err(Error::Unknown { .. })));
    }
}
