use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::error::RequestError;
use crate::auth::expiry;

/// Envelope code signalling application-level success.
pub const SUCCESS_CODE: i64 = 200;

/// Uniform wrapper around every backend response body.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T = Value> {
    pub code: i64,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope<Value> {
    /// Split into data on success or an application failure for `url`.
    ///
    /// A missing or null `data` decodes as JSON `null`, so unit and
    /// `Option` targets accept data-less successes. A mismatched payload
    /// shape is reported as the serde error.
    pub fn into_result<T: DeserializeOwned>(
        self,
        url: &str,
    ) -> Result<Result<T, serde_json::Error>, RequestError> {
        if self.code == SUCCESS_CODE {
            Ok(serde_json::from_value(self.data.unwrap_or(Value::Null)))
        } else {
            Err(RequestError::Failure {
                message: self.message.unwrap_or_default(),
                code: self.code,
                url: url.to_string(),
            })
        }
    }
}

/// Payload of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeResponse {
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    pub token: String,
    #[serde(deserialize_with = "expiry::deserialize")]
    pub expire: DateTime<Utc>,
}

/// Purpose of a requested email verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Register,
    Reset,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::Register => "register",
            CodeKind::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_yields_data() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"code":200,"data":{"foo":1},"message":"ok"}"#).unwrap();
        let data: Value = envelope.into_result("/x").unwrap().unwrap();
        assert_eq!(data, serde_json::json!({"foo": 1}));
    }

    #[test]
    fn test_null_data_decodes_as_unit() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"code":200,"data":null,"message":"ok"}"#).unwrap();
        let unit: Result<(), _> = envelope.into_result("/x").unwrap();
        assert!(unit.is_ok());
    }

    #[test]
    fn test_failure_envelope() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"code":401,"data":null,"message":"bad token"}"#).unwrap();
        let err = envelope.into_result::<Value>("/api/me").unwrap_err();
        match err {
            RequestError::Failure { message, code, url } => {
                assert_eq!(message, "bad token");
                assert_eq!(code, 401);
                assert_eq!(url, "/api/me");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_without_message() {
        let envelope: Envelope = serde_json::from_str(r#"{"code":500}"#).unwrap();
        let err = envelope.into_result::<Value>("/x").unwrap_err();
        assert_eq!(err.code(), Some(500));
    }

    #[test]
    fn test_authorize_response_parses_backend_payload() {
        let json = r#"{"username":"alice","role":"user","token":"jwt","expire":"2030-05-01 10:00:00"}"#;
        let auth: AuthorizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(auth.username, "alice");
        assert_eq!(auth.role.as_deref(), Some("user"));
        assert_eq!(auth.token, "jwt");
        assert!(auth.expire > Utc::now());
    }
}
