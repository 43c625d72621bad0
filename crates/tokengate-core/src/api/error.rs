use thiserror::Error;

/// Outcome of a dispatched request that did not produce data.
///
/// `Failure` is an application-level answer: the backend replied with a
/// well-formed envelope whose code is not 200. Everything that prevented a
/// well-formed envelope from arriving is `Transport`.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Request to {url} failed with code {code}: {message}")]
    Failure {
        message: String,
        code: i64,
        url: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to update stored credential: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response (status {status}): {body}")]
    InvalidResponse { status: u16, body: String },
}

/// Maximum length for response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn invalid_response(status: reqwest::StatusCode, body: &str) -> Self {
        TransportError::InvalidResponse {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }
}

impl RequestError {
    /// Server-supplied code for application failures
    pub fn code(&self) -> Option<i64> {
        match self {
            RequestError::Failure { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RequestError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(400); // 800 bytes, 2 bytes per char
        let err = TransportError::invalid_response(reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            TransportError::InvalidResponse { status, body } => {
                assert_eq!(status, 502);
                assert!(body.ends_with("(truncated, 800 total bytes)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_accessors() {
        let err = RequestError::Failure {
            message: "bad token".to_string(),
            code: 401,
            url: "/api/x".to_string(),
        };
        assert_eq!(err.code(), Some(401));
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Request to /api/x failed with code 401: bad token");
    }
}
