use serde_json::Value;
use thiserror::Error;

/// Failures surfaced by the backend boundary and the workflows built on it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx, but the payload does not have the expected shape.
    #[error("Invalid response format from server: {0}")]
    MalformedResponse(String),

    /// Another request that must not overlap is still pending.
    #[error("Another operation is still in progress")]
    OperationInProgress,

    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse(detail.into())
    }

    /// Builds a `Server` error from whatever body came back, JSON or not.
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::Server {
            status,
            message: server_message(status, body),
        }
    }
}

fn server_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        for field in ["error", "detail", "message"] {
            if let Some(message) = object.get(field).and_then(Value::as_str)
                && !message.trim().is_empty()
            {
                return message.trim().to_owned();
            }
        }
    }

    let text = body.trim();
    if text.is_empty() || text.starts_with('{') {
        format!("HTTP {status}")
    } else {
        text.to_owned()
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_wins_over_detail() {
        let error = ClientError::from_status(404, r#"{"detail":"nope","error":"Document not found"}"#);
        assert_eq!(error.to_string(), "Document not found");
    }

    #[test]
    fn fastapi_detail_is_used_when_no_error_field() {
        let error = ClientError::from_status(422, r#"{"detail":"num_clusters must be int"}"#);
        assert_eq!(
            error,
            ClientError::Server {
                status: 422,
                message: "num_clusters must be int".to_owned()
            }
        );
    }

    #[test]
    fn plain_text_body_is_kept() {
        let error = ClientError::from_status(502, "  Bad Gateway\n");
        assert_eq!(error.to_string(), "Bad Gateway");
    }

    #[test]
    fn unusable_body_falls_back_to_status() {
        assert_eq!(ClientError::from_status(500, "").to_string(), "HTTP 500");
        assert_eq!(
            ClientError::from_status(500, r#"{"error": 12}"#).to_string(),
            "HTTP 500"
        );
    }
}
