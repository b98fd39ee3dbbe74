use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Maximum length for non-JSON error bodies kept in errors
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Message shown when the server gives no usable error text
pub const GENERIC_ERROR_MESSAGE: &str = "Request failed";

/// Error body of a non-2xx response, kept verbatim.
///
/// The backend answers with `{"error": "..."}` for generic failures, DRF's
/// `{"detail": "..."}` for auth failures, or a field-keyed object such as
/// `{"username": ["already taken"]}` for validation failures. Bodies that are
/// not JSON are kept as a (truncated) JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorBody(pub Value);

impl ErrorBody {
    pub fn from_text(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => ErrorBody(value),
            Err(_) => ErrorBody(Value::String(truncate_body(body))),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Server-provided message: `error`, then `detail`
    pub fn message(&self) -> Option<&str> {
        ["error", "detail"]
            .iter()
            .find_map(|key| self.0.get(key).and_then(Value::as_str))
    }

    /// Field-level validation messages, in key order
    pub fn field_errors(&self) -> Vec<(String, Vec<String>)> {
        let Some(object) = self.0.as_object() else {
            return Vec::new();
        };
        object
            .iter()
            .filter(|(key, _)| key.as_str() != "error" && key.as_str() != "detail")
            .filter_map(|(key, value)| {
                let messages: Vec<String> = match value {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect(),
                    _ => return None,
                };
                Some((key.clone(), messages))
            })
            .collect()
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => f.write_str(message),
            None => match &self.0 {
                Value::String(s) => f.write_str(s),
                other => write!(f, "{}", other),
            },
        }
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorBody),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorBody),

    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    #[error("Request rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: ErrorBody },

    #[error("Server error ({status}): {body}")]
    ServerError { status: StatusCode, body: ErrorBody },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = ErrorBody::from_text(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(body),
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            500..=599 => ApiError::ServerError { status, body },
            _ => ApiError::Rejected { status, body },
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::Rejected { status, .. } | ApiError::ServerError { status, .. } => {
                Some(*status)
            }
            ApiError::Network(e) => e.status(),
            ApiError::InvalidResponse(_) | ApiError::InvalidUrl(_) => None,
        }
    }

    /// Error body returned by the server
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::Rejected { body, .. }
            | ApiError::ServerError { body, .. } => Some(body),
            ApiError::Network(_) | ApiError::InvalidResponse(_) | ApiError::InvalidUrl(_) => None,
        }
    }

    pub fn into_body(self) -> Option<ErrorBody> {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::Rejected { body, .. }
            | ApiError::ServerError { body, .. } => Some(body),
            ApiError::Network(_) | ApiError::InvalidResponse(_) | ApiError::InvalidUrl(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// No HTTP response was received (connect failure, timeout)
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Message suitable for a transient notification
    pub fn user_message(&self) -> String {
        self.body()
            .and_then(ErrorBody::message)
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status_classification() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "{}"),
            ApiError::AccessDenied(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "{}"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "{}"),
            ApiError::Rejected { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "{}"),
            ApiError::ServerError { .. }
        ));
        assert_eq!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "").status(),
            Some(StatusCode::TOO_MANY_REQUESTS)
        );
    }

    #[test]
    fn test_body_kept_verbatim() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"error":"invalid credentials"}"#);
        assert_eq!(err.body().unwrap().0, json!({"error": "invalid credentials"}));
        assert_eq!(err.user_message(), "invalid credentials");
    }

    #[test]
    fn test_message_falls_back_to_detail_then_generic() {
        let body = ErrorBody::from_text(r#"{"detail":"Given token not valid"}"#);
        assert_eq!(body.message(), Some("Given token not valid"));

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"username":["taken"]}"#);
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_field_errors() {
        let body = ErrorBody(json!({
            "username": ["A user with that username already exists."],
            "email": "Enter a valid email address.",
            "error": "ignored"
        }));
        let fields = body.field_errors();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].0, "email");
        assert_eq!(fields[1].1, vec!["A user with that username already exists.".to_string()]);
    }

    #[test]
    fn test_non_json_body_is_truncated() {
        let html = "<html>".repeat(200);
        let body = ErrorBody::from_text(&html);
        let text = body.0.as_str().unwrap();
        assert!(text.starts_with("<html>"));
        assert!(text.contains("truncated, 1200 total bytes"));
        assert!(!body.is_empty());
        assert!(ErrorBody::from_text("").is_empty());
    }
}
