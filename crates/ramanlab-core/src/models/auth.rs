use serde::{Deserialize, Serialize};

/// Credentials posted to `auth/login/`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Payload posted to `auth/register/`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
}

/// Access/refresh pair returned by a successful login.
#[derive(Clone, PartialEq, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

// Tokens must never end up in logs
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair: TokenPair = serde_json::from_str(r#"{"access":"A1","refresh":"R1"}"#).unwrap();
        assert_eq!(pair.access, "A1");
        let debug = format!("{:?}", pair);
        assert!(!debug.contains("A1"));
        assert!(!debug.contains("R1"));
    }

    #[test]
    fn test_register_request_shape() {
        let body = serde_json::to_value(RegisterRequest {
            username: "alice",
            password: "pw",
            email: "alice@lab.org",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"username": "alice", "password": "pw", "email": "alice@lab.org"})
        );
    }
}
