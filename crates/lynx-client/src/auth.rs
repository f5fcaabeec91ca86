//! Authentication for HTTP requests and MQTT connections

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

/// Header carrying API keys
pub const API_KEY_HEADER: &str = "X-API-Key";

/// How the client authenticates
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Auth {
    /// No authentication
    #[default]
    None,
    /// Username and password
    Basic { user: String, password: String },
    /// API key in the `X-API-Key` header
    ApiKey { key: String },
    /// Bearer token
    Bearer { token: String },
}

impl Auth {
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Auth::ApiKey { key: key.into() }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer {
            token: token.into(),
        }
    }

    /// Attach credentials to an HTTP request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::None => request,
            Auth::Basic { user, password } => request.basic_auth(user, Some(password)),
            Auth::ApiKey { key } => request.header(API_KEY_HEADER, key),
            Auth::Bearer { token } => request.bearer_auth(token),
        }
    }

    /// Username and password used for the MQTT connection
    pub fn mqtt_credentials(&self) -> Option<(String, String)> {
        match self {
            Auth::None => None,
            Auth::Basic { user, password } => Some((user.clone(), password.clone())),
            Auth::ApiKey { key } => Some(("apikey".to_string(), key.clone())),
            Auth::Bearer { token } => Some(("bearer".to_string(), token.clone())),
        }
    }
}

// Keep secrets out of logs
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Basic { user, .. } => write!(f, "Basic({user}, ***)"),
            Auth::ApiKey { .. } => write!(f, "ApiKey(***)"),
            Auth::Bearer { .. } => write!(f, "Bearer(***)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mqtt_credentials() {
        assert_eq!(Auth::None.mqtt_credentials(), None);
        assert_eq!(
            Auth::basic("alice", "secret").mqtt_credentials(),
            Some(("alice".to_string(), "secret".to_string()))
        );
        assert_eq!(
            Auth::api_key("k3y").mqtt_credentials(),
            Some(("apikey".to_string(), "k3y".to_string()))
        );
        assert_eq!(
            Auth::bearer("t0k").mqtt_credentials(),
            Some(("bearer".to_string(), "t0k".to_string()))
        );
    }

    #[test]
    fn test_apply_headers() {
        let client = reqwest::Client::new();

        let request = Auth::api_key("k3y")
            .apply(client.get("http://localhost/api"))
            .build()
            .unwrap();
        assert_eq!(request.headers()[API_KEY_HEADER], "k3y");

        let request = Auth::bearer("t0k")
            .apply(client.get("http://localhost/api"))
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer t0k");

        let request = Auth::basic("alice", "secret")
            .apply(client.get("http://localhost/api"))
            .build()
            .unwrap();
        // base64("alice:secret")
        assert_eq!(
            request.headers()["authorization"],
            "Basic YWxpY2U6c2VjcmV0"
        );

        let request = Auth::None
            .apply(client.get("http://localhost/api"))
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", Auth::basic("alice", "secret"));
        assert!(!debug.contains("secret"));
        assert!(!format!("{:?}", Auth::api_key("k3y")).contains("k3y"));
    }

    #[test]
    fn test_deserialize_tagged() {
        let auth: Auth = toml::from_str(
            r#"
            type = "api_key"
            key = "abc"
        "#,
        )
        .unwrap();
        assert_eq!(auth, Auth::api_key("abc"));
    }
}
