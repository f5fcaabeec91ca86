//! Lynx client module
//!
//! Central client that talks to the Lynx REST API and, when configured, the
//! MQTT broker.

mod http;

pub use http::{HttpClient, JSON_CONTENT_TYPE};

use crate::config::LynxConfig;
use crate::error::{LynxError, LynxResult};
use crate::mqtt::{ConnectionHandlers, MqttClient};

/// Client for the Lynx platform
pub struct LynxClient {
    config: LynxConfig,
    http: HttpClient,
    mqtt: Option<MqttClient>,
}

impl LynxClient {
    /// Create an HTTP-only client
    pub fn new(config: LynxConfig) -> LynxResult<Self> {
        let http = HttpClient::new(&config.api_base, config.timeout(), config.auth.clone())?;
        Ok(Self {
            config,
            http,
            mqtt: None,
        })
    }

    /// Create a client around an existing reqwest client
    pub fn with_http_client(config: LynxConfig, client: reqwest::Client) -> LynxResult<Self> {
        let http = HttpClient::with_client(client, &config.api_base, config.auth.clone())?;
        Ok(Self {
            config,
            http,
            mqtt: None,
        })
    }

    /// Create a client and connect MQTT if the config has an `[mqtt]` section
    pub async fn connect(config: LynxConfig) -> LynxResult<Self> {
        Self::connect_with(config, ConnectionHandlers::default()).await
    }

    /// Like [`connect`](Self::connect), with MQTT connection callbacks
    pub async fn connect_with(
        config: LynxConfig,
        handlers: ConnectionHandlers,
    ) -> LynxResult<Self> {
        let mut client = Self::new(config)?;
        if let Some(mqtt) = &client.config.mqtt {
            let mqtt = MqttClient::connect_with(mqtt, &client.config.auth, handlers).await?;
            client.mqtt = Some(mqtt);
        }
        Ok(client)
    }

    /// Get HTTP client reference
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Get configuration reference
    pub fn config(&self) -> &LynxConfig {
        &self.config
    }

    /// Get the MQTT client
    pub fn mqtt(&self) -> LynxResult<&MqttClient> {
        self.mqtt.as_ref().ok_or(LynxError::MqttNotConfigured)
    }

    /// Access v3 endpoints
    pub fn v3(&self) -> V3Client<'_> {
        V3Client { client: self }
    }

    /// Check that the API answers
    pub async fn ping(&self) -> LynxResult<()> {
        let request = self.http.request(reqwest::Method::GET, "api/v2/ping");
        self.http.execute_empty(request).await
    }
}

/// Borrowed view of the client for v3 endpoints
#[derive(Clone, Copy)]
pub struct V3Client<'a> {
    pub(crate) client: &'a LynxClient,
}

impl V3Client<'_> {
    pub(crate) fn http(&self) -> &HttpClient {
        &self.client.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/ping"))
            .and(header("authorization", "Bearer t0k"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "pong"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = LynxClient::new(LynxConfig::new(server.uri(), Auth::bearer("t0k"))).unwrap();
        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_ping_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/ping"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = LynxClient::new(LynxConfig::new(server.uri(), Auth::None)).unwrap();
        let err = client.ping().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_mqtt_not_configured() {
        let client = LynxClient::connect(LynxConfig::default()).await.unwrap();
        assert!(matches!(client.mqtt(), Err(LynxError::MqttNotConfigured)));
    }

    #[test]
    fn test_invalid_base() {
        let config = LynxConfig::new("::not a url::", Auth::None);
        assert!(LynxClient::new(config).is_err());
    }
}
