//! Test helpers

use crate::{Auth, LynxClient, LynxConfig};
use wiremock::MockServer;

/// HTTP client pointed at a mock server
pub(crate) fn client_for(server: &MockServer) -> LynxClient {
    LynxClient::new(LynxConfig::new(server.uri(), Auth::api_key("test-key")))
        .expect("client for mock server")
}
