//! Users

use crate::client::LynxClient;
use crate::error::LynxResult;
use crate::types::{nullable, Address};
use lynx_core::Meta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: i64,
    pub sms_login: bool,
    pub mobile: String,
    pub note: String,
    pub address: Address,
    #[serde(deserialize_with = "nullable")]
    pub organisations: Vec<i64>,
    #[serde(deserialize_with = "nullable")]
    pub assigned_installations: Vec<i64>,
    pub meta: Meta,
    pub protected_meta: Meta,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl LynxClient {
    /// The authenticated user
    pub async fn me(&self) -> LynxResult<User> {
        self.http().get("api/v2/user/me").await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::client_for;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/user/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "email": "ops@example.com", "first_name": "Kim", "last_name": "",
                "organisations": [1, 2], "assigned_installations": null,
                "meta": {"lang": "sv"}
            })))
            .mount(&server)
            .await;

        let user = client_for(&server).me().await.unwrap();
        assert_eq!(user.full_name(), "Kim");
        assert_eq!(user.organisations, vec![1, 2]);
        assert!(user.assigned_installations.is_empty());
        assert_eq!(user.meta.get("lang"), Some("sv"));
    }
}
