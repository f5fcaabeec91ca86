//! Devices

use crate::client::LynxClient;
use crate::error::LynxResult;
use crate::types::Filter;
use lynx_core::Meta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub id: i64,
    #[serde(rename = "type")]
    pub device_type: String,
    pub installation_id: i64,
    pub meta: Meta,
    pub protected_meta: Meta,
    pub created: i64,
    pub updated: i64,
}

impl LynxClient {
    pub async fn get_devices(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> LynxResult<Vec<Device>> {
        self.http()
            .get_query(&format!("api/v2/devicex/{installation_id}"), filter)
            .await
    }

    pub async fn get_device(&self, installation_id: i64, device_id: i64) -> LynxResult<Device> {
        self.http()
            .get(&format!("api/v2/devicex/{installation_id}/{device_id}"))
            .await
    }

    pub async fn create_device(&self, device: &Device) -> LynxResult<Device> {
        self.http()
            .post(&format!("api/v2/devicex/{}", device.installation_id), device)
            .await
    }

    pub async fn update_device(&self, device: &Device) -> LynxResult<Device> {
        self.http()
            .put(
                &format!("api/v2/devicex/{}/{}", device.installation_id, device.id),
                device,
            )
            .await
    }

    pub async fn delete_device(&self, device: &Device) -> LynxResult<()> {
        self.http()
            .delete(&format!(
                "api/v2/devicex/{}/{}",
                device.installation_id, device.id
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client_for;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_devices_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/devicex/3"))
            .and(query_param("name", "*blinder"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 11, "type": "zwave", "installation_id": 3,
                 "meta": {"name": "Kitchen blinder"}, "protected_meta": {}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let devices = client_for(&server)
            .get_devices(3, &Filter::new().with("name", "*blinder"))
            .await
            .unwrap();
        assert_eq!(devices[0].device_type, "zwave");
    }

    #[tokio::test]
    async fn test_update_device() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/devicex/3/11"))
            .and(header("content-type", "application/json; charset=UTF-8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 11, "type": "zwave", "installation_id": 3, "meta": {"name": "Renamed"}
            })))
            .mount(&server)
            .await;

        let mut device = Device {
            id: 11,
            device_type: "zwave".to_string(),
            installation_id: 3,
            ..Default::default()
        };
        device.meta.insert("name", "Renamed");
        let updated = client_for(&server).update_device(&device).await.unwrap();
        assert_eq!(updated.meta.get("name"), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_get_device_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/devicex/3/99"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "device not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).get_device(3, 99).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "device not found (Not Found - 404)");
    }
}
