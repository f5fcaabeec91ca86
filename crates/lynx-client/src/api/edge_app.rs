//! Edge applications and their configured instances

use crate::client::LynxClient;
use crate::error::LynxResult;
use crate::types::nullable;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeApp {
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    pub short_description: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,
    pub official: bool,
    pub public: bool,
    pub source_url: String,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub apps: Vec<EdgeApp>,
}

/// Uploaded app revision, named once published
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeAppVersion {
    pub name: String,
    pub hash: String,
}

/// An app instance configured on an installation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeAppConfig {
    pub id: i64,
    pub app_id: i64,
    pub installation_id: i64,
    pub version: String,
    #[serde(deserialize_with = "nullable")]
    pub config: HashMap<String, serde_json::Value>,
    pub name: String,
    pub created: i64,
    pub updated: i64,
}

#[derive(Deserialize)]
struct VersionHash {
    hash: String,
}

fn source_part(data: Vec<u8>, file_name: &'static str) -> LynxResult<Part> {
    Ok(Part::bytes(data)
        .file_name(file_name)
        .mime_str("application/octet-stream")?)
}

impl LynxClient {
    pub async fn get_edge_apps(&self) -> LynxResult<Vec<EdgeApp>> {
        self.http().get("api/v2/edge/app").await
    }

    pub async fn get_edge_app(&self, app_id: i64) -> LynxResult<EdgeApp> {
        self.http().get(&format!("api/v2/edge/app/{app_id}")).await
    }

    pub async fn create_edge_app(&self, app: &EdgeApp) -> LynxResult<EdgeApp> {
        self.http().post("api/v2/edge/app", app).await
    }

    /// Download the packaged app for `version`
    pub async fn download_edge_app(&self, app_id: i64, version: &str) -> LynxResult<Vec<u8>> {
        let request = self
            .http()
            .request(Method::GET, &format!("api/v2/edge/app/{app_id}/download"))
            .query(&[("version", version)]);
        self.http().execute_bytes(request).await
    }

    /// List versions; `untagged` includes revisions without a name
    pub async fn get_edge_app_versions(
        &self,
        app_id: i64,
        untagged: bool,
    ) -> LynxResult<Vec<EdgeAppVersion>> {
        self.http()
            .get_query(
                &format!("api/v2/edge/app/{app_id}/version"),
                &[("untagged", untagged)],
            )
            .await
    }

    /// Upload app sources, returning the hash of the new version
    pub async fn create_edge_app_version(
        &self,
        app_id: i64,
        lua: Option<Vec<u8>>,
        json: Option<Vec<u8>>,
    ) -> LynxResult<String> {
        let mut form = Form::new();
        if let Some(lua) = lua {
            form = form.part("app_lua", source_part(lua, "app.lua")?);
        }
        if let Some(json) = json {
            form = form.part("app_json", source_part(json, "app.json")?);
        }

        let request = self
            .http()
            .request(Method::POST, &format!("api/v2/edge/app/{app_id}/version"))
            .multipart(form);
        let created: VersionHash = self.http().execute(request).await?;
        Ok(created.hash)
    }

    /// Give an uploaded version a name, publishing it
    pub async fn name_edge_app_version(
        &self,
        app_id: i64,
        version: &EdgeAppVersion,
    ) -> LynxResult<EdgeAppVersion> {
        self.http()
            .post(&format!("api/v2/edge/app/{app_id}/publish"), version)
            .await
    }

    /// Configuration schema of a version, returned as-is
    pub async fn get_edge_app_config_options(
        &self,
        app_id: i64,
        version: &str,
    ) -> LynxResult<serde_json::Value> {
        self.http()
            .get_query(
                &format!("api/v2/edge/app/{app_id}/configure"),
                &[("version", version)],
            )
            .await
    }

    pub async fn get_configured_edge_apps(
        &self,
        installation_id: i64,
    ) -> LynxResult<Vec<EdgeAppConfig>> {
        self.http()
            .get(&format!("api/v2/edge/app/configured/{installation_id}"))
            .await
    }

    pub async fn create_edge_app_instance(
        &self,
        config: &EdgeAppConfig,
    ) -> LynxResult<EdgeAppConfig> {
        self.http()
            .post(
                &format!("api/v2/edge/app/configured/{}", config.installation_id),
                config,
            )
            .await
    }

    pub async fn get_edge_app_instance(
        &self,
        installation_id: i64,
        instance_id: i64,
    ) -> LynxResult<EdgeAppConfig> {
        self.http()
            .get(&format!(
                "api/v2/edge/app/configured/{installation_id}/{instance_id}"
            ))
            .await
    }

    pub async fn update_edge_app_instance(
        &self,
        config: &EdgeAppConfig,
    ) -> LynxResult<EdgeAppConfig> {
        self.http()
            .put(
                &format!(
                    "api/v2/edge/app/configured/{}/{}",
                    config.installation_id, config.id
                ),
                config,
            )
            .await
    }

    pub async fn delete_edge_app_instance(&self, config: &EdgeAppConfig) -> LynxResult<()> {
        self.http()
            .delete(&format!(
                "api/v2/edge/app/configured/{}/{}",
                config.installation_id, config.id
            ))
            .await
    }
}
