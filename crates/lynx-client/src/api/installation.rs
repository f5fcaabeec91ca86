//! Installations

use crate::client::LynxClient;
use crate::error::{LynxError, LynxResult};
use crate::types::{nullable, Filter};
use lynx_core::Meta;
use serde::{Deserialize, Serialize};

/// Installation as seen by the current user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Installation {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    pub timezone: String,
    #[serde(deserialize_with = "nullable")]
    pub capabilities: Vec<String>,
    pub organization_id: i64,
    pub assigned: bool,
}

/// Full installation record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationRow {
    pub id: i64,
    pub name: String,
    pub client_id: i64,
    pub created: i64,
    pub organization_id: i64,
    pub notes: String,
    #[serde(deserialize_with = "nullable")]
    pub users: Vec<i64>,
    pub meta: Meta,
    pub protected_meta: Meta,
}

impl LynxClient {
    /// List installation records matching `filter`
    pub async fn list_installations(&self, filter: &Filter) -> LynxResult<Vec<InstallationRow>> {
        self.http().get_query("api/v2/installation", filter).await
    }

    pub async fn get_installation_row(&self, installation_id: i64) -> LynxResult<InstallationRow> {
        self.http()
            .get(&format!("api/v2/installation/{installation_id}"))
            .await
    }

    pub async fn update_installation(&self, row: &InstallationRow) -> LynxResult<InstallationRow> {
        self.http()
            .put(&format!("api/v2/installation/{}", row.id), row)
            .await
    }

    /// Installations visible to the user, optionally only assigned ones
    pub async fn get_installations(&self, assigned_only: bool) -> LynxResult<Vec<Installation>> {
        self.http()
            .get_query("api/v2/installationinfo", &[("assigned", assigned_only)])
            .await
    }

    /// Look up one installation among all visible ones
    pub async fn get_installation(&self, installation_id: i64) -> LynxResult<Installation> {
        self.get_installations(false)
            .await?
            .into_iter()
            .find(|installation| installation.id == installation_id)
            .ok_or_else(LynxError::not_found)
    }

    pub async fn get_installation_by_client_id(
        &self,
        client_id: i64,
        assigned_only: bool,
    ) -> LynxResult<Installation> {
        self.http()
            .get_query(
                &format!("api/v2/installationinfo/{client_id}"),
                &[("assigned", assigned_only)],
            )
            .await
    }
}
