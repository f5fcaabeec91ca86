//! Single-key metadata operations

use crate::client::LynxClient;
use crate::error::LynxResult;
use lynx_core::MetaObject;
use reqwest::Method;

/// Entity owning a metadata key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaOwner {
    Installation(i64),
    Function {
        installation_id: i64,
        function_id: i64,
    },
    Organization(i64),
}

impl MetaOwner {
    fn path(&self, key: &str) -> String {
        match self {
            MetaOwner::Installation(id) => format!("api/v2/installation/{id}/meta/{key}"),
            MetaOwner::Function {
                installation_id,
                function_id,
            } => format!("api/v2/functionx/{installation_id}/{function_id}/meta/{key}"),
            MetaOwner::Organization(id) => format!("api/v2/organization/{id}/meta/{key}"),
        }
    }
}

impl LynxClient {
    pub async fn get_meta(&self, owner: MetaOwner, key: &str) -> LynxResult<MetaObject> {
        self.http().get(&owner.path(key)).await
    }

    /// Create a key; `silent` suppresses change notifications
    pub async fn create_meta(
        &self,
        owner: MetaOwner,
        key: &str,
        meta: &MetaObject,
        silent: bool,
    ) -> LynxResult<MetaObject> {
        let request = self
            .http()
            .request_json(Method::POST, &owner.path(key), meta)
            .query(&[("silent", silent)]);
        self.http().execute(request).await
    }

    /// Update a key, creating it when missing if `create_missing` is set
    pub async fn update_meta(
        &self,
        owner: MetaOwner,
        key: &str,
        meta: &MetaObject,
        silent: bool,
        create_missing: bool,
    ) -> LynxResult<MetaObject> {
        let request = self
            .http()
            .request_json(Method::PUT, &owner.path(key), meta)
            .query(&[("silent", silent), ("create_missing", create_missing)]);
        self.http().execute(request).await
    }

    pub async fn delete_meta(&self, owner: MetaOwner, key: &str, silent: bool) -> LynxResult<()> {
        let request = self
            .http()
            .request(Method::DELETE, &owner.path(key))
            .query(&[("silent", silent)]);
        self.http().execute_empty(request).await
    }
}
