//! Organizations

use crate::client::LynxClient;
use crate::error::LynxResult;
use crate::types::{nullable, Address, Filter};
use lynx_core::Meta;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub address: Address,
    pub email: String,
    pub phone: String,
    pub force_sms_login: bool,
    pub parent: i64,
    #[serde(deserialize_with = "nullable")]
    pub children: Vec<OrganizationChild>,
    pub notes: String,
    pub meta: Meta,
    pub protected_meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationChild {
    pub name: String,
    pub id: i64,
}

/// Lookups over a list of organizations
pub trait OrganizationListExt {
    fn map_by_id(&self) -> HashMap<i64, &Organization>;
}

impl OrganizationListExt for [Organization] {
    fn map_by_id(&self) -> HashMap<i64, &Organization> {
        self.iter().map(|org| (org.id, org)).collect()
    }
}

impl LynxClient {
    /// List organizations, `minimal` skips details the caller may not need
    pub async fn list_organizations(
        &self,
        minimal: bool,
        filter: &Filter,
    ) -> LynxResult<Vec<Organization>> {
        let query = filter.clone().with("minimal", minimal.to_string());
        self.http().get_query("api/v2/organization", &query).await
    }

    pub async fn get_organization(&self, organization_id: i64) -> LynxResult<Organization> {
        self.http()
            .get(&format!("api/v2/organization/{organization_id}"))
            .await
    }

    pub async fn create_organization(
        &self,
        organization: &Organization,
    ) -> LynxResult<Organization> {
        self.http().post("api/v2/organization", organization).await
    }

    pub async fn update_organization(
        &self,
        organization: &Organization,
    ) -> LynxResult<Organization> {
        self.http()
            .put(&format!("api/v2/organization/{}", organization.id), organization)
            .await
    }

    /// Delete an organization, `force` also removes what it owns
    pub async fn delete_organization(
        &self,
        organization: &Organization,
        force: bool,
    ) -> LynxResult<()> {
        let mut request = self.http().request(
            reqwest::Method::DELETE,
            &format!("api/v2/organization/{}", organization.id),
        );
        if force {
            request = request.query(&[("force", "true")]);
        }
        self.http().execute_empty(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client_for;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_organizations_minimal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organization"))
            .and(query_param("minimal", "true"))
            .and(query_param("name", "Acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Acme", "children": [{"id": 2, "name": "Acme North"}]},
                {"id": 2, "name": "Acme North", "parent": 1, "children": null}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let orgs = client_for(&server)
            .list_organizations(true, &Filter::new().with("name", "Acme"))
            .await
            .unwrap();
        let by_id = orgs.map_by_id();
        assert_eq!(by_id[&1].children[0].name, "Acme North");
        assert_eq!(by_id[&2].parent, 1);
        assert!(by_id[&2].children.is_empty());
    }

    #[tokio::test]
    async fn test_delete_organization_force() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/organization/5"))
            .and(query_param("force", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let org = Organization {
            id: 5,
            ..Default::default()
        };
        client_for(&server).delete_organization(&org, true).await.unwrap();
    }

    #[test]
    fn test_address_roundtrip_fields() {
        let org: Organization = serde_json::from_value(json!({
            "id": 1,
            "address": {"address": "Storgatan 1", "city": "Luleå", "country": "SE", "zip": "97231"}
        }))
        .unwrap();
        assert_eq!(org.address.city, "Luleå");
        assert_eq!(org.address.zip, "97231");
    }
}
