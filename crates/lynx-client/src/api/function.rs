//! Functions (sensor and actuator points)

use crate::client::LynxClient;
use crate::error::LynxResult;
use crate::types::Filter;
use lynx_core::{FormatRules, Meta};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Function {
    pub id: i64,
    #[serde(rename = "type")]
    pub function_type: String,
    pub installation_id: i64,
    pub meta: Meta,
    pub protected_meta: Meta,
    pub created: i64,
    pub updated: i64,
}

impl Function {
    /// Formatting rules derived from the public metadata
    pub fn format_rules(&self) -> FormatRules {
        FormatRules::from_meta(&self.meta)
    }

    /// Render a reading for display
    ///
    /// An empty `topic_key` means `read`.
    pub fn format_value(&self, value: f64, topic_key: &str) -> String {
        self.format_rules().format(value, topic_key)
    }

    /// Named states (`state_<name>`) and their values
    pub fn states(&self) -> HashMap<String, f64> {
        self.format_rules().state_values()
    }
}

/// Lookups over a list of functions
pub trait FunctionListExt {
    fn map_by_id(&self) -> HashMap<i64, &Function>;

    /// Index by a metadata value; functions without the key land under `""`
    fn map_by(&self, key: &str) -> HashMap<String, &Function>;

    /// Group by a metadata value
    fn map_by_list(&self, key: &str) -> HashMap<String, Vec<&Function>>;
}

impl FunctionListExt for [Function] {
    fn map_by_id(&self) -> HashMap<i64, &Function> {
        self.iter().map(|f| (f.id, f)).collect()
    }

    fn map_by(&self, key: &str) -> HashMap<String, &Function> {
        self.iter()
            .map(|f| (f.meta.get(key).unwrap_or_default().to_string(), f))
            .collect()
    }

    fn map_by_list(&self, key: &str) -> HashMap<String, Vec<&Function>> {
        let mut grouped: HashMap<String, Vec<&Function>> = HashMap::new();
        for function in self {
            grouped
                .entry(function.meta.get(key).unwrap_or_default().to_string())
                .or_default()
                .push(function);
        }
        grouped
    }
}

impl LynxClient {
    pub async fn get_functions(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> LynxResult<Vec<Function>> {
        self.http()
            .get_query(&format!("api/v2/functionx/{installation_id}"), filter)
            .await
    }

    pub async fn get_function(
        &self,
        installation_id: i64,
        function_id: i64,
    ) -> LynxResult<Function> {
        self.http()
            .get(&format!("api/v2/functionx/{installation_id}/{function_id}"))
            .await
    }

    pub async fn create_function(&self, function: &Function) -> LynxResult<Function> {
        self.http()
            .post(
                &format!("api/v2/functionx/{}", function.installation_id),
                function,
            )
            .await
    }

    pub async fn update_function(&self, function: &Function) -> LynxResult<Function> {
        self.http()
            .put(
                &format!(
                    "api/v2/functionx/{}/{}",
                    function.installation_id, function.id
                ),
                function,
            )
            .await
    }

    pub async fn delete_function(&self, function: &Function) -> LynxResult<()> {
        self.http()
            .delete(&format!(
                "api/v2/functionx/{}/{}",
                function.installation_id, function.id
            ))
            .await
    }
}
