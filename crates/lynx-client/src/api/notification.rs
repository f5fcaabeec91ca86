//! Notification messages, outputs and executors

use super::{Installation, Organization};
use crate::client::LynxClient;
use crate::error::LynxResult;
use crate::types::nullable;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationMessage {
    pub id: i64,
    pub name: String,
    pub text: String,
}

/// Binds a message template to an executor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationOutput {
    pub id: i64,
    pub name: String,
    pub installation_id: i64,
    pub notification_output_executor_id: i64,
    pub notification_message_id: i64,
    #[serde(deserialize_with = "nullable")]
    pub config: HashMap<String, String>,
}

/// Delivery channel such as email, SMS or webhook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationOutputExecutor {
    pub id: i64,
    #[serde(rename = "type")]
    pub executor_type: String,
    pub name: String,
    pub organization_id: i64,
    #[serde(deserialize_with = "nullable")]
    pub config: HashMap<String, String>,
    pub secret: String,
}

/// What an executor receives when a notification fires
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationExecutorPayload {
    pub message: String,
    #[serde(deserialize_with = "nullable")]
    pub output_config: HashMap<String, String>,
    #[serde(deserialize_with = "nullable")]
    pub executor_config: HashMap<String, String>,
    pub organization: Organization,
    pub installation: Installation,
    #[serde(deserialize_with = "nullable")]
    pub payload: HashMap<String, serde_json::Value>,
}

fn notification_path(installation_id: i64, kind: &str) -> String {
    format!("api/v2/notification/{installation_id}/{kind}")
}

impl LynxClient {
    pub async fn get_notification_messages(
        &self,
        installation_id: i64,
    ) -> LynxResult<Vec<NotificationMessage>> {
        self.http()
            .get(&notification_path(installation_id, "message"))
            .await
    }

    pub async fn get_notification_message(
        &self,
        installation_id: i64,
        message_id: i64,
    ) -> LynxResult<NotificationMessage> {
        self.http()
            .get(&format!(
                "{}/{message_id}",
                notification_path(installation_id, "message")
            ))
            .await
    }

    pub async fn create_notification_message(
        &self,
        installation_id: i64,
        message: &NotificationMessage,
    ) -> LynxResult<NotificationMessage> {
        self.http()
            .post(&notification_path(installation_id, "message"), message)
            .await
    }

    pub async fn update_notification_message(
        &self,
        installation_id: i64,
        message: &NotificationMessage,
    ) -> LynxResult<NotificationMessage> {
        self.http()
            .put(
                &format!(
                    "{}/{}",
                    notification_path(installation_id, "message"),
                    message.id
                ),
                message,
            )
            .await
    }

    pub async fn delete_notification_message(
        &self,
        installation_id: i64,
        message: &NotificationMessage,
    ) -> LynxResult<()> {
        self.http()
            .delete(&format!(
                "{}/{}",
                notification_path(installation_id, "message"),
                message.id
            ))
            .await
    }

    pub async fn get_notification_outputs(
        &self,
        installation_id: i64,
    ) -> LynxResult<Vec<NotificationOutput>> {
        self.http()
            .get(&notification_path(installation_id, "output"))
            .await
    }

    pub async fn get_notification_output(
        &self,
        installation_id: i64,
        output_id: i64,
    ) -> LynxResult<NotificationOutput> {
        self.http()
            .get(&format!(
                "{}/{output_id}",
                notification_path(installation_id, "output")
            ))
            .await
    }

    pub async fn create_notification_output(
        &self,
        output: &NotificationOutput,
    ) -> LynxResult<NotificationOutput> {
        self.http()
            .post(&notification_path(output.installation_id, "output"), output)
            .await
    }

    pub async fn update_notification_output(
        &self,
        output: &NotificationOutput,
    ) -> LynxResult<NotificationOutput> {
        self.http()
            .put(
                &format!(
                    "{}/{}",
                    notification_path(output.installation_id, "output"),
                    output.id
                ),
                output,
            )
            .await
    }

    pub async fn delete_notification_output(&self, output: &NotificationOutput) -> LynxResult<()> {
        self.http()
            .delete(&format!(
                "{}/{}",
                notification_path(output.installation_id, "output"),
                output.id
            ))
            .await
    }

    pub async fn get_notification_output_executors(
        &self,
        installation_id: i64,
    ) -> LynxResult<Vec<NotificationOutputExecutor>> {
        self.http()
            .get(&notification_path(installation_id, "executor"))
            .await
    }

    pub async fn get_notification_output_executor(
        &self,
        installation_id: i64,
        executor_id: i64,
    ) -> LynxResult<NotificationOutputExecutor> {
        self.http()
            .get(&format!(
                "{}/{executor_id}",
                notification_path(installation_id, "executor")
            ))
            .await
    }

    /// Fire an output with arbitrary template data
    pub async fn send_notification<T: Serialize + ?Sized>(
        &self,
        installation_id: i64,
        output_id: i64,
        data: &T,
    ) -> LynxResult<()> {
        let path = format!(
            "{}/{output_id}/send",
            notification_path(installation_id, "output")
        );
        let request = self.http().request_json(Method::POST, &path, data);
        self.http().execute_empty(request).await
    }
}
