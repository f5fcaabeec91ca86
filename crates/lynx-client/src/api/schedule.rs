//! Schedules

use crate::client::LynxClient;
use crate::error::LynxResult;
use serde::{Deserialize, Serialize};

/// Cron-like job that publishes `value` on `topic`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub id: i64,
    pub installation_id: i64,
    /// Where the schedule runs, e.g. `gateway` or `cloud`
    pub executor: String,
    pub active: bool,
    pub day_of_week: String,
    pub day_of_month: String,
    pub month: String,
    pub hour: String,
    pub minute: String,
    pub topic: String,
    pub value: f64,
    pub created: i64,
    pub updated: i64,
}

impl LynxClient {
    /// List schedules, optionally only those for one executor
    pub async fn get_schedules(
        &self,
        installation_id: i64,
        executor: Option<&str>,
    ) -> LynxResult<Vec<Schedule>> {
        let path = format!("api/v2/schedule/{installation_id}");
        match executor.filter(|e| !e.is_empty()) {
            Some(executor) => {
                self.http()
                    .get_query(&path, &[("executor", executor)])
                    .await
            }
            None => self.http().get(&path).await,
        }
    }

    pub async fn get_schedule(
        &self,
        installation_id: i64,
        schedule_id: i64,
    ) -> LynxResult<Schedule> {
        self.http()
            .get(&format!("api/v2/schedule/{installation_id}/{schedule_id}"))
            .await
    }

    pub async fn create_schedule(&self, schedule: &Schedule) -> LynxResult<Schedule> {
        self.http()
            .post(&format!("api/v2/schedule/{}", schedule.installation_id), schedule)
            .await
    }

    pub async fn update_schedule(&self, schedule: &Schedule) -> LynxResult<Schedule> {
        self.http()
            .put(
                &format!(
                    "api/v2/schedule/{}/{}",
                    schedule.installation_id, schedule.id
                ),
                schedule,
            )
            .await
    }

    pub async fn delete_schedule(&self, schedule: &Schedule) -> LynxResult<()> {
        self.http()
            .delete(&format!(
                "api/v2/schedule/{}/{}",
                schedule.installation_id, schedule.id
            ))
            .await
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
    async fn test_get_schedules_by_executor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/schedule/6"))
            .and(query_param("executor", "gateway"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "installation_id": 6, "executor": "gateway", "active": true,
                 "hour": "7", "minute": "30", "day_of_week": "1-5", "day_of_month": "*",
                 "month": "*", "topic": "obj/zwave/1/set", "value": 1}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let schedules = client_for(&server)
            .get_schedules(6, Some("gateway"))
            .await
            .unwrap();
        assert_eq!(schedules[0].day_of_week, "1-5");
        assert_eq!(schedules[0].value, 1.0);
    }

    #[tokio::test]
    async fn test_create_schedule() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/schedule/6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 9, "installation_id": 6, "executor": "cloud", "active": false
            })))
            .mount(&server)
            .await;

        let schedule = Schedule {
            installation_id: 6,
            executor: "cloud".to_string(),
            ..Default::default()
        };
        let created = client_for(&server).create_schedule(&schedule).await.unwrap();
        assert_eq!(created.id, 9);
    }
}
