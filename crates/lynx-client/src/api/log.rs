//! Current status and value log

use crate::client::{LynxClient, V3Client};
use crate::error::{LynxError, LynxResult};
use crate::types::{nullable, LogOrder};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// One logged value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    pub client_id: i64,
    pub installation_id: i64,
    #[serde(rename = "msg")]
    pub message: String,
    pub timestamp: f64,
    pub topic: String,
    pub value: f64,
}

/// Latest entry per topic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(#[serde(deserialize_with = "nullable")] pub Vec<LogEntry>);

impl Status {
    /// Index entries by topic
    pub fn map(&self) -> HashMap<&str, &LogEntry> {
        self.0
            .iter()
            .map(|entry| (entry.topic.as_str(), entry))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<LogEntry> {
        self.0
    }
}

/// One page of the v3 log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct V3Log {
    pub total: i64,
    #[serde(rename = "last")]
    pub last_time: f64,
    pub count: i64,
    #[serde(deserialize_with = "nullable")]
    pub data: Vec<LogEntry>,
}

/// v3 log query
#[derive(Debug, Clone, PartialEq)]
pub struct LogOptions {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: i64,
    pub offset: i64,
    pub order: LogOrder,
    /// Topics to include, all when empty
    pub topics: Vec<String>,
}

impl Default for LogOptions {
    /// The last 24 hours, newest first, 500 entries
    fn default() -> Self {
        let now = Utc::now();
        Self {
            from: now - Duration::hours(24),
            to: now,
            limit: 500,
            offset: 0,
            order: LogOrder::Desc,
            topics: Vec::new(),
        }
    }
}

impl LogOptions {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("from", self.from.timestamp().to_string()),
            ("to", self.to.timestamp().to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("order", self.order.as_str().to_string()),
        ]
    }
}

fn topics_query(topics: &[String]) -> Vec<(&'static str, &str)> {
    topics.iter().map(|topic| ("topics", topic.as_str())).collect()
}

/// Run `get`; if the URI is too long, retry as `post` with the topics in
/// the body. A server without POST support yields the original error.
async fn with_post_fallback<T: DeserializeOwned>(
    client: &LynxClient,
    get: RequestBuilder,
    post: RequestBuilder,
) -> LynxResult<T> {
    let err: LynxError = match client.http().execute(get).await {
        Err(err) if err.is_status(414) => err,
        other => return other,
    };

    warn!("Topic filter too long for query string, retrying as POST");
    match client.http().execute(post).await {
        Err(post_err) if post_err.is_status(405) => Err(err),
        other => other,
    }
}

impl LynxClient {
    /// Latest value of each topic, optionally limited to `topics`
    pub async fn status(&self, installation_id: i64, topics: &[String]) -> LynxResult<Status> {
        let path = format!("api/v2/status/{installation_id}");
        let get = self
            .http()
            .request(Method::GET, &path)
            .query(&topics_query(topics));
        let post = self.http().request_json(Method::POST, &path, topics);
        with_post_fallback(self, get, post).await
    }
}

impl V3Client<'_> {
    /// Logged values; `None` means [`LogOptions::default`]
    pub async fn log(
        &self,
        installation_id: i64,
        options: Option<&LogOptions>,
    ) -> LynxResult<V3Log> {
        let defaults;
        let options = match options {
            Some(options) => options,
            None => {
                defaults = LogOptions::default();
                &defaults
            }
        };

        let path = format!("api/v3beta/log/{installation_id}");
        let query = options.query();
        let get = self
            .http()
            .request(Method::GET, &path)
            .query(&query)
            .query(&topics_query(&options.topics));
        let post = self
            .http()
            .request_json(Method::POST, &path, &options.topics)
            .query(&query);
        with_post_fallback(self.client, get, post).await
    }
}
