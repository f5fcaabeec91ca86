//! Audit trace

use crate::client::LynxClient;
use crate::error::LynxResult;
use crate::types::{nullable, LogOrder};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Generates a string-backed enum that keeps unknown values
///
/// JSON `null` reads as the empty string.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "Option<String>", into = "String")]
        pub enum $name {
            $($variant,)*
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $value,)*
                    $name::Other(value) => value,
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($value => $name::$variant,)*
                    _ => $name::Other(value),
                }
            }
        }

        impl From<Option<String>> for $name {
            fn from(value: Option<String>) -> Self {
                Self::from(value.unwrap_or_default())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::from(String::new())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Kind of object a trace entry refers to
    TraceObjectType {
        None => "",
        Installation => "installation",
        Gateway => "gateway",
        Organization => "organization",
        User => "user",
        Device => "device",
        Function => "function",
        Schedule => "schedule",
        NotificationOutput => "notification_output",
        NotificationMessage => "notification_message",
        OutputExecutor => "output_executor",
        EdgeApp => "edge_app",
        EdgeAppInstance => "edge_app_instance",
        File => "file",
        Role => "role",
        GatewayRegistrationPolicy => "gateway_registration_policy",
        UserRegistrationPolicy => "user_registration_policy",
        Mqtt => "mqtt",
        Trace => "trace",
    }
}

string_enum! {
    /// What happened to the object
    TraceAction {
        None => "",
        Create => "create",
        Delete => "delete",
        Update => "update",
        View => "view",
        Failed => "failed",
        Execute => "execute",
        Auth => "auth",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceEntry {
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub method: String,
    pub timestamp: f64,
    pub user_id: i64,
    pub action: TraceAction,
    pub object_type: TraceObjectType,
    pub object_id: i64,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
}

/// One page of trace entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracePage {
    pub total: i64,
    #[serde(rename = "last")]
    pub last_time: f64,
    pub count: i64,
    #[serde(deserialize_with = "nullable")]
    pub data: Vec<TraceEntry>,
}

/// Trace query
///
/// Selects by `object_type` and `object_id` when a type is set, otherwise
/// by trace `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceOptions {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: i64,
    pub offset: i64,
    pub order: LogOrder,
    pub object_type: TraceObjectType,
    pub object_id: i64,
    pub id: String,
    pub action: Option<TraceAction>,
}

impl Default for TraceOptions {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            from: now - Duration::hours(24),
            to: now,
            limit: 500,
            offset: 0,
            order: LogOrder::Desc,
            object_type: TraceObjectType::None,
            object_id: 0,
            id: String::new(),
            action: None,
        }
    }
}

impl TraceOptions {
    /// Traces for one object
    pub fn for_object(object_type: TraceObjectType, object_id: i64) -> Self {
        Self {
            object_type,
            object_id,
            ..Default::default()
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("from", self.from.timestamp().to_string()),
            ("to", self.to.timestamp().to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("order", self.order.as_str().to_string()),
        ];
        if self.object_type != TraceObjectType::None {
            query.push(("object_type", self.object_type.to_string()));
            query.push(("object_id", self.object_id.to_string()));
        } else {
            query.push(("id", self.id.clone()));
        }
        if let Some(action) = &self.action {
            query.push(("action", action.to_string()));
        }
        query
    }
}

impl LynxClient {
    pub async fn get_traces(&self, options: &TraceOptions) -> LynxResult<TracePage> {
        self.http().get_query("api/v2/trace", &options.query()).await
    }
}
