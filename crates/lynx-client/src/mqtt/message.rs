//! MQTT payload types

use crate::error::{LynxError, LynxResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Quality of service for publishes and subscriptions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qos {
    /// At most once delivery
    #[default]
    AtMostOnce,
    /// At least once delivery
    AtLeastOnce,
    /// Exactly once delivery
    ExactlyOnce,
}

impl From<Qos> for rumqttc::QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => rumqttc::QoS::AtMostOnce,
            Qos::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            Qos::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

impl TryFrom<u8> for Qos {
    type Error = LynxError;

    fn try_from(value: u8) -> LynxResult<Self> {
        match value {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(LynxError::InvalidOptions(format!("invalid QoS level {other}"))),
        }
    }
}

/// Telemetry payload published on Lynx topics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub value: f64,

    /// Seconds since the Unix epoch, fractions allowed
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: f64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

impl Message {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    /// Message stamped with the current time
    pub fn now(value: f64) -> Self {
        let now = Utc::now();
        Self {
            value,
            timestamp: now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6,
            msg: String::new(),
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = msg.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Timestamp as a UTC instant
    pub fn time(&self) -> DateTime<Utc> {
        let whole = self.timestamp.trunc();
        let nanos = ((self.timestamp - whole) * 1e9) as i64;
        Utc.timestamp_opt(whole as i64, 0)
            .single()
            .map(|t| t + chrono::Duration::nanoseconds(nanos))
            .unwrap_or_default()
    }
}

/// A message bound for a topic
#[derive(Debug, Clone, PartialEq)]
pub struct MqttMessage {
    pub topic: String,
    pub qos: Qos,
    pub msg: Message,
}

impl MqttMessage {
    pub fn new(topic: impl Into<String>, msg: Message) -> Self {
        Self {
            topic: topic.into(),
            qos: Qos::default(),
            msg,
        }
    }

    pub fn with_qos(mut self, qos: Qos) -> Self {
        self.qos = qos;
        self
    }
}

/// A publish received on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl IncomingMessage {
    /// Decode the payload as a telemetry message
    pub fn message(&self) -> LynxResult<Message> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}
