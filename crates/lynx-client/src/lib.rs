//! Lynx Client Crate - IoT Open Lynx platform client
//!
//! Typed async access to the Lynx REST API plus a small MQTT wrapper for
//! telemetry.
//!
//! ## Features
//!
//! - **REST resources** - installations, devices, functions, organizations,
//!   users, schedules, notifications, edge apps, files, traces, status and log
//! - **Authentication** - basic, API key or bearer token, shared by HTTP and MQTT
//! - **Value formatting** - `Function::format_value` renders readings from metadata
//! - **MQTT** - publish telemetry `Message`s and receive subscribed topics
//!
//! ## Quick Start
//!
//! ```no_run
//! use lynx_client::{Auth, Filter, LynxClient, LynxConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LynxConfig::new("https://lynx.iotopen.se", Auth::api_key("my-key"));
//!     let client = LynxClient::new(config)?;
//!
//!     for function in client.get_functions(1234, &Filter::new()).await? {
//!         println!("{}: {}", function.id, function.format_value(21.5, ""));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod mqtt;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use api::*;
pub use auth::Auth;
pub use client::{HttpClient, LynxClient, V3Client};
pub use config::{ConfigError, ConfigLoader, LynxConfig, MqttConfig};
pub use error::{LynxError, LynxResult};
pub use lynx_core::{format_value, FormatRules, Meta, MetaError, MetaObject};
pub use mqtt::{
    BrokerAddress, ConnectionHandlers, ConnectionState, IncomingMessage, Message, MqttClient,
    MqttMessage, Qos,
};
pub use types::{Address, Filter, LogOrder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
