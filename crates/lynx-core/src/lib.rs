//! Lynx Core - entity metadata and reading formatting
//!
//! This crate holds the parts of the Lynx client that do not touch the network:
//!
//! - **Meta**: the free-form string map every platform entity carries
//! - **FormatRules**: metadata parsed into an explicit formatting rule set
//! - **printf**: rendering of a single reading into a format template
//!
//! ```
//! use lynx_core::{format_value, Meta};
//!
//! let meta: Meta = [("format", "%.1f°C")].into_iter().collect();
//! assert_eq!(format_value(&meta, 21.22222, ""), "21.2°C");
//! ```

pub mod format;
pub mod meta;

pub use format::{format_value, printf, FormatRules, StateRule, Strategy, DEFAULT_TOPIC};
pub use meta::{Meta, MetaError, MetaObject, MetaResult};
