//! Lynx REST resources
//!
//! Each module holds the resource models and the `LynxClient` methods that
//! operate on them.

mod device;
mod edge_app;
mod file;
mod function;
mod installation;
mod log;
mod meta;
mod notification;
mod organization;
mod schedule;
mod trace;
mod user;

pub use device::Device;
pub use edge_app::{EdgeApp, EdgeAppConfig, EdgeAppVersion, Publisher};
pub use file::{File, FileOwner};
pub use function::{Function, FunctionListExt};
pub use installation::{Installation, InstallationRow};
pub use log::{LogEntry, LogOptions, Status, V3Log};
pub use meta::MetaOwner;
pub use notification::{
    NotificationExecutorPayload, NotificationMessage, NotificationOutput,
    NotificationOutputExecutor,
};
pub use organization::{Organization, OrganizationChild, OrganizationListExt};
pub use schedule::Schedule;
pub use trace::{TraceAction, TraceEntry, TraceObjectType, TraceOptions, TracePage};
pub use user::User;
