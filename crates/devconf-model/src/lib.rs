//! `devconf-model` – the hierarchical verify-then-apply configuration engine.
//!
//! An inbound JSON document is verified as a whole before any field is
//! committed.  The request's correlation id is echoed in `res_info` on both
//! the success and the failure path, and every write to `res_info` raises a
//! pending-notification flag that the lifecycle layer consumes.
//!
//! # Modules
//!
//! - [`validation`] – declarative field rules run during Verify.
//! - [`node`] – the [`DocumentNode`] trait and the [`ApplyContext`].
//! - [`req_info`] / [`res_info`] – the request and response leaves.
//! - [`common_settings`] – vendor-defined settings and their sub-sections.
//! - [`custom_settings`] – application-defined settings and the
//!   [`ConfigureHandler`] hook.
//! - [`document`] – the root [`ConfigurationDocument`] and its Update.
//! - [`serialize`] – bounded, NUL-terminated serialization.
//! - [`context`] – [`DeviceContext`] and [`ContextHost`].
//! - [`notifier`] – the shared pending-notification flag.

pub mod common_settings;
pub mod context;
pub mod custom_settings;
pub mod document;
pub mod node;
pub mod notifier;
pub mod req_info;
pub mod res_info;
pub mod serialize;
pub mod validation;

pub use common_settings::CommonSettings;
pub use context::{ContextHost, DeviceContext};
pub use custom_settings::{ConfigureHandler, CustomSettings, NoopConfigure};
pub use document::{Collaborators, ConfigurationDocument};
pub use node::{ApplyContext, DocumentNode, LifecycleRequests};
pub use notifier::Notifier;
pub use req_info::ReqInfo;
pub use res_info::ResInfo;
pub use serialize::SerializedState;
pub use validation::{Constraint, Validation};
