//! tagbind
//!
//! Manage GCP tag bindings (resource <-> tag value associations) through the
//! Cloud Resource Manager v3 API.
//!
//! - [`gcp`] - Credentials, HTTP, and the JSON gateway
//! - [`tagging`] - Names, endpoints, operation polling, binding operations
//! - [`config`] - Settings file and CLI overrides
//! - [`events`] - Observability hooks

pub mod config;
pub mod error;
pub mod events;
pub mod gcp;
pub mod tagging;

pub use error::{Result, TagError};
