//! Tag bindings
//!
//! Everything between the CLI and the JSON gateway: resource-name encoding,
//! endpoint selection, long-running operation polling and the binding
//! operations themselves.
//!
//! # Architecture
//!
//! - [`names`] - Canonical resource names and tag-binding name encodings
//! - [`endpoint`] - Global vs regional API base URLs
//! - [`model`] - Typed API payloads (bindings, operations, pages)
//! - [`operation`] - Drives mutating calls to a terminal state
//! - [`service`] - Create, delete and list operations
//!
//! # Example
//!
//! ```ignore
//! use tagbind::tagging::{EndpointResolver, PollSettings, TagBindingService};
//!
//! async fn tag_vm(client: GcpClient) -> tagbind::Result<()> {
//!     let service = TagBindingService::new(
//!         client,
//!         EndpointResolver::default(),
//!         PollSettings::default(),
//!         tagbind::events::default_sink(),
//!     );
//!     let vm = "//compute.googleapis.com/projects/p/zones/us-central1-a/instances/vm";
//!     service.create(vm, "tagValues/123", Some("us-central1-a")).await?;
//!     Ok(())
//! }
//! ```

pub mod endpoint;
pub mod model;
pub mod names;
pub mod operation;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use endpoint::{EndpointResolver, ResourceLocation, DEFAULT_API_ENDPOINT};
pub use model::{Operation, Page, TagBinding};
pub use names::{
    encode_tag_binding_name, format_resource_name, normalize_resource_name, tag_binding_path,
    ResourceKind,
};
pub use operation::{OperationPoller, PollSettings};
pub use service::{Created, DeleteTarget, TagBindingService};
