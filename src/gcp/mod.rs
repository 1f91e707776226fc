//! GCP API interaction module
//!
//! Authentication, the HTTP client, and the JSON gateway the tagging layer
//! talks through.
//!
//! # Module Structure
//!
//! - [`auth`] - Service-account credentials and token caching
//! - [`client`] - [`client::JsonGateway`] and its authenticated implementation
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use tagbind::gcp::{auth::GcpCredentials, client::{GcpClient, JsonGateway}};
//!
//! async fn example() -> tagbind::Result<()> {
//!     let credentials = GcpCredentials::from_service_account_file("key.json")?;
//!     let client = GcpClient::new(credentials, tagbind::events::default_sink())?;
//!     let bindings = client
//!         .get("https://cloudresourcemanager.googleapis.com/v3/tagBindings?parent=...")
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
