//! GCP Client
//!
//! Combines credentials and the HTTP client behind [`JsonGateway`], the only
//! transport contract the tagging layer depends on.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::error::Result;
use crate::events::EventSink;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Authenticated JSON calls: (method, URL, optional body) -> parsed JSON.
///
/// Non-2xx answers must surface as `TagError::RequestFailure`; empty bodies
/// as `Value::Null`.
#[async_trait]
pub trait JsonGateway: Send + Sync {
    async fn call(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value>;

    async fn get(&self, url: &str) -> Result<Value> {
        self.call(Method::GET, url, None).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.call(Method::POST, url, Some(body)).await
    }

    async fn delete(&self, url: &str) -> Result<Value> {
        self.call(Method::DELETE, url, None).await
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
}

impl GcpClient {
    pub fn new(credentials: GcpCredentials, sink: Arc<dyn EventSink>) -> Result<Self> {
        let http = GcpHttpClient::new(sink)?;
        Ok(Self { credentials, http })
    }
}

#[async_trait]
impl JsonGateway for GcpClient {
    async fn call(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.send(method, url, &token, body).await
    }
}
