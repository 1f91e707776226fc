//! HTTP utilities for GCP REST API calls

use crate::error::{Result, TagError};
use crate::events::{Event, EventSink};
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate long bodies and strip control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
    sink: Arc<dyn EventSink>,
}

impl GcpHttpClient {
    pub fn new(sink: Arc<dyn EventSink>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tagbind/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, sink })
    }

    /// Send a request and decode the JSON answer.
    ///
    /// Empty bodies (204 or zero-length 200) decode to `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.sink.record(&Event::RequestSent {
            method: method.to_string(),
            url: url.to_string(),
        });

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = body {
            tracing::debug!("Request body: {}", body);
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_body = response.text().await?;

        self.sink.record(&Event::ResponseReceived {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
        });

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(TagError::RequestFailure {
                status: status.as_u16(),
                body: response_body,
            });
        }

        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&response_body)?)
    }

    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        self.send(Method::GET, url, token, None).await
    }

    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        self.send(Method::POST, url, token, body).await
    }

    pub async fn delete(&self, url: &str, token: &str) -> Result<Value> {
        self.send(Method::DELETE, url, token, None).await
    }
}

/// A short, user-facing hint for common API failures
pub fn error_hint(error: &TagError) -> Option<&'static str> {
    match error {
        TagError::RequestFailure { status, .. } => match status {
            400 => Some("Invalid request. Check the resource name and tag value format."),
            401 => Some("Authentication failed. Check the service-account key file."),
            403 => Some("Permission denied. The account needs the Tag User role on the resource and tag value."),
            404 => Some("Resource not found. Check the name and the location argument."),
            409 => Some("The tag binding already exists."),
            429 => Some("Rate limit exceeded. Please try again later."),
            500 | 503 => Some("GCP service temporarily unavailable. Please try again."),
            _ => None,
        },
        TagError::Credential { .. } | TagError::Token(_) => {
            Some("Pass a valid service-account JSON key as the credentials file.")
        }
        TagError::Timeout { .. } => {
            Some("The operation may still complete server-side; list the bindings to check.")
        }
        _ => None,
    }
}
