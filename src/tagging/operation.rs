//! Long-running operations
//!
//! A mutating call answers either with the final resource or with an
//! operation handle. [`OperationPoller::complete`] turns both into a single
//! result:
//!
//! ```text
//! SUBMITTED --no operation name--> SUCCEEDED
//!     |
//!     v
//!  POLLING --done, no error--> SUCCEEDED (response, else the operation)
//!     |----done, error-------> FAILED    (TagError::Operation)
//!     `----budget exceeded---> TIMED_OUT (TagError::Timeout)
//! ```
//!
//! The first poll is immediate; later polls wait `interval` each. A poll
//! request still in flight when the budget runs out is abandoned.

use crate::error::{Result, TagError};
use crate::events::{Event, EventSink};
use crate::gcp::client::JsonGateway;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use super::endpoint::EndpointResolver;
use super::model::Operation;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::Polling => "POLLING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
        };
        f.write_str(s)
    }
}

pub struct OperationPoller<'a, G: JsonGateway + ?Sized> {
    gateway: &'a G,
    resolver: &'a EndpointResolver,
    settings: PollSettings,
    sink: &'a dyn EventSink,
}

impl<'a, G: JsonGateway + ?Sized> OperationPoller<'a, G> {
    pub fn new(
        gateway: &'a G,
        resolver: &'a EndpointResolver,
        settings: PollSettings,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            gateway,
            resolver,
            settings,
            sink,
        }
    }

    /// URL an operation is fetched from.
    ///
    /// Names already pointing at a regional host are used as they are;
    /// relative names hang off the global endpoint.
    pub fn operation_url(&self, name: &str) -> String {
        if name.starts_with("https://") || name.starts_with("http://") {
            return name.to_string();
        }

        let relative = name.trim_start_matches('/');
        if name.contains(&self.resolver.regional_marker()) {
            format!("{}://{}", self.resolver.scheme(), relative)
        } else {
            format!("{}/{}", self.resolver.global_base_url(), relative)
        }
    }

    /// Drive the response of a mutating call to a terminal state
    pub async fn complete(&self, submitted: Value) -> Result<Value> {
        let Some(operation) = Operation::detect(&submitted)? else {
            tracing::debug!("{} -> {}: no operation in response", PollState::Submitted, PollState::Succeeded);
            return Ok(submitted);
        };

        if operation.done {
            return finish(operation, submitted);
        }

        tracing::info!(
            "{} -> {}: operation {}",
            PollState::Submitted,
            PollState::Polling,
            operation.name
        );
        self.poll(&operation.name).await
    }

    async fn poll(&self, name: &str) -> Result<Value> {
        let url = self.operation_url(name);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let remaining = self.settings.timeout.saturating_sub(started.elapsed());
            let raw = match tokio::time::timeout(remaining, self.gateway.get(&url)).await {
                Ok(response) => response?,
                Err(_) => {
                    tracing::warn!(
                        "{} -> {}: operation {} poll {} still pending at deadline",
                        PollState::Polling,
                        PollState::TimedOut,
                        name,
                        attempt
                    );
                    return Err(self.timed_out(name));
                }
            };
            let mut snapshot = Operation::parse(&raw)?;
            if snapshot.name.is_empty() {
                snapshot.name = name.to_string();
            }

            self.sink.record(&Event::OperationPolled {
                name: name.to_string(),
                attempt,
                done: snapshot.done,
            });

            if snapshot.done {
                return finish(snapshot, raw);
            }

            if started.elapsed() >= self.settings.timeout {
                tracing::warn!(
                    "{} -> {}: operation {} after {} polls",
                    PollState::Polling,
                    PollState::TimedOut,
                    name,
                    attempt
                );
                return Err(self.timed_out(name));
            }

            tokio::time::sleep(self.settings.interval).await;
        }
    }

    fn timed_out(&self, name: &str) -> TagError {
        TagError::Timeout {
            name: name.to_string(),
            timeout: self.settings.timeout,
        }
    }
}

fn finish(operation: Operation, raw: Value) -> Result<Value> {
    if let Some(error) = operation.error {
        tracing::warn!("{}: operation {} returned {}", PollState::Failed, operation.name, error);
        return Err(TagError::Operation {
            name: operation.name,
            error,
        });
    }

    tracing::info!("{}: operation {}", PollState::Succeeded, operation.name);

    Ok(operation.response.unwrap_or(raw))
}
