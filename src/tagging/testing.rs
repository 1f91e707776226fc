//! Scripted gateway for unit tests

use crate::error::{Result, TagError};
use crate::gcp::client::JsonGateway;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// Answers calls from a queue, in order, and records every call.
/// Once the queue is empty the fallback (if any) is returned forever.
#[derive(Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<Value>>>,
    fallback: Option<Value>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn with_fallback(mut self, value: Value) -> Self {
        self.fallback = Some(value);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonGateway for ScriptedGateway {
    async fn call(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            body: body.cloned(),
        });

        let next = self.responses.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(response), _) => response,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(TagError::InvalidResponse(format!(
                "no scripted response for {}",
                url
            ))),
        }
    }
}
