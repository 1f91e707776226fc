//! Typed API payloads
//!
//! Raw JSON from the gateway is turned into these types right where it enters
//! the tagging layer.

use crate::error::{Result, TagError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::names::TAG_BINDINGS_PREFIX;

/// Association between a resource and a tag value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagBinding {
    /// Server-assigned, `tagBindings/...`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Canonical name of the bound resource
    pub parent: String,
    /// `tagValues/<id>`
    pub tag_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_value_namespaced: Option<String>,
}

impl TagBinding {
    pub fn new(parent: impl Into<String>, tag_value: impl Into<String>) -> Self {
        Self {
            name: None,
            parent: parent.into(),
            tag_value: tag_value.into(),
            tag_value_namespaced: None,
        }
    }

    /// Body of a create request: `{"parent": ..., "tagValue": ...}`
    pub fn create_body(&self) -> Value {
        serde_json::json!({
            "parent": self.parent,
            "tagValue": self.tag_value,
        })
    }
}

/// Snapshot of a long-running operation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl Operation {
    /// Read `value` as an operation handle.
    ///
    /// An object counts as an operation when it has a string `name` and either
    /// a `done` field or a name outside `tagBindings/`. A binding returned
    /// synchronously also has a `name`, so the name alone is not enough.
    pub fn detect(value: &Value) -> Result<Option<Self>> {
        let Some(object) = value.as_object() else {
            return Ok(None);
        };
        let Some(name) = object.get("name").and_then(Value::as_str) else {
            return Ok(None);
        };
        if !object.contains_key("done") && name.starts_with(TAG_BINDINGS_PREFIX) {
            return Ok(None);
        }

        Self::parse(value).map(Some)
    }

    pub fn parse(value: &Value) -> Result<Self> {
        Operation::deserialize(value)
            .map_err(|e| TagError::InvalidResponse(format!("operation: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTagBindingsResponse {
    #[serde(default)]
    tag_bindings: Vec<TagBinding>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// One fetch of a paginated list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl Page<TagBinding> {
    /// Empty bodies are an empty last page; an empty token ends pagination
    pub fn from_list_response(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self {
                items: Vec::new(),
                next_page_token: None,
            });
        }

        let response: ListTagBindingsResponse = serde_json::from_value(value)
            .map_err(|e| TagError::InvalidResponse(format!("tag bindings list: {}", e)))?;

        Ok(Self {
            items: response.tag_bindings,
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}
