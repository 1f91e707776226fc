//! Tag binding operations
//!
//! Create, delete and list tag bindings. Every call resolves its own endpoint
//! from the location it is given; mutations are driven to completion through
//! [`OperationPoller`].

use crate::error::Result;
use crate::events::EventSink;
use crate::gcp::client::JsonGateway;
use serde_json::Value;
use std::sync::Arc;

use super::endpoint::EndpointResolver;
use super::model::{Page, TagBinding};
use super::names::{
    decode_tag_binding_name, normalize_resource_name, qualify_tag_binding_name, tag_binding_path,
    TAG_BINDINGS_PREFIX,
};
use super::operation::{OperationPoller, PollSettings};

/// Which binding a delete addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    /// `tagBindings/...` (prefix optional). Display-encoded names
    /// (`...@tagValues@123`) are accepted too.
    Name(String),
    Parts {
        resource_name: String,
        tag_value: String,
    },
}

impl DeleteTarget {
    /// Path of the binding relative to the API base URL
    pub fn path(&self) -> String {
        match self {
            Self::Name(name) => match decode_tag_binding_name(name) {
                Some((resource_name, tag_value)) => {
                    tag_binding_path(&normalize_resource_name(&resource_name), &tag_value)
                }
                None => qualify_tag_binding_name(name),
            },
            Self::Parts {
                resource_name,
                tag_value,
            } => tag_binding_path(&normalize_resource_name(resource_name), tag_value),
        }
    }
}

/// Result of a create
#[derive(Debug, Clone, PartialEq)]
pub enum Created {
    Binding(TagBinding),
    /// The operation finished but did not carry a binding
    Operation(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFilter<'a> {
    Parent(&'a str),
    TagValue(&'a str),
}

impl ListFilter<'_> {
    fn param(&self) -> (&'static str, &str) {
        match self {
            Self::Parent(resource) => ("parent", *resource),
            Self::TagValue(tag_value) => ("tagValue", *tag_value),
        }
    }
}

pub struct TagBindingService<G: JsonGateway> {
    gateway: G,
    resolver: EndpointResolver,
    poll: PollSettings,
    sink: Arc<dyn EventSink>,
}

impl<G: JsonGateway> TagBindingService<G> {
    pub fn new(
        gateway: G,
        resolver: EndpointResolver,
        poll: PollSettings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            gateway,
            resolver,
            poll,
            sink,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn poller(&self) -> OperationPoller<'_, G> {
        OperationPoller::new(&self.gateway, &self.resolver, self.poll, self.sink.as_ref())
    }

    /// Bind `tag_value` to `resource_name`
    pub async fn create(
        &self,
        resource_name: &str,
        tag_value: &str,
        location: Option<&str>,
    ) -> Result<Created> {
        let endpoint = self.resolver.resolve(location);
        let requested = TagBinding::new(normalize_resource_name(resource_name), tag_value);

        tracing::info!(
            "Creating tag binding for resource {} with tag value {} (regional: {})",
            requested.parent,
            requested.tag_value,
            endpoint.is_regional
        );

        let url = format!("{}/tagBindings", endpoint.base_url);
        let submitted = self.gateway.post(&url, &requested.create_body()).await?;
        let result = self.poller().complete(submitted).await?;

        Ok(created_from(result, requested))
    }

    pub async fn delete(&self, target: &DeleteTarget, location: Option<&str>) -> Result<()> {
        let endpoint = self.resolver.resolve(location);
        let url = format!("{}/{}", endpoint.base_url, target.path());

        tracing::info!("Deleting tag binding {:?}", target);

        let submitted = self.gateway.delete(&url).await?;
        self.poller().complete(submitted).await?;
        Ok(())
    }

    pub async fn list_for_resource(
        &self,
        resource_name: &str,
        location: Option<&str>,
    ) -> Result<Vec<TagBinding>> {
        let resource_name = normalize_resource_name(resource_name);
        tracing::info!("Listing tag bindings for resource {}", resource_name);
        self.list_all(ListFilter::Parent(&resource_name), location).await
    }

    pub async fn list_for_tag_value(
        &self,
        tag_value: &str,
        location: Option<&str>,
    ) -> Result<Vec<TagBinding>> {
        tracing::info!("Listing tag bindings for tag value {}", tag_value);
        self.list_all(ListFilter::TagValue(tag_value), location).await
    }

    /// Fetch every page, in order
    async fn list_all(&self, filter: ListFilter<'_>, location: Option<&str>) -> Result<Vec<TagBinding>> {
        let endpoint = self.resolver.resolve(location);
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_page(&endpoint.base_url, filter, page_token.as_deref())
                .await?;
            all_items.extend(page.items);

            if page.next_page_token.is_none() {
                break;
            }
            page_token = page.next_page_token;
        }

        tracing::info!("Found {} tag bindings", all_items.len());
        Ok(all_items)
    }

    async fn list_page(
        &self,
        base_url: &str,
        filter: ListFilter<'_>,
        page_token: Option<&str>,
    ) -> Result<Page<TagBinding>> {
        let url = list_url(base_url, filter, page_token);
        let response = self.gateway.get(&url).await?;
        Page::from_list_response(response)
    }
}

fn list_url(base_url: &str, filter: ListFilter<'_>, page_token: Option<&str>) -> String {
    let (key, value) = filter.param();
    let mut query_parts = vec![format!("{}={}", key, urlencoding::encode(value))];
    if let Some(token) = page_token {
        query_parts.push(format!("pageToken={}", urlencoding::encode(token)));
    }
    format!("{}/tagBindings?{}", base_url, query_parts.join("&"))
}

fn created_from(result: Value, requested: TagBinding) -> Created {
    // a finished operation without a response still carries its own name
    let Some(name) = result
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| name.starts_with(TAG_BINDINGS_PREFIX))
    else {
        return Created::Operation(result);
    };

    match serde_json::from_value::<TagBinding>(result.clone()) {
        Ok(binding) => Created::Binding(binding),
        Err(_) => Created::Binding(TagBinding {
            name: Some(name.to_string()),
            ..requested
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TagError;
    use crate::events::RecordingSink;
    use crate::tagging::testing::ScriptedGateway;
    use reqwest::Method;
    use serde_json::json;

    const VM: &str = "//compute.googleapis.com/projects/p/zones/z/instances/i";
    const BASE: &str = "https://cloudresourcemanager.googleapis.com/v3";

    fn service(responses: Vec<Result<Value>>) -> TagBindingService<ScriptedGateway> {
        TagBindingService::new(
            ScriptedGateway::new(responses),
            EndpointResolver::default(),
            PollSettings::default(),
            RecordingSink::new(),
        )
    }

    fn binding(name: &str) -> Value {
        json!({"name": name, "parent": VM, "tagValue": "tagValues/1"})
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_polls_operation() {
        let svc = service(vec![
            Ok(json!({"name": "operations/rctb.1", "done": false})),
            Ok(json!({"name": "operations/rctb.1", "done": false})),
            Ok(json!({
                "name": "operations/rctb.1",
                "done": true,
                "response": {
                    "@type": "type.googleapis.com/google.cloud.resourcemanager.v3.TagBinding",
                    "name": "tagBindings/%2F%2Fcompute.googleapis.com%2Fprojects%2Fp%2Fzones%2Fz%2Finstances%2Fi/tagValues/1",
                    "parent": VM,
                    "tagValue": "tagValues/1"
                }
            })),
        ]);

        let created = svc.create(VM, "tagValues/1", None).await.unwrap();
        let Created::Binding(created) = created else {
            panic!("expected a binding");
        };
        assert!(created.name.unwrap().starts_with("tagBindings/%2F%2Fcompute"));
        assert_eq!(created.parent, VM);

        let calls = svc.gateway().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].url, format!("{}/tagBindings", BASE));
        assert_eq!(
            calls[0].body,
            Some(json!({"parent": VM, "tagValue": "tagValues/1"}))
        );
        assert_eq!(calls[1].url, format!("{}/operations/rctb.1", BASE));
    }

    #[tokio::test]
    async fn test_create_normalizes_resource_and_uses_region() {
        let svc = service(vec![Ok(binding("tagBindings/sync"))]);

        let created = svc
            .create(
                "//compute.googleapis.com/compute/v1/projects/p/zones/z/instances/i",
                "tagValues/1",
                Some("us-central1-a"),
            )
            .await
            .unwrap();
        assert!(matches!(created, Created::Binding(b) if b.name.as_deref() == Some("tagBindings/sync")));

        let calls = svc.gateway().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].url,
            "https://us-central1-cloudresourcemanager.googleapis.com/v3/tagBindings"
        );
        assert_eq!(calls[0].body.as_ref().unwrap()["parent"], VM);
    }

    #[tokio::test]
    async fn test_create_name_only_response_keeps_request() {
        let svc = service(vec![Ok(json!({
            "name": "operations/x",
            "done": true,
            "response": {"name": "tagBindings/only-name"}
        }))]);

        let created = svc.create(VM, "tagValues/1", None).await.unwrap();
        assert_eq!(
            created,
            Created::Binding(TagBinding {
                name: Some("tagBindings/only-name".to_string()),
                parent: VM.to_string(),
                tag_value: "tagValues/1".to_string(),
                tag_value_namespaced: None,
            })
        );
    }

    #[tokio::test]
    async fn test_create_falls_back_to_operation() {
        let svc = service(vec![Ok(json!({
            "name": "operations/x",
            "done": true,
            "response": {"@type": "type.googleapis.com/google.protobuf.Empty"}
        }))]);

        let created = svc.create(VM, "tagValues/1", None).await.unwrap();
        assert!(matches!(created, Created::Operation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_done_without_response_reports_operation() {
        let svc = service(vec![
            Ok(json!({"name": "operations/rctb.q", "done": false})),
            Ok(json!({"name": "operations/rctb.q", "done": true})),
        ]);

        let created = svc.create(VM, "tagValues/1", None).await.unwrap();
        match created {
            Created::Operation(operation) => {
                assert_eq!(operation["name"], "operations/rctb.q");
                assert_eq!(operation["done"], true);
            }
            other => panic!("expected the raw operation, got {other:?}"),
        }

        let immediate = service(vec![Ok(json!({"name": "operations/rctb.r", "done": true}))]);
        let created = immediate.create(VM, "tagValues/1", None).await.unwrap();
        assert!(matches!(created, Created::Operation(_)));
    }

    #[tokio::test]
    async fn test_create_operation_failure() {
        let svc = service(vec![Ok(json!({
            "name": "operations/x",
            "done": true,
            "error": {"code": 6, "message": "ALREADY_EXISTS"}
        }))]);

        let err = svc.create(VM, "tagValues/1", None).await.unwrap_err();
        assert!(matches!(err, TagError::Operation { .. }));
    }

    #[tokio::test]
    async fn test_create_request_failure() {
        let svc = service(vec![Err(TagError::RequestFailure {
            status: 403,
            body: "{}".to_string(),
        })]);

        let err = svc.create(VM, "tagValues/1", None).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(svc.gateway().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_name() {
        let svc = service(vec![Ok(Value::Null), Ok(Value::Null)]);

        svc.delete(&DeleteTarget::Name("abc".to_string()), None)
            .await
            .unwrap();
        svc.delete(&DeleteTarget::Name("tagBindings/abc".to_string()), None)
            .await
            .unwrap();

        let calls = svc.gateway().calls();
        assert_eq!(calls[0].method, Method::DELETE);
        assert_eq!(calls[0].url, format!("{}/tagBindings/abc", BASE));
        assert_eq!(calls[1].url, calls[0].url);
    }

    #[tokio::test]
    async fn test_delete_by_parts() {
        let svc = service(vec![Ok(json!({"name": "operations/d", "done": true}))]);
        let target = DeleteTarget::Parts {
            resource_name: VM.to_string(),
            tag_value: "tagValues/123".to_string(),
        };

        svc.delete(&target, None).await.unwrap();

        assert_eq!(
            svc.gateway().calls()[0].url,
            format!(
                "{}/tagBindings/%2F%2Fcompute.googleapis.com%2Fprojects%2Fp%2Fzones%2Fz%2Finstances%2Fi/tagValues/123",
                BASE
            )
        );
    }

    #[test]
    fn test_delete_display_encoded_name() {
        let target = DeleteTarget::Name(
            "tagBindings/compute.googleapis.com@projects@p@zones@z@instances@i@tagValues@123"
                .to_string(),
        );
        let parts = DeleteTarget::Parts {
            resource_name: VM.to_string(),
            tag_value: "tagValues/123".to_string(),
        };
        assert_eq!(target.path(), parts.path());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_polls_regional_operation() {
        let svc = service(vec![
            Ok(json!({"name": "operations/rdtb.1", "done": false})),
            Ok(json!({"name": "operations/rdtb.1", "done": true, "response": {}})),
        ]);

        svc.delete(&DeleteTarget::Name("tagBindings/x".to_string()), Some("europe-west1"))
            .await
            .unwrap();

        let calls = svc.gateway().calls();
        assert_eq!(
            calls[0].url,
            "https://europe-west1-cloudresourcemanager.googleapis.com/v3/tagBindings/x"
        );
        assert_eq!(calls[1].method, Method::GET);
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_list_accumulates_pages_in_order() {
        let svc = service(vec![
            Ok(json!({"tagBindings": [binding("tagBindings/1"), binding("tagBindings/2")], "nextPageToken": "t2"})),
            Ok(json!({"tagBindings": [binding("tagBindings/3"), binding("tagBindings/4")], "nextPageToken": "t3"})),
            Ok(json!({"tagBindings": [binding("tagBindings/5")]})),
        ]);

        let bindings = svc.list_for_resource(VM, None).await.unwrap();

        let names: Vec<&str> = bindings.iter().filter_map(|b| b.name.as_deref()).collect();
        assert_eq!(
            names,
            ["tagBindings/1", "tagBindings/2", "tagBindings/3", "tagBindings/4", "tagBindings/5"]
        );

        let calls = svc.gateway().calls();
        assert_eq!(calls.len(), 3);
        let parent = urlencoding::encode(VM);
        assert_eq!(calls[0].url, format!("{}/tagBindings?parent={}", BASE, parent));
        assert_eq!(
            calls[1].url,
            format!("{}/tagBindings?parent={}&pageToken=t2", BASE, parent)
        );
        assert!(calls[2].url.ends_with("&pageToken=t3"));
    }

    #[tokio::test]
    async fn test_list_for_tag_value() {
        let svc = service(vec![Ok(json!({}))]);

        let bindings = svc.list_for_tag_value("tagValues/42", Some("us-east1")).await.unwrap();

        assert!(bindings.is_empty());
        assert_eq!(
            svc.gateway().calls()[0].url,
            "https://us-east1-cloudresourcemanager.googleapis.com/v3/tagBindings?tagValue=tagValues%2F42"
        );
    }

    #[tokio::test]
    async fn test_list_rejects_malformed_page() {
        let svc = service(vec![Ok(json!({"tagBindings": "nope"}))]);
        let err = svc.list_for_resource(VM, None).await.unwrap_err();
        assert!(matches!(err, TagError::InvalidResponse(_)));
    }
}
