//! Graph store client for the Azure Digital Twins REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use super::model::GraphModel;
use super::operation::Edge;
use super::operation::Node;
use super::operation::PatchOp;
use super::store::GraphStore;
use super::store::StoreError;
use crate::config::GraphStoreConfig;

pub const API_VERSION: &str = "2023-10-31";

const NODE_ID_QUERY: &str = "SELECT T.$dtId FROM DIGITALTWINS T";

/// One page of a listing. Model listings link to the next page, queries
/// return a continuation token.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,

    #[serde(default, rename = "nextLink")]
    next_link: Option<String>,

    #[serde(default, rename = "continuationToken")]
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NodeIdRow {
    #[serde(rename = "$dtId")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct RelationshipRef {
    #[serde(rename = "$relationshipId")]
    id: String,

    #[serde(rename = "$sourceId")]
    source_id: String,
}

pub struct HttpGraphStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpGraphStore {
    pub fn new(config: &GraphStoreConfig) -> Result<Self, StoreError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            StoreError::Decode(format!("invalid endpoint {}: {}", config.endpoint, e))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
        })
    }

    /// Build `{endpoint}/{segments...}?api-version=...`. Each segment is
    /// escaped, so an id containing `/` stays one path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Follow `nextLink` until the listing is exhausted.
    async fn list_all<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            let page: Page<T> = self.send_json(self.request(Method::GET, url)).await?;
            out.extend(page.value);
            if let Some(link) = page.next_link {
                next = Some(Url::parse(&link).map_err(|e| StoreError::Decode(e.to_string()))?);
            }
        }
        Ok(out)
    }

    /// Relationships of one twin in `direction`. A twin that is already
    /// gone has none.
    async fn relationships(
        &self,
        id: &str,
        direction: &str,
    ) -> Result<Vec<RelationshipRef>, StoreError> {
        missing_is_empty(self.list_all(self.url(&["digitaltwins", id, direction])).await)
    }

    fn relationship_url(&self, source_id: &str, id: &str) -> Url {
        self.url(&["digitaltwins", source_id, "relationships", id])
    }

    async fn delete(&self, url: Url) -> Result<(), StoreError> {
        match self.send(self.request(Method::DELETE, url)).await {
            Ok(_) => Ok(()),
            // Already gone is what we wanted.
            Err(StoreError::Status { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn missing_is_empty<T>(listing: Result<Vec<T>, StoreError>) -> Result<Vec<T>, StoreError> {
    match listing {
        Err(StoreError::Status { status: 404, .. }) => Ok(Vec::new()),
        listing => listing,
    }
}

/// Twin document: model reference plus the properties.
fn node_body(node: &Node) -> Value {
    let mut body = Map::new();
    body.insert("$metadata".to_string(), json!({"$model": node.model_id}));
    for (k, v) in &node.properties {
        body.insert(k.clone(), v.clone());
    }
    Value::Object(body)
}

fn edge_body(edge: &Edge) -> Value {
    let mut body = Map::new();
    body.insert("$relationshipId".to_string(), json!(edge.id));
    body.insert("$sourceId".to_string(), json!(edge.source_node_id));
    body.insert("$relationshipName".to_string(), json!(edge.name));
    body.insert("$targetId".to_string(), json!(edge.target_node_id));
    for (k, v) in &edge.properties {
        body.insert(k.clone(), v.clone());
    }
    Value::Object(body)
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn list_model_ids(&self) -> Result<Vec<String>, StoreError> {
        let models: Vec<ModelEntry> = self.list_all(self.url(&["models"])).await?;
        Ok(models.into_iter().map(|m| m.id).collect())
    }

    async fn create_models(&self, models: &[GraphModel]) -> Result<(), StoreError> {
        let builder = self.request(Method::POST, self.url(&["models"])).json(models);
        self.send(builder).await?;
        debug!("Created {} models", models.len());
        Ok(())
    }

    async fn delete_model(&self, id: &str) -> Result<(), StoreError> {
        self.delete(self.url(&["models", id])).await
    }

    async fn list_node_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut body = json!({ "query": NODE_ID_QUERY });
        loop {
            let builder = self.request(Method::POST, self.url(&["query"])).json(&body);
            let page: Page<NodeIdRow> = self.send_json(builder).await?;
            ids.extend(page.value.into_iter().map(|row| row.id));
            match page.continuation_token {
                Some(token) => body = json!({ "continuationToken": token }),
                None => return Ok(ids),
            }
        }
    }

    async fn upsert_node(&self, node: &Node) -> Result<(), StoreError> {
        let builder = self
            .request(Method::PUT, self.url(&["digitaltwins", node.id.as_str()]))
            .json(&node_body(node));
        self.send(builder).await?;
        Ok(())
    }

    async fn upsert_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        let url = self.relationship_url(&edge.source_node_id, &edge.id);
        let builder = self.request(Method::PUT, url).json(&edge_body(edge));
        self.send(builder).await?;
        Ok(())
    }

    async fn patch_node(&self, id: &str, patch: &[PatchOp]) -> Result<(), StoreError> {
        let body = serde_json::to_vec(patch).map_err(|e| StoreError::Decode(e.to_string()))?;
        let builder = self
            .request(Method::PATCH, self.url(&["digitaltwins", id]))
            .header(reqwest::header::CONTENT_TYPE, "application/json-patch+json")
            .body(body);
        self.send(builder).await?;
        Ok(())
    }

    /// A twin with relationships cannot be deleted, so both directions are
    /// removed first.
    async fn delete_node(&self, id: &str) -> Result<(), StoreError> {
        let outgoing = self.relationships(id, "relationships").await?;
        let incoming = self.relationships(id, "incomingrelationships").await?;

        for rel in outgoing.iter().chain(&incoming) {
            self.delete(self.relationship_url(&rel.source_id, &rel.id)).await?;
        }
        self.delete(self.url(&["digitaltwins", id])).await
    }
}
