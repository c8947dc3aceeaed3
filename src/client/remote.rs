//! RemoteBackend: HTTP JSON client for a running `atlas-server`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::backend::GraphBackend;
use super::error::{StoreError, StoreResult};
use crate::gql::query_interface::BatchReport;
use crate::graph_utils::model::{
    GraphSnapshot, NewNode, NewRelationship, Node, NodeId, Properties, Relationship, RelationshipId,
    RelationshipPatch,
};

#[derive(Clone)]
pub struct RemoteBackend {
    http_base_url: String,
    http_client: Client,
    api_key: Option<String>,
}

impl RemoteBackend {
    pub fn new(http_base_url: &str) -> Self {
        Self {
            http_base_url: http_base_url.trim_end_matches('/').to_string(),
            http_client: Client::new(),
            api_key: None,
        }
    }

    /// Send `X-API-Key` with every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.http_base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.http_base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("X-API-Key", key),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> StoreResult<T> {
        let response = self.authorize(req).send().await?;
        decode(response).await
    }
}

// Property values deserialize through the normalizer, so wrapped values arrive as plain scalars.
async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let status = response.status();
    if status.is_success() {
        let result: T = response.json().await?;
        return Ok(result);
    }
    let error_body: serde_json::Value = response
        .json()
        .await
        .unwrap_or_else(|_| serde_json::json!({"error": "Unknown error"}));
    let message = error_body
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown error")
        .to_string();
    if status == StatusCode::NOT_FOUND {
        Err(StoreError::NotFound(message))
    } else {
        Err(StoreError::Rejected { status: status.as_u16(), message })
    }
}

#[async_trait]
impl GraphBackend for RemoteBackend {
    async fn fetch_graph(&self) -> StoreResult<GraphSnapshot> {
        self.send(self.http_client.get(self.url("/api/data"))).await
    }

    async fn create_node(&self, req: &NewNode) -> StoreResult<Node> {
        self.send(self.http_client.post(self.url("/api/nodes")).json(req)).await
    }

    async fn update_node(&self, id: NodeId, properties: &Properties) -> StoreResult<Node> {
        let body = serde_json::json!({ "properties": properties });
        self.send(self.http_client.put(self.url(&format!("/api/nodes/{}", id))).json(&body)).await
    }

    async fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        let _: serde_json::Value = self.send(self.http_client.delete(self.url(&format!("/api/nodes/{}", id)))).await?;
        Ok(())
    }

    async fn create_relationship(&self, req: &NewRelationship) -> StoreResult<Relationship> {
        self.send(self.http_client.post(self.url("/api/relationships")).json(req)).await
    }

    async fn update_relationship(&self, id: RelationshipId, patch: &RelationshipPatch) -> StoreResult<Relationship> {
        self.send(self.http_client.put(self.url(&format!("/api/relationships/{}", id))).json(patch)).await
    }

    async fn delete_relationship(&self, id: RelationshipId) -> StoreResult<()> {
        let _: serde_json::Value =
            self.send(self.http_client.delete(self.url(&format!("/api/relationships/{}", id)))).await?;
        Ok(())
    }

    async fn execute_queries(&self, queries: &str) -> StoreResult<BatchReport> {
        let body = serde_json::json!({ "queries": queries });
        self.send(self.http_client.post(self.url("/api/execute-queries")).json(&body)).await
    }
}
