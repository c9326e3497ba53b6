//! Pinecone REST client.
//!
//! `PineconeClient` talks to the control plane (list/describe/create
//! indexes); `PineconeIndex` talks to one index's data plane and implements
//! `VectorIndex`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::store::{IndexStats, ScoredMatch, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;

const API_VERSION: &str = "2024-07";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

/// Serverless index definition used when the index has to be created.
#[derive(Debug, Clone, Serialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub cloud: String,
    pub region: String,
}

/// How long `ensure_index` waits for a freshly created index.
#[derive(Debug, Clone, Copy)]
pub struct ReadyPoll {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ReadyPoll {
    fn default() -> Self {
        Self {
            attempts: 60,
            interval: Duration::from_secs(2),
        }
    }
}

/// Headers every Pinecone call carries, control plane and data plane alike.
fn with_auth(builder: RequestBuilder, api_key: &str) -> RequestBuilder {
    builder
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
}

#[derive(Clone)]
pub struct PineconeClient {
    api_key: String,
    control_plane_url: String,
    client: Client,
}

impl PineconeClient {
    pub fn new(api_key: String, control_plane_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            api_key,
            control_plane_url: control_plane_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        with_auth(builder, &self.api_key)
    }

    pub async fn list_indexes(&self) -> Result<Vec<IndexDescription>, ApiError> {
        let url = format!("{}/indexes", self.control_plane_url);
        let res = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        let list: IndexList = ensure_success(res, "list indexes")
            .await?
            .json()
            .await
            .map_err(ApiError::upstream)?;
        Ok(list.indexes)
    }

    pub async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>, ApiError> {
        let url = format!("{}/indexes/{}", self.control_plane_url, name);
        let res = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let description = ensure_success(res, "describe index")
            .await?
            .json()
            .await
            .map_err(ApiError::upstream)?;
        Ok(Some(description))
    }

    pub async fn create_index(&self, spec: &IndexSpec) -> Result<(), ApiError> {
        let url = format!("{}/indexes", self.control_plane_url);
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric,
            "spec": {
                "serverless": { "cloud": spec.cloud, "region": spec.region }
            }
        });
        let res = self
            .authed(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        // Another writer may have created it between list and create.
        if res.status() == StatusCode::CONFLICT {
            tracing::warn!("Index {} already exists", spec.name);
            return Ok(());
        }
        ensure_success(res, "create index").await?;
        Ok(())
    }

    /// Creates the index when it is not listed yet, waits for it to become
    /// ready and returns a data-plane handle.
    pub async fn ensure_index(&self, spec: &IndexSpec, poll: ReadyPoll) -> Result<PineconeIndex, ApiError> {
        let existing = self.list_indexes().await?;
        if existing.iter().any(|index| index.name == spec.name) {
            tracing::info!("Pinecone index {} already exists", spec.name);
        } else {
            tracing::info!(
                "Creating Pinecone index {} (dimension={}, metric={})",
                spec.name,
                spec.dimension,
                spec.metric
            );
            self.create_index(spec).await?;
        }

        for attempt in 0..poll.attempts.max(1) {
            if let Some(description) = self.describe_index(&spec.name).await? {
                if description.status.ready && !description.host.is_empty() {
                    return Ok(self.index(&description.host));
                }
                tracing::debug!(
                    "Index {} not ready yet (state={}, attempt {})",
                    spec.name,
                    description.status.state,
                    attempt + 1
                );
            }
            tokio::time::sleep(poll.interval).await;
        }

        Err(ApiError::Upstream(format!(
            "Pinecone index {} did not become ready",
            spec.name
        )))
    }

    /// Connects to an index that must already exist.
    pub async fn connect(&self, name: &str) -> Result<PineconeIndex, ApiError> {
        let description = self
            .describe_index(name)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Pinecone index {} does not exist", name)))?;
        if description.host.is_empty() {
            return Err(ApiError::Upstream(format!(
                "Pinecone index {} has no host yet",
                name
            )));
        }
        Ok(self.index(&description.host))
    }

    /// Data-plane handle for a known host.
    pub fn index(&self, host: &str) -> PineconeIndex {
        PineconeIndex {
            base_url: normalize_host(host),
            api_key: self.api_key.clone(),
            client: self.client.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PineconeIndex {
    base_url: String,
    api_key: String,
    client: Client,
}

impl PineconeIndex {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, body: &Value, what: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let res = with_auth(self.client.post(&url), &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        ensure_success(res, what)
            .await?
            .json()
            .await
            .map_err(ApiError::upstream)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ApiError> {
        if records.is_empty() {
            return Ok(0);
        }
        let count = records.len();
        let payload = self
            .post("/vectors/upsert", &json!({ "vectors": records }), "upsert")
            .await?;
        Ok(payload
            .get("upsertedCount")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(count))
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>, ApiError> {
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        let payload = self.post("/query", &body, "query").await?;
        let response: QueryResponse = serde_json::from_value(payload).map_err(ApiError::upstream)?;
        Ok(response
            .matches
            .into_iter()
            .map(|m| ScoredMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats, ApiError> {
        let payload = self
            .post("/describe_index_stats", &json!({}), "describe index stats")
            .await?;
        let stats: StatsResponse = serde_json::from_value(payload).map_err(ApiError::upstream)?;
        Ok(IndexStats {
            dimension: stats.dimension,
            total_vector_count: stats.total_vector_count,
        })
    }
}

async fn ensure_success(res: Response, what: &str) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    Err(ApiError::Upstream(format!(
        "Pinecone {} failed ({}): {}",
        what, status, text
    )))
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
