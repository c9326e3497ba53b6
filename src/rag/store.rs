//! VectorIndex trait: abstract interface over the ticket vector index.
//!
//! The hosted implementation is `PineconeIndex`; `LocalIndex` is an
//! in-process stand-in persisted to a JSON file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

/// A vector keyed by ticket id, carrying its ticket metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Value,
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    /// Similarity score (higher = better).
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub dimension: Option<usize>,
    pub total_vector_count: u64,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Insert or replace records by id. Returns the number written.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ApiError>;

    /// Top-k similarity search, best first, metadata included.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>, ApiError>;

    async fn stats(&self) -> Result<IndexStats, ApiError>;
}
