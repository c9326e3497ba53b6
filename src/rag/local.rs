//! File-backed local vector index.
//!
//! Brute-force cosine similarity over every stored record. The whole index
//! is rewritten to its snapshot file after each upsert.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{IndexStats, ScoredMatch, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;

pub struct LocalIndex {
    path: Option<PathBuf>,
    records: RwLock<BTreeMap<String, VectorRecord>>,
}

impl LocalIndex {
    /// Index that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Opens (or starts) the snapshot at `path`.
    pub async fn open(path: PathBuf) -> Result<Self, ApiError> {
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let list: Vec<VectorRecord> = serde_json::from_str(&contents).map_err(|e| {
                    ApiError::Internal(format!("Corrupt index file {}: {}", path.display(), e))
                })?;
                list.into_iter().map(|r| (r.id.clone(), r)).collect()
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(ApiError::internal(err)),
        };

        tracing::info!(
            "Opened local index {} ({} records)",
            path.display(),
            records.len()
        );

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// Opens a snapshot that must already exist, as written by `vectorize`.
    pub async fn connect(path: PathBuf) -> Result<Self, ApiError> {
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Self::open(path).await,
            Ok(false) => Err(ApiError::NotFound(format!(
                "Local index {} does not exist; run vectorize first",
                path.display()
            ))),
            Err(err) => Err(ApiError::internal(err)),
        }
    }

    async fn persist(&self, records: &BTreeMap<String, VectorRecord>) -> Result<(), ApiError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(ApiError::internal)?;
            }
        }
        let list: Vec<&VectorRecord> = records.values().collect();
        let json = serde_json::to_string(&list).map_err(ApiError::internal)?;
        tokio::fs::write(path, json).await.map_err(ApiError::internal)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    fn name(&self) -> &str {
        "local"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ApiError> {
        let count = records.len();
        let mut guard = self.records.write().await;
        for record in records {
            guard.insert(record.id.clone(), record);
        }
        self.persist(&guard).await?;
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>, ApiError> {
        if vector.is_empty() {
            return Err(ApiError::BadRequest("Query vector must not be empty".to_string()));
        }

        let guard = self.records.read().await;
        let mut scored: Vec<ScoredMatch> = guard
            .values()
            .filter(|record| record.values.len() == vector.len())
            .map(|record| ScoredMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        scored.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn stats(&self) -> Result<IndexStats, ApiError> {
        let guard = self.records.read().await;
        Ok(IndexStats {
            dimension: guard.values().next().map(|r| r.values.len()),
            total_vector_count: guard.len() as u64,
        })
    }
}
