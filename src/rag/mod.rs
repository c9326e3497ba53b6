//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `VectorIndex`: storage abstraction with Pinecone and local backends
//! - `Retriever` / `QaChain`: similarity retrieval and prompt stuffing
//! - `Ingestor`: offline, batched ticket vectorization

pub mod chain;
pub mod ingest;
pub mod local;
pub mod pinecone;
pub mod prompt;
pub mod retriever;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

pub use chain::{QaChain, QaOutcome};
pub use ingest::{load_tickets, IngestReport, Ingestor, Ticket, TicketMetadata};
pub use local::LocalIndex;
pub use pinecone::{IndexSpec, PineconeClient, PineconeIndex, ReadyPoll};
pub use prompt::PromptProfile;
pub use retriever::{RetrievedTicket, Retriever};
pub use store::{IndexStats, ScoredMatch, VectorIndex, VectorRecord};

use crate::core::config::{Settings, VectorStoreProvider};
use crate::core::errors::ApiError;

/// How to obtain the index handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// The index must already exist (chat server).
    ConnectExisting,
    /// Create the index when missing (vectorizer).
    CreateIfMissing,
}

fn pinecone_client(settings: &Settings) -> Result<PineconeClient, ApiError> {
    PineconeClient::new(
        settings.pinecone_api_key().to_string(),
        settings.pinecone.control_plane_url.clone(),
        Duration::from_secs(settings.openai.timeout_secs),
    )
}

pub fn index_spec(settings: &Settings) -> IndexSpec {
    IndexSpec {
        name: settings.index_name().to_string(),
        dimension: settings.pinecone.dimension,
        metric: settings.pinecone.metric.clone(),
        cloud: settings.pinecone.cloud.clone(),
        region: settings.pinecone.region.clone(),
    }
}

/// Opens the configured vector index.
pub async fn open_index(settings: &Settings, mode: IndexMode) -> Result<Arc<dyn VectorIndex>, ApiError> {
    match settings.vector_store.provider {
        VectorStoreProvider::Local => {
            let path = settings.vector_store.path.clone();
            let index = match mode {
                IndexMode::ConnectExisting => LocalIndex::connect(path).await?,
                IndexMode::CreateIfMissing => LocalIndex::open(path).await?,
            };
            Ok(Arc::new(index))
        }
        VectorStoreProvider::Pinecone => {
            let client = pinecone_client(settings)?;
            let index = match (&settings.pinecone.index_host, mode) {
                (Some(host), _) => client.index(host),
                (None, IndexMode::ConnectExisting) => client.connect(settings.index_name()).await?,
                (None, IndexMode::CreateIfMissing) => {
                    client
                        .ensure_index(&index_spec(settings), ReadyPoll::default())
                        .await?
                }
            };
            tracing::info!(
                "Connected to Pinecone index {} at {}",
                settings.index_name(),
                index.base_url()
            );
            Ok(Arc::new(index))
        }
    }
}
