use std::sync::Arc;

use serde::Serialize;

use super::ingest::TicketMetadata;
use super::store::VectorIndex;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

/// A retrieved ticket, ready to be stuffed into the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedTicket {
    pub ticket_id: String,
    pub text: String,
    pub score: f32,
    pub metadata: TicketMetadata,
}

impl RetrievedTicket {
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

/// Plain similarity retriever: embed, nearest neighbours, done.
pub struct Retriever {
    llm: Arc<dyn LlmProvider>,
    embedding_model: String,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedding_model: impl Into<String>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            embedding_model: embedding_model.into(),
            index,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedTicket>, ApiError> {
        let mut embeddings = self
            .llm
            .embed(&[query.to_string()], &self.embedding_model)
            .await?;
        let vector = embeddings
            .pop()
            .ok_or_else(|| ApiError::Upstream("No embedding returned for query".to_string()))?;

        let matches = self.index.query(&vector, self.top_k).await?;

        let mut tickets = Vec::with_capacity(matches.len());
        for hit in matches {
            let metadata = TicketMetadata::from_stored(&hit.metadata);
            let Some(text) = metadata.text.clone() else {
                tracing::warn!(
                    "Match {} has no 'text' metadata; it was indexed without content",
                    hit.id
                );
                continue;
            };
            let ticket_id = if metadata.ticket_id.is_empty() {
                hit.id
            } else {
                metadata.ticket_id.clone()
            };
            tickets.push(RetrievedTicket {
                ticket_id,
                text,
                score: hit.score,
                metadata,
            });
        }

        Ok(tickets)
    }
}
