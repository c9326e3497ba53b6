//! Offline ticket ingestion: read the ticket file, embed each ticket's
//! content and upsert the vectors in fixed-size batches.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::{VectorIndex, VectorRecord};
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

/// One row of `tickets.json`. Key names are the export's own.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ticket {
    #[serde(rename = "Ticket ID")]
    pub ticket_id: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "Category")]
    pub category: String,
    pub issue_type: String,
    pub support_level: String,
}

/// Metadata stored next to each vector. `text` is what the retriever
/// reads back as page content.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TicketMetadata {
    pub ticket_id: String,
    pub organization: String,
    pub category: String,
    pub issue_type: String,
    pub support_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TicketMetadata {
    pub fn from_ticket(ticket: &Ticket, store_text: bool) -> Self {
        Self {
            ticket_id: ticket.ticket_id.clone(),
            organization: ticket.organization.clone(),
            category: ticket.category.clone(),
            issue_type: ticket.issue_type.clone(),
            support_level: ticket.support_level.clone(),
            text: store_text.then(|| ticket.content.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Reads metadata written by any indexer. Each field is taken on its
    /// own; scalar values other than strings are stringified.
    pub fn from_stored(value: &Value) -> Self {
        let field = |key: &str| match value.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };
        Self {
            ticket_id: field("ticket_id").unwrap_or_default(),
            organization: field("organization").unwrap_or_default(),
            category: field("category").unwrap_or_default(),
            issue_type: field("issue_type").unwrap_or_default(),
            support_level: field("support_level").unwrap_or_default(),
            text: field("text"),
        }
    }
}

pub fn load_tickets(path: &Path) -> Result<Vec<Ticket>, ApiError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ApiError::NotFound(format!("Cannot read ticket file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        ApiError::BadRequest(format!("Invalid ticket file {}: {}", path.display(), e))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub loaded: usize,
    pub skipped: usize,
    pub upserted: usize,
    pub batches: usize,
}

pub struct Ingestor {
    llm: Arc<dyn LlmProvider>,
    embedding_model: String,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
    store_text: bool,
}

impl Ingestor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedding_model: impl Into<String>,
        index: Arc<dyn VectorIndex>,
        batch_size: usize,
        store_text: bool,
    ) -> Self {
        Self {
            llm,
            embedding_model: embedding_model.into(),
            index,
            batch_size: batch_size.max(1),
            store_text,
        }
    }

    pub async fn run(&self, tickets: &[Ticket]) -> Result<IngestReport, ApiError> {
        let mut report = IngestReport {
            loaded: tickets.len(),
            ..IngestReport::default()
        };

        let mut seen = HashSet::new();
        let usable: Vec<&Ticket> = tickets
            .iter()
            .filter(|ticket| {
                if ticket.content.trim().is_empty() {
                    tracing::warn!("Skipping ticket {} with empty content", ticket.ticket_id);
                    return false;
                }
                if !seen.insert(ticket.ticket_id.as_str()) {
                    tracing::warn!(
                        "Duplicate ticket id {}; the later record wins",
                        ticket.ticket_id
                    );
                }
                true
            })
            .collect();
        report.skipped = tickets.len() - usable.len();

        let total_batches = usable.len().div_ceil(self.batch_size);
        for (batch_no, batch) in usable.chunks(self.batch_size).enumerate() {
            let inputs: Vec<String> = batch.iter().map(|t| t.content.clone()).collect();
            let embeddings = self.llm.embed(&inputs, &self.embedding_model).await?;
            if embeddings.len() != batch.len() {
                return Err(ApiError::Upstream(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let records: Vec<VectorRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(ticket, values)| VectorRecord {
                    id: ticket.ticket_id.clone(),
                    values,
                    metadata: TicketMetadata::from_ticket(ticket, self.store_text).to_value(),
                })
                .collect();

            let written = self.index.upsert(records).await?;
            report.upserted += written;
            report.batches += 1;
            tracing::info!(
                "Upserted batch {}/{} ({} vectors)",
                batch_no + 1,
                total_batches,
                written
            );
        }

        Ok(report)
    }
}
