use std::sync::Arc;

use super::prompt::{format_context, PromptProfile};
use super::retriever::{RetrievedTicket, Retriever};
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct QaOutcome {
    pub answer: String,
    pub source_documents: Vec<RetrievedTicket>,
}

/// Retrieval QA over the ticket index: the retrieved tickets are stuffed
/// into the profile's prompt and the model is asked once.
pub struct QaChain {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    chat_model: String,
    temperature: f64,
    max_tokens: Option<u32>,
    profile: PromptProfile,
}

impl QaChain {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmProvider>,
        chat_model: impl Into<String>,
        temperature: f64,
        profile: PromptProfile,
    ) -> Self {
        Self {
            retriever,
            llm,
            chat_model: chat_model.into(),
            temperature,
            max_tokens: None,
            profile,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn profile(&self) -> PromptProfile {
        self.profile
    }

    pub async fn invoke(&self, question: &str) -> Result<QaOutcome, ApiError> {
        let docs = self.retriever.retrieve(question).await?;
        tracing::info!("Retriever returned {} documents", docs.len());
        for (i, doc) in docs.iter().enumerate() {
            tracing::info!(
                "Doc {} ticket_id={} score={:.4} preview: {}",
                i + 1,
                doc.ticket_id,
                doc.score,
                doc.preview(PREVIEW_CHARS)
            );
        }

        let context = format_context(docs.iter().map(|d| d.text.as_str()));
        let messages = self.profile.messages(&context, question);

        let request = ChatRequest::new(messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let answer = self.llm.chat(request, &self.chat_model).await?;
        tracing::info!("LLM response generated ({} chars)", answer.len());

        Ok(QaOutcome {
            answer,
            source_documents: docs,
        })
    }
}
