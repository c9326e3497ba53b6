use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Settings;
use crate::graph::{build_support_graph, GraphRuntime};
use crate::history::SessionMemory;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{open_index, IndexMode, QaChain, Retriever, VectorIndex};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Contains references to:
/// - Effective settings
/// - The vector index
/// - The retrieval QA chain and the graph that wraps it
/// - Per-session conversation memory
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub index: Arc<dyn VectorIndex>,
    pub chain: Arc<QaChain>,
    pub graph_runtime: Arc<GraphRuntime>,
    pub memory: Arc<SessionMemory>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Builds the OpenAI-compatible provider
    /// 2. Connects to the existing vector index
    /// 3. Assembles the retrieval QA chain and the support graph
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        tracing::info!("Initializing LLM provider ({})", settings.openai.base_url);
        let llm: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::new(
                settings.openai.base_url.clone(),
                settings.openai_api_key().to_string(),
                Duration::from_secs(settings.openai.timeout_secs),
            )
            .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let index = open_index(&settings, IndexMode::ConnectExisting)
            .await
            .map_err(|e| InitializationError::VectorStore(e.into()))?;

        Self::from_parts(settings, llm, index)
    }

    /// Wires the state from already-built services.
    pub fn from_parts(
        settings: Settings,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Arc<Self>, InitializationError> {
        let retriever = Retriever::new(
            llm.clone(),
            settings.openai.embedding_model.clone(),
            index.clone(),
            settings.retrieval.top_k,
        );
        tracing::info!(
            "Retriever configured (k={}, similarity search, index={})",
            retriever.top_k(),
            index.name()
        );

        let chain = Arc::new(
            QaChain::new(
                retriever,
                llm,
                settings.openai.chat_model.clone(),
                settings.temperature(),
                settings.retrieval.prompt_profile,
            )
            .with_max_tokens(settings.openai.max_tokens),
        );
        tracing::info!(
            "RetrievalQA chain created (model={}, temperature={}, prompt={})",
            settings.openai.chat_model,
            settings.temperature(),
            chain.profile().as_str()
        );

        let graph_runtime =
            Arc::new(build_support_graph().map_err(|e| InitializationError::Graph(e.into()))?);
        tracing::info!("Support graph compiled with session memory");

        let memory = Arc::new(SessionMemory::new(settings.history.max_messages));

        Ok(Arc::new(AppState {
            settings: Arc::new(settings),
            index,
            chain,
            graph_runtime,
            memory,
        }))
    }
}
