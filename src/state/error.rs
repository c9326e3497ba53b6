use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to open vector store: {0}")]
    VectorStore(#[source] anyhow::Error),

    #[error("Failed to build support graph: {0}")]
    Graph(#[source] anyhow::Error),
}
