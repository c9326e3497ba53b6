pub mod service;
pub mod settings;
pub mod validation;

use thiserror::Error;

pub use service::{redact_sensitive_values, ConfigService};
pub use settings::{
    HistorySettings, IngestSettings, LoggingSettings, OpenAiSettings, PineconeSettings,
    RetrievalSettings, ServerSettings, Settings, VectorStoreProvider, VectorStoreSettings,
    DEFAULT_SESSION_ID,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("{0}")]
    Invalid(String),
}
