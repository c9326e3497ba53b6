//! Typed settings assembled from defaults, the YAML layers and the process
//! environment, in that order of precedence.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::service::{redact_sensitive_values, ConfigService};
use super::ConfigError;
use crate::rag::prompt::PromptProfile;

pub const DEFAULT_SESSION_ID: &str = "default-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    #[default]
    Pinecone,
    Local,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub openai: OpenAiSettings,
    pub pinecone: PineconeSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,
    pub history: HistorySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Unset means the prompt profile's own temperature.
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    pub api_key: Option<String>,
    pub index_name: Option<String>,
    /// Data-plane host; when unset it is resolved through the control plane.
    pub index_host: Option<String>,
    pub control_plane_url: String,
    pub cloud: String,
    pub region: String,
    pub metric: String,
    pub dimension: usize,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: None,
            index_host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            metric: "cosine".to_string(),
            dimension: 1536,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub provider: VectorStoreProvider,
    /// Snapshot file for the local provider.
    pub path: PathBuf,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Pinecone,
            path: PathBuf::from("data/local_index.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub prompt_profile: PromptProfile,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            prompt_profile: PromptProfile::Strict,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub tickets_path: PathBuf,
    pub batch_size: usize,
    /// Write the raw ticket content into metadata under `text`.
    pub store_text: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            tickets_path: PathBuf::from("tickets.json"),
            batch_size: 50,
            store_text: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_messages: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_messages: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

impl Settings {
    /// Loads `config.yml`/`secrets.yml` from the working directory and
    /// overlays the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let root = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let config = ConfigService::new(&root).load_config()?;
        Self::from_sources(&config, |key| env::var(key).ok())
    }

    pub fn from_sources<F>(config: &Value, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings: Settings = serde_json::from_value(config.clone())
            .map_err(|e| ConfigError::Invalid(format!("Invalid config: {}", e)))?;
        settings.apply_env(&env)?;
        settings.require_credentials()?;
        Ok(settings)
    }

    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.pinecone.api_key = Some(key);
        }
        if let Some(name) = lookup("PINECONE_INDEX_NAME") {
            self.pinecone.index_name = Some(name);
        }
        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.pinecone.index_host = Some(host);
        }
        if let Some(url) = lookup("PINECONE_CONTROL_PLANE_URL") {
            self.pinecone.control_plane_url = url;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(path) = lookup("TICKETS_FILE") {
            self.ingest.tickets_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("RAG_LOG_DIR") {
            self.logging.dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.openai.api_key.is_none() {
            return Err(ConfigError::MissingEnv("OPENAI_API_KEY"));
        }
        if self.vector_store.provider == VectorStoreProvider::Pinecone {
            if self.pinecone.index_name.is_none() {
                return Err(ConfigError::MissingEnv("PINECONE_INDEX_NAME"));
            }
            if self.pinecone.api_key.is_none() {
                return Err(ConfigError::MissingEnv("PINECONE_API_KEY"));
            }
        }
        Ok(())
    }

    pub fn openai_api_key(&self) -> &str {
        self.openai.api_key.as_deref().unwrap_or_default()
    }

    pub fn pinecone_api_key(&self) -> &str {
        self.pinecone.api_key.as_deref().unwrap_or_default()
    }

    pub fn index_name(&self) -> &str {
        self.pinecone.index_name.as_deref().unwrap_or_default()
    }

    /// Sampling temperature for the QA chain.
    pub fn temperature(&self) -> f64 {
        self.openai
            .temperature
            .unwrap_or_else(|| self.retrieval.prompt_profile.default_temperature())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Effective settings with secrets masked, for startup logging.
    pub fn redacted(&self) -> Value {
        serde_json::to_value(self)
            .map(|value| redact_sensitive_values(&value))
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
            ("PINECONE_INDEX_NAME", "l1-support-tickets"),
        ]
    }

    #[test]
    fn defaults_match_hosted_stack() {
        let settings = Settings::from_sources(&json!({}), env_of(&required_env())).unwrap();

        assert_eq!(settings.openai.chat_model, "gpt-4o-mini");
        assert_eq!(settings.openai.embedding_model, "text-embedding-3-small");
        assert_eq!(settings.pinecone.dimension, 1536);
        assert_eq!(settings.pinecone.metric, "cosine");
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.prompt_profile, PromptProfile::Strict);
        assert_eq!(settings.ingest.batch_size, 50);
        assert!(settings.ingest.store_text);
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.index_name(), "l1-support-tickets");
    }

    #[test]
    fn missing_openai_key_fails_fast() {
        let err = Settings::from_sources(
            &json!({}),
            env_of(&[("PINECONE_API_KEY", "x"), ("PINECONE_INDEX_NAME", "y")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("OPENAI_API_KEY")));
    }

    #[test]
    fn missing_index_name_fails_for_pinecone() {
        let err = Settings::from_sources(
            &json!({}),
            env_of(&[("OPENAI_API_KEY", "x"), ("PINECONE_API_KEY", "y")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("PINECONE_INDEX_NAME")));
    }

    #[test]
    fn blank_env_values_count_as_missing() {
        let err = Settings::from_sources(
            &json!({}),
            env_of(&[
                ("OPENAI_API_KEY", "   "),
                ("PINECONE_API_KEY", "y"),
                ("PINECONE_INDEX_NAME", "z"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("OPENAI_API_KEY")));
    }

    #[test]
    fn local_provider_needs_only_openai_key() {
        let config = json!({ "vector_store": { "provider": "local", "path": "idx.json" } });
        let settings =
            Settings::from_sources(&config, env_of(&[("OPENAI_API_KEY", "sk")])).unwrap();
        assert_eq!(settings.vector_store.provider, VectorStoreProvider::Local);
        assert_eq!(settings.vector_store.path, PathBuf::from("idx.json"));
    }

    #[test]
    fn env_overrides_yaml_values() {
        let config = json!({
            "server": { "port": 9000 },
            "openai": { "api_key": "from-file", "temperature": 0.5 },
            "retrieval": { "prompt_profile": "default", "top_k": 5 }
        });
        let mut env = required_env();
        env.push(("PORT", "8123"));
        let settings = Settings::from_sources(&config, env_of(&env)).unwrap();

        assert_eq!(settings.server.port, 8123);
        assert_eq!(settings.openai_api_key(), "sk-test");
        assert_eq!(settings.openai.temperature, Some(0.5));
        assert_eq!(settings.temperature(), 0.5);
        assert_eq!(settings.retrieval.prompt_profile, PromptProfile::Default);
        assert_eq!(settings.retrieval.top_k, 5);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut env = required_env();
        env.push(("PORT", "eighty"));
        assert!(Settings::from_sources(&json!({}), env_of(&env)).is_err());
    }

    #[test]
    fn redacted_masks_api_keys() {
        let settings = Settings::from_sources(&json!({}), env_of(&required_env())).unwrap();
        let redacted = settings.redacted();
        assert_eq!(redacted["openai"]["api_key"], "****");
        assert_eq!(redacted["pinecone"]["api_key"], "****");
        assert_eq!(redacted["pinecone"]["index_name"], "l1-support-tickets");
    }

    #[test]
    fn env_sets_index_host_tickets_file_and_log_dir() {
        let config = json!({
            "pinecone": { "index_host": "from-file.pinecone.io" },
            "ingest": { "tickets_path": "file-tickets.json" },
            "logging": { "dir": "file-logs" }
        });
        let mut env = required_env();
        env.push(("PINECONE_INDEX_HOST", "tickets-abc.svc.pinecone.io"));
        env.push(("TICKETS_FILE", "/data/tickets.json"));
        env.push(("RAG_LOG_DIR", "/var/log/support-rag"));

        let settings = Settings::from_sources(&config, env_of(&env)).unwrap();

        assert_eq!(
            settings.pinecone.index_host.as_deref(),
            Some("tickets-abc.svc.pinecone.io")
        );
        assert_eq!(settings.ingest.tickets_path, PathBuf::from("/data/tickets.json"));
        assert_eq!(settings.logging.dir, PathBuf::from("/var/log/support-rag"));
    }

    #[test]
    fn unset_env_keeps_file_values_for_host_tickets_and_logs() {
        let config = json!({
            "ingest": { "tickets_path": "file-tickets.json" },
            "logging": { "dir": "file-logs" }
        });
        let settings = Settings::from_sources(&config, env_of(&required_env())).unwrap();

        assert!(settings.pinecone.index_host.is_none());
        assert_eq!(settings.ingest.tickets_path, PathBuf::from("file-tickets.json"));
        assert_eq!(settings.logging.dir, PathBuf::from("file-logs"));
    }

    #[test]
    fn temperature_follows_prompt_profile_unless_set() {
        let strict = Settings::from_sources(&json!({}), env_of(&required_env())).unwrap();
        assert_eq!(strict.temperature(), 0.1);

        let generic = Settings::from_sources(
            &json!({ "retrieval": { "prompt_profile": "default" } }),
            env_of(&required_env()),
        )
        .unwrap();
        assert_eq!(generic.temperature(), 0.5);

        let pinned = Settings::from_sources(
            &json!({ "openai": { "temperature": 0.2 }, "retrieval": { "prompt_profile": "default" } }),
            env_of(&required_env()),
        )
        .unwrap();
        assert_eq!(pinned.temperature(), 0.2);
    }
}
