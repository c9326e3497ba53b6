use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::validation::validate_config;
use super::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "bearer",
    "access_key",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

/// Locates and loads the YAML configuration layers.
///
/// `config.yml` holds public settings, `secrets.yml` (optional) holds keys.
/// Both are merged into one JSON value, secrets winning.
#[derive(Debug, Clone)]
pub struct ConfigService {
    config_path: PathBuf,
    secrets_path: PathBuf,
}

impl ConfigService {
    pub fn new(root: &Path) -> Self {
        let config_path = env::var("RAG_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| root.join("config.yml"));
        let secrets_path = env::var("RAG_SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| root.join("secrets.yml"));
        Self::with_paths(config_path, secrets_path)
    }

    pub fn with_paths(config_path: PathBuf, secrets_path: PathBuf) -> Self {
        Self {
            config_path,
            secrets_path,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load_config(&self) -> Result<Value, ConfigError> {
        let public_config = load_yaml_file(&self.config_path)?;
        let secrets_config = load_yaml_file(&self.secrets_path)?;
        let merged = deep_merge(&public_config, &secrets_config);
        validate_config(&merged)?;
        Ok(merged)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e)))?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value = serde_yaml::from_str::<Value>(&contents)
        .map_err(|e| ConfigError::Invalid(format!("Failed to parse {}: {}", path.display(), e)))?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Invalid(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

pub(crate) fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

pub fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "openai": { "chat_model": "gpt-4o-mini", "temperature": 0.1 },
            "retrieval": { "top_k": 3 }
        });
        let override_value = json!({
            "openai": { "api_key": "sk-test" },
            "retrieval": { "top_k": 5 }
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "openai": { "chat_model": "gpt-4o-mini", "temperature": 0.1, "api_key": "sk-test" },
                "retrieval": { "top_k": 5 }
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "openai": { "api_key": "sk-live", "max_tokens": 512 },
            "pinecone": { "api_key": null, "index_name": "tickets" }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "openai": { "api_key": "****", "max_tokens": 512 },
                "pinecone": { "api_key": null, "index_name": "tickets" }
            })
        );
    }

    #[test]
    fn load_config_merges_secrets_file_over_public_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        let secrets_path = dir.path().join("secrets.yml");
        fs::write(&config_path, "retrieval:\n  top_k: 4\nopenai:\n  chat_model: gpt-4o\n").unwrap();
        fs::write(&secrets_path, "openai:\n  api_key: sk-file\n").unwrap();

        let service = ConfigService::with_paths(config_path, secrets_path);
        let config = service.load_config().unwrap();

        assert_eq!(config["retrieval"]["top_k"], 4);
        assert_eq!(config["openai"]["chat_model"], "gpt-4o");
        assert_eq!(config["openai"]["api_key"], "sk-file");
    }

    #[test]
    fn missing_files_load_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::with_paths(
            dir.path().join("nope.yml"),
            dir.path().join("nope-secrets.yml"),
        );
        assert_eq!(service.load_config().unwrap(), json!({}));
    }

    #[test]
    fn invalid_values_fail_loading() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "ingest:\n  batch_size: 0\n").unwrap();

        let service = ConfigService::with_paths(config_path, dir.path().join("s.yml"));
        assert!(service.load_config().is_err());
    }
}
