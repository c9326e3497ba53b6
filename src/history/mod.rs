//! In-memory conversation checkpointer keyed by session id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::llm::ChatMessage;

#[derive(Debug, Clone)]
struct Thread {
    messages: Vec<ChatMessage>,
    updated_at: DateTime<Utc>,
}

/// Holds each session's transcript for the lifetime of the process.
pub struct SessionMemory {
    threads: RwLock<HashMap<String, Thread>>,
    max_messages: usize,
}

impl SessionMemory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            max_messages: max_messages.max(1),
        }
    }

    pub async fn load(&self, session_id: &str) -> Vec<ChatMessage> {
        self.threads
            .read()
            .await
            .get(session_id)
            .map(|thread| thread.messages.clone())
            .unwrap_or_default()
    }

    /// Replaces the transcript, keeping only the newest `max_messages`.
    pub async fn save(&self, session_id: &str, mut messages: Vec<ChatMessage>) {
        if messages.len() > self.max_messages {
            let excess = messages.len() - self.max_messages;
            messages.drain(..excess);
        }
        let thread = Thread {
            messages,
            updated_at: Utc::now(),
        };
        self.threads
            .write()
            .await
            .insert(session_id.to_string(), thread);
    }

    pub async fn last_updated(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.threads
            .read()
            .await
            .get(session_id)
            .map(|thread| thread.updated_at)
    }

    pub async fn session_count(&self) -> usize {
        self.threads.read().await.len()
    }
}
