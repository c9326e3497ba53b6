use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::config::DEFAULT_SESSION_ID;
use crate::core::errors::ApiError;
use crate::graph::{AgentState, NodeContext};
use crate::llm::ChatMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    let session_id = if payload.session_id.trim().is_empty() {
        DEFAULT_SESSION_ID
    } else {
        payload.session_id.as_str()
    };
    tracing::info!("Chat request for session {}", session_id);

    let mut messages = state.memory.load(session_id).await;
    messages.push(ChatMessage::user(payload.message.as_str()));

    let mut graph_state = AgentState::new(session_id, messages);
    let mut ctx = NodeContext {
        chain: &state.chain,
    };
    state
        .graph_runtime
        .run(&mut graph_state, &mut ctx)
        .await
        .map_err(|err| {
            tracing::error!(
                "Graph execution failed at {} (trace: {:?}): {}",
                err.node_id,
                err.execution_trace,
                err.message
            );
            ApiError::from(err)
        })?;

    let reply = graph_state
        .last_message()
        .filter(|m| !m.is_user())
        .map(|m| m.content.clone())
        .ok_or_else(|| ApiError::Internal("graph produced no reply".to_string()))?;

    tracing::info!(
        "Answered session {} from {} source tickets",
        session_id,
        graph_state.sources.len()
    );
    state.memory.save(session_id, graph_state.messages).await;

    Ok(Json(ChatResponse { reply }))
}
