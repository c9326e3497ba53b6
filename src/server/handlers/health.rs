use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub const RUNNING_MESSAGE: &str = "L1 Support RAG Chatbot is running";

pub async fn root() -> impl IntoResponse {
    Json(json!({ "status": RUNNING_MESSAGE }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "vector_store": state.index.name(),
        "prompt_profile": state.chain.profile().as_str(),
        "sessions": state.memory.session_count().await
    }))
}
