// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::rag::QaChain;

use super::state::AgentState;

/// Context passed to nodes during execution
pub struct NodeContext<'a> {
    /// Retrieval QA chain shared by all requests
    pub chain: &'a QaChain,
}

/// Output from a node execution
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Continue to the specified next node (None = use default edge)
    Continue(Option<String>),
    /// Branch to one of the specified nodes based on condition
    Branch(String),
    /// Graph execution complete
    Final,
    /// Error occurred
    Error(String),
}

/// What kind of failure a node hit, so the HTTP layer can map it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphErrorKind {
    /// Wiring or runtime failure inside the graph itself.
    Runtime,
    /// The state handed to the graph was unusable.
    Input,
    /// An external API call failed.
    Upstream,
}

/// Graph execution error
///
/// Includes an optional `execution_trace` to record the sequence of node IDs
/// visited before the error occurred.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    pub kind: GraphErrorKind,
    /// Ordered list of node IDs executed before this error, most-recent last.
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            kind: GraphErrorKind::Runtime,
            execution_trace: Vec::new(),
        }
    }

    pub fn input(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: GraphErrorKind::Input,
            ..Self::new(node_id, message)
        }
    }

    /// Wraps an error raised by a service call inside a node.
    pub fn from_api(node_id: impl Into<String>, err: ApiError) -> Self {
        let kind = match &err {
            ApiError::Upstream(_) => GraphErrorKind::Upstream,
            ApiError::BadRequest(_) => GraphErrorKind::Input,
            ApiError::NotFound(_) | ApiError::Internal(_) => GraphErrorKind::Runtime,
        };
        let message = match err {
            ApiError::Upstream(msg)
            | ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg,
        };
        Self {
            kind,
            ..Self::new(node_id, message)
        }
    }

    /// Append a node ID to the execution trace.
    pub fn with_trace(mut self, trace: &[String]) -> Self {
        self.execution_trace.extend(trace.iter().cloned());
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let message = if err.execution_trace.is_empty() {
            format!("Graph error in {}: {}", err.node_id, err.message)
        } else {
            format!(
                "Graph error in {} (trace: {}): {}",
                err.node_id,
                err.execution_trace.join(" -> "),
                err.message
            )
        };
        match err.kind {
            GraphErrorKind::Upstream => ApiError::Upstream(message),
            GraphErrorKind::Input => ApiError::BadRequest(message),
            GraphErrorKind::Runtime => ApiError::Internal(message),
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic
    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_stay_upstream_through_the_graph() {
        let err = GraphError::from_api("model", ApiError::Upstream("429".to_string()));
        assert_eq!(err.kind, GraphErrorKind::Upstream);
        assert!(matches!(ApiError::from(err), ApiError::Upstream(msg) if msg.contains("429")));
    }

    #[test]
    fn trace_is_rendered_in_display() {
        let err = GraphError::new("model", "boom").with_trace(&["model".to_string()]);
        assert_eq!(err.to_string(), "GraphError in model (trace: model): boom");
    }

    #[test]
    fn input_errors_map_to_bad_request() {
        let err = GraphError::input("model", "no user message");
        assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));
    }
}
