// Support Graph Module
// LangGraph-style StateGraph architecture for Rust

pub mod builder;
pub mod node;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::build_support_graph;
pub use node::{GraphError, GraphErrorKind, Node, NodeContext, NodeOutput};
pub use runtime::{GraphBuilder, GraphRuntime};
pub use state::AgentState;
