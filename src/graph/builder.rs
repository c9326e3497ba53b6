// Graph Builder
// Constructs the support graph using petgraph

use super::node::GraphError;
use super::nodes::ModelNode;
use super::runtime::{GraphBuilder, GraphRuntime};

/// Build the support graph: a single "model" node that answers from the
/// retrieval QA chain and finishes.
pub fn build_support_graph() -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("model")
        .max_steps(4)
        .node(Box::new(ModelNode::new()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_graph_has_single_model_node() {
        let graph = build_support_graph().unwrap();
        assert_eq!(graph.node_ids(), vec!["model"]);
        assert_eq!(graph.entry(), "model");
    }
}
