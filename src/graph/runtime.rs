// Graph Runtime
// Steps an AgentState through petgraph-linked nodes until one returns Final

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::AgentState;

const DEFAULT_MAX_STEPS: usize = 25;

/// Label on an edge: taken by default or only for a named branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Default,
    When(String),
}

impl Route {
    fn accepts(&self, branch: Option<&str>) -> bool {
        match (self, branch) {
            (Route::Default, None) => true,
            (Route::When(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// Compiled graph. Built once at startup and shared by every request.
pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, Route>,
    by_id: HashMap<&'static str, NodeIndex>,
    entry: NodeIndex,
    max_steps: usize,
}

impl GraphRuntime {
    pub fn node_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn entry(&self) -> &'static str {
        self.graph[self.entry].id()
    }

    pub async fn run(
        &self,
        state: &mut AgentState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<(), GraphError> {
        let mut current = self.entry;
        let mut trace: Vec<String> = Vec::new();

        while trace.len() < self.max_steps {
            let node = &self.graph[current];
            tracing::debug!(
                "session={} step={} node={}",
                state.session_id,
                trace.len(),
                node.id()
            );

            let output = node
                .execute(state, ctx)
                .await
                .map_err(|err| err.with_trace(&trace))?;
            trace.push(node.id().to_string());

            match self.next(current, output) {
                Ok(Some(next)) => current = next,
                Ok(None) => return Ok(()),
                Err(err) => return Err(err.with_trace(&trace)),
            }
        }

        Err(GraphError::new(
            "runtime",
            format!("Maximum steps ({}) exceeded", self.max_steps),
        )
        .with_trace(&trace))
    }

    /// `None` means the run is finished.
    fn next(&self, from: NodeIndex, output: NodeOutput) -> Result<Option<NodeIndex>, GraphError> {
        let from_id = self.graph[from].id();
        let branch = match output {
            NodeOutput::Final => return Ok(None),
            NodeOutput::Error(msg) => return Err(GraphError::new(from_id, msg)),
            NodeOutput::Continue(Some(target)) => {
                return self.by_id.get(target.as_str()).copied().map(Some).ok_or_else(|| {
                    GraphError::new(from_id, format!("Explicit target node not found: {}", target))
                });
            }
            NodeOutput::Continue(None) => None,
            NodeOutput::Branch(branch) => Some(branch),
        };

        let mut fallback = None;
        let mut any_edge = false;
        for edge in self.graph.edges_directed(from, Direction::Outgoing) {
            any_edge = true;
            if edge.weight().accepts(branch.as_deref()) {
                return Ok(Some(edge.target()));
            }
            if *edge.weight() == Route::Default {
                fallback = Some(edge.target());
            }
        }

        if !any_edge {
            return Err(GraphError::new(
                from_id,
                format!("No outgoing edges from node: {}", from_id),
            ));
        }
        match fallback {
            Some(target) => {
                tracing::warn!(
                    "Branch '{}' has no edge from '{}', taking the default edge",
                    branch.as_deref().unwrap_or(""),
                    from_id
                );
                Ok(Some(target))
            }
            None => Err(GraphError::new(
                from_id,
                format!("No edge for branch: {}", branch.as_deref().unwrap_or("(none)")),
            )),
        }
    }
}

/// Collects nodes and edges; wiring is checked in [`GraphBuilder::build`].
pub struct GraphBuilder {
    entry: String,
    max_steps: usize,
    nodes: Vec<Box<dyn Node>>,
    edges: Vec<(String, String, Route)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            entry: String::new(),
            max_steps: DEFAULT_MAX_STEPS,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.entry = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into(), Route::Default));
        self
    }

    pub fn branch(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        self.edges
            .push((from.into(), to.into(), Route::When(branch.into())));
        self
    }

    pub fn build(self) -> Result<GraphRuntime, GraphError> {
        let mut graph = DiGraph::new();
        let mut by_id = HashMap::new();
        for node in self.nodes {
            let id = node.id();
            if by_id.insert(id, graph.add_node(node)).is_some() {
                return Err(GraphError::new("builder", format!("Duplicate node id: {}", id)));
            }
        }

        let entry = *by_id.get(self.entry.as_str()).ok_or_else(|| {
            GraphError::new("builder", format!("Entry node not found: {}", self.entry))
        })?;

        for (from, to, route) in self.edges {
            let lookup = |id: &str| {
                by_id
                    .get(id)
                    .copied()
                    .ok_or_else(|| GraphError::new("builder", format!("Edge references unknown node: {}", id)))
            };
            let (from_idx, to_idx) = (lookup(&from)?, lookup(&to)?);
            graph.add_edge(from_idx, to_idx, route);
        }

        Ok(GraphRuntime {
            graph,
            by_id,
            entry,
            max_steps: self.max_steps.max(1),
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::dummy_chain;
    use async_trait::async_trait;

    struct StepNode {
        id: &'static str,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for StepNode {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            state: &mut AgentState,
            _ctx: &mut NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            let mut visited = state.output.take().unwrap_or_default();
            visited.push_str(self.id);
            visited.push(';');
            state.output = Some(visited);
            Ok(self.output.clone())
        }
    }

    fn step(id: &'static str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(StepNode { id, output })
    }

    async fn run(graph: &GraphRuntime) -> (AgentState, Result<(), GraphError>) {
        let chain = dummy_chain();
        let mut state = AgentState::new("s", Vec::new());
        let mut ctx = NodeContext { chain: &chain };
        let result = graph.run(&mut state, &mut ctx).await;
        (state, result)
    }

    #[test]
    fn route_matching() {
        assert!(Route::Default.accepts(None));
        assert!(!Route::Default.accepts(Some("chat")));
        assert!(Route::When("chat".into()).accepts(Some("chat")));
        assert!(!Route::When("chat".into()).accepts(Some("search")));
        assert!(!Route::When("chat".into()).accepts(None));
    }

    #[test]
    fn build_rejects_bad_wiring() {
        let missing_entry = GraphBuilder::new()
            .entry("missing")
            .node(step("a", NodeOutput::Final))
            .build();
        assert!(missing_entry.is_err());

        let duplicate = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Final))
            .node(step("a", NodeOutput::Final))
            .build();
        assert!(duplicate.is_err());

        let dangling = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Final))
            .edge("a", "ghost")
            .build();
        assert!(dangling.is_err());
    }

    #[tokio::test]
    async fn single_final_node_runs_once() {
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Final))
            .build()
            .unwrap();

        let (state, result) = run(&graph).await;

        result.unwrap();
        assert_eq!(state.output.as_deref(), Some("a;"));
    }

    #[tokio::test]
    async fn branch_follows_named_edge() {
        let graph = GraphBuilder::new()
            .entry("router")
            .node(step("router", NodeOutput::Branch("right".to_string())))
            .node(step("left", NodeOutput::Final))
            .node(step("right", NodeOutput::Final))
            .branch("router", "left", "left")
            .branch("router", "right", "right")
            .build()
            .unwrap();

        let (state, result) = run(&graph).await;

        result.unwrap();
        assert_eq!(state.output.as_deref(), Some("router;right;"));
    }

    #[tokio::test]
    async fn unknown_branch_takes_default_edge() {
        let graph = GraphBuilder::new()
            .entry("router")
            .node(step("router", NodeOutput::Branch("other".to_string())))
            .node(step("fallback", NodeOutput::Final))
            .node(step("named", NodeOutput::Final))
            .branch("router", "named", "named")
            .edge("router", "fallback")
            .build()
            .unwrap();

        let (state, result) = run(&graph).await;

        result.unwrap();
        assert_eq!(state.output.as_deref(), Some("router;fallback;"));
    }

    #[tokio::test]
    async fn cycles_stop_at_max_steps_with_trace() {
        let graph = GraphBuilder::new()
            .entry("a")
            .max_steps(3)
            .node(step("a", NodeOutput::Continue(None)))
            .node(step("b", NodeOutput::Continue(None)))
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();

        let (_, result) = run(&graph).await;
        let err = result.unwrap_err();

        assert!(err.message.contains("Maximum steps (3)"));
        assert_eq!(err.execution_trace, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn continue_without_edges_is_an_error() {
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue(None)))
            .build()
            .unwrap();

        let (_, result) = run(&graph).await;
        let err = result.unwrap_err();

        assert!(err.message.contains("No outgoing edges"));
        assert_eq!(err.execution_trace, vec!["a"]);
    }

    #[tokio::test]
    async fn error_output_carries_node_id() {
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Error("boom".to_string())))
            .build()
            .unwrap();

        let (_, result) = run(&graph).await;
        let err = result.unwrap_err();

        assert_eq!(err.node_id, "a");
        assert_eq!(err.message, "boom");
    }
}
