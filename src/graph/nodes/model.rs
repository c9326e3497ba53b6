// Model Node
// Answers the latest user message from the retrieval QA chain

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::AgentState;
use crate::llm::ChatMessage;

pub struct ModelNode;

impl ModelNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ModelNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ModelNode {
    fn id(&self) -> &'static str {
        "model"
    }

    fn name(&self) -> &'static str {
        "Model Node"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let question = state
            .last_user_message()
            .ok_or_else(|| GraphError::input(self.id(), "No user message in state"))?
            .to_string();
        tracing::info!("User query received: {}", question);

        let outcome = ctx
            .chain
            .invoke(&question)
            .await
            .map_err(|e| GraphError::from_api(self.id(), e))?;

        state
            .messages
            .push(ChatMessage::assistant(outcome.answer.clone()));
        state.sources = outcome.source_documents;
        state.output = Some(outcome.answer);
        Ok(NodeOutput::Final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_support_graph;
    use crate::graph::node::GraphErrorKind;
    use crate::graph::test_support::dummy_chain;

    #[tokio::test]
    async fn appends_assistant_reply_to_transcript() {
        let chain = dummy_chain();
        let graph = build_support_graph().unwrap();
        let mut state = AgentState::new(
            "s1",
            vec![ChatMessage::user("earlier"), ChatMessage::assistant("old"), ChatMessage::user("Printer jam?")],
        );
        let mut ctx = NodeContext { chain: &chain };

        graph.run(&mut state, &mut ctx).await.unwrap();

        assert_eq!(state.messages.len(), 4);
        let reply = state.last_message().unwrap();
        assert_eq!(reply.role, "assistant");
        // The echo model returns the user turn: only the latest question is asked.
        assert_eq!(reply.content, "Printer jam?");
        assert_eq!(state.output.as_deref(), Some(reply.content.as_str()));
    }

    #[tokio::test]
    async fn missing_user_message_is_an_input_error() {
        let chain = dummy_chain();
        let graph = build_support_graph().unwrap();
        let mut state = AgentState::new("s1", vec![ChatMessage::assistant("hello")]);
        let mut ctx = NodeContext { chain: &chain };

        let err = graph.run(&mut state, &mut ctx).await.unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Input);
        assert_eq!(err.node_id, "model");
    }
}
