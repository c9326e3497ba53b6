// Graph State
// AgentState for the support StateGraph

use crate::llm::ChatMessage;
use crate::rag::RetrievedTicket;

/// Main graph state
#[derive(Debug, Clone)]
pub struct AgentState {
    // Session identifier (checkpointer thread id)
    pub session_id: String,

    // Transcript so far, latest user message last
    pub messages: Vec<ChatMessage>,

    // Tickets the model answered from
    pub sources: Vec<RetrievedTicket>,

    // Final output
    pub output: Option<String>,
}

impl AgentState {
    pub fn new(session_id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            session_id: session_id.into(),
            messages,
            sources: Vec::new(),
            output: None,
        }
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map(|m| m.content.as_str())
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_user_message_skips_trailing_assistant_turns() {
        let state = AgentState::new(
            "s1",
            vec![
                ChatMessage::user("first"),
                ChatMessage::assistant("answer"),
                ChatMessage::user("second"),
                ChatMessage::assistant("answer 2"),
            ],
        );
        assert_eq!(state.last_user_message(), Some("second"));
        assert_eq!(state.last_message().map(|m| m.content.as_str()), Some("answer 2"));
    }

    #[test]
    fn empty_state_has_no_user_message() {
        let state = AgentState::new("s1", Vec::new());
        assert!(state.last_user_message().is_none());
        assert!(state.output.is_none());
    }
}
