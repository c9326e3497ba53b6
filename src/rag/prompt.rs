//! Prompt profiles for the retrieval QA chain.

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

pub const ESCALATION_REPLY: &str =
    "This issue is not present in the current L1 knowledge base. Please escalate.";

const STRICT_TEMPLATE: &str = r#"
You are an L1 IT Support Assistant.

STRICT RULES (MANDATORY):
- Answer ONLY using the information present in the provided context.
- Do NOT use general IT knowledge.
- Do NOT assume or infer anything not explicitly stated.
- If the answer is NOT found in the context, reply EXACTLY:
  "{escalation}"

RESPONSE FORMAT (MANDATORY):
- Use clear bullet points
- Professional L1 support tone
- Include sections ONLY if present in context:
  • Issue Summary
  • Likely Cause
  • Resolution Steps
  • Escalation Criteria

CONTEXT:
{context}

USER QUESTION:
{question}

ANSWER:
"#;

/// System half of the generic chat QA prompt; the question goes as the
/// user message.
const DEFAULT_SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the user's question. \n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
----------------\n\
{context}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptProfile {
    /// Answer only from context, escalate otherwise.
    #[default]
    Strict,
    /// Generic chat QA prompt: context as system, question as user.
    Default,
}

impl PromptProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptProfile::Strict => "strict",
            PromptProfile::Default => "default",
        }
    }

    /// Sampling temperature used when `openai.temperature` is not set.
    pub fn default_temperature(&self) -> f64 {
        match self {
            PromptProfile::Strict => 0.1,
            PromptProfile::Default => 0.5,
        }
    }

    /// Messages sent to the chat model for one question.
    pub fn messages(&self, context: &str, question: &str) -> Vec<ChatMessage> {
        match self {
            PromptProfile::Strict => vec![ChatMessage::user(fill(
                STRICT_TEMPLATE,
                &[
                    ("{escalation}", ESCALATION_REPLY),
                    ("{context}", context),
                    ("{question}", question),
                ],
            ))],
            PromptProfile::Default => vec![
                ChatMessage::system(fill(DEFAULT_SYSTEM_TEMPLATE, &[("{context}", context)])),
                ChatMessage::user(question),
            ],
        }
    }
}

/// Single left-to-right pass; substituted text is never re-scanned.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = vars
            .iter()
            .filter_map(|(key, value)| rest.find(key).map(|pos| (pos, *key, *value)))
            .min_by_key(|(pos, _, _)| *pos);
        match next {
            Some((pos, key, value)) => {
                out.push_str(&rest[..pos]);
                out.push_str(value);
                rest = &rest[pos + key.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Joins page contents the way a "stuff" chain does: one blank line
/// between documents.
pub fn format_context<'a, I>(pages: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    pages.into_iter().collect::<Vec<_>>().join("\n\n")
}
