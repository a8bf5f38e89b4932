//! Compression strategies.
//!
//! Each strategy inspects a snapshot of the working messages and either
//! returns a rewritten list or `None` when its shape does not apply. The
//! engine runs them in [`default_strategies`] order and stops at the first
//! rewrite.

mod current_round;
mod large_payload;
mod round_summary;
mod tool_run;

pub use current_round::CurrentRoundStrategy;
pub use large_payload::LargePayloadStrategy;
pub use round_summary::RoundSummaryStrategy;
pub use tool_run::ToolRunStrategy;

use crate::llm::Message;
use crate::offload::ContextOffloader;
use crate::types::new_offload_id;
use anyhow::Result;
use async_trait::async_trait;

use super::config::AutoContextConfig;
use super::prompts;
use super::summarizer::Summarizer;

/// Collaborators a strategy may use while rewriting.
pub struct StrategyContext<'a> {
    pub config: &'a AutoContextConfig,
    pub offloader: &'a dyn ContextOffloader,
    pub summarizer: &'a Summarizer,
}

/// A rewrite produced by one strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub messages: Vec<Message>,
    /// Offload records created for this rewrite.
    pub offload_ids: Vec<String>,
}

#[async_trait]
pub trait CompressionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrite `messages`, or return `None` if this strategy does not apply.
    ///
    /// Must not touch any storage other than the off-loader; the caller
    /// swaps the returned list into working storage.
    ///
    /// # Errors
    /// Returns an error if offloading or summarization fails.
    async fn try_apply(
        &self,
        ctx: &StrategyContext<'_>,
        messages: &[Message],
    ) -> Result<Option<StrategyOutcome>>;
}

/// The fixed priority order used by the engine.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn CompressionStrategy>> {
    vec![
        Box::new(ToolRunStrategy),
        Box::new(LargePayloadStrategy::protecting_tail()),
        Box::new(LargePayloadStrategy::unprotected()),
        Box::new(RoundSummaryStrategy),
        Box::new(CurrentRoundStrategy),
    ]
}

/// Index of the last assistant message that is not a tool call.
pub(crate) fn latest_assistant_reply(messages: &[Message]) -> Option<usize> {
    messages.iter().rposition(Message::is_assistant_reply)
}

/// Index of the last user message that is not a tool result.
pub(crate) fn latest_user_prompt(messages: &[Message]) -> Option<usize> {
    messages.iter().rposition(Message::is_user_prompt)
}

/// Offload `messages` under a fresh id, then summarize them into one
/// assistant message carrying the reload hint.
pub(crate) async fn offload_and_summarize(
    ctx: &StrategyContext<'_>,
    messages: &[Message],
    heading: &str,
    preamble: &str,
    closing: &str,
) -> Result<(Message, String)> {
    let id = new_offload_id();
    ctx.offloader.offload(&id, messages).await?;
    let summary = ctx.summarizer.summarize(preamble, messages, closing).await?;
    Ok((prompts::summary_message(heading, &summary.text, &id), id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_indices_ignore_tool_traffic() {
        let messages = vec![
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::tool_use("c1", "ls", json!({})),
            Message::tool_result("c1", "ls", "out"),
        ];

        assert_eq!(latest_assistant_reply(&messages), Some(1));
        assert_eq!(latest_user_prompt(&messages), Some(2));
        assert_eq!(latest_assistant_reply(&messages[2..]), None);
    }

    #[test]
    fn test_default_order() {
        let names: Vec<&str> = default_strategies()
            .iter()
            .map(|s| s.name())
            .collect();

        assert_eq!(
            names,
            vec![
                "tool_run_summary",
                "large_payload_offload_protect_tail",
                "large_payload_offload",
                "round_summary",
                "current_round_summary",
            ]
        );
    }
}
