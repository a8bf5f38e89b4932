use crate::context::prompts::{ROUND_CLOSING, ROUND_PREAMBLE};
use crate::llm::Message;
use anyhow::Result;
use async_trait::async_trait;

use super::{
    CompressionStrategy, StrategyContext, StrategyOutcome, latest_assistant_reply,
    offload_and_summarize,
};

/// Summarizes every completed round before the latest assistant reply.
///
/// A round is a user prompt, the tool traffic that followed it and the
/// assistant reply that answered it. Everything after the prompt, up to and
/// including the reply, collapses into one assistant summary placed right
/// after the prompt.
pub struct RoundSummaryStrategy;

impl RoundSummaryStrategy {
    /// `(user, reply)` index pairs in `messages[..boundary]` with at least one
    /// message between them.
    fn completed_rounds(messages: &[Message], boundary: usize) -> Vec<(usize, usize)> {
        let mut rounds = Vec::new();
        let mut open_prompt = None;

        for (idx, message) in messages[..boundary].iter().enumerate() {
            if message.is_user_prompt() {
                open_prompt = Some(idx);
            } else if message.is_assistant_reply()
                && let Some(prompt) = open_prompt.take()
                && idx - prompt > 1
            {
                rounds.push((prompt, idx));
            }
        }

        rounds
    }
}

#[async_trait]
impl CompressionStrategy for RoundSummaryStrategy {
    fn name(&self) -> &'static str {
        "round_summary"
    }

    async fn try_apply(
        &self,
        ctx: &StrategyContext<'_>,
        messages: &[Message],
    ) -> Result<Option<StrategyOutcome>> {
        let Some(boundary) = latest_assistant_reply(messages) else {
            return Ok(None);
        };
        let rounds = Self::completed_rounds(messages, boundary);
        if rounds.is_empty() {
            return Ok(None);
        }

        log::debug!("Summarizing {} completed rounds", rounds.len());

        // Back to front so earlier indices stay valid while splicing.
        let mut rewritten = messages.to_vec();
        let mut offload_ids = Vec::with_capacity(rounds.len());
        for &(prompt, reply) in rounds.iter().rev() {
            let (summary, id) = offload_and_summarize(
                ctx,
                &messages[prompt + 1..=reply],
                "Summary of an earlier round",
                ROUND_PREAMBLE,
                ROUND_CLOSING,
            )
            .await?;
            rewritten.splice(prompt + 1..=reply, [summary]);
            offload_ids.push(id);
        }

        Ok(Some(StrategyOutcome {
            messages: rewritten,
            offload_ids,
        }))
    }
}
