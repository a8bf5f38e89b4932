use crate::llm::Message;
use anyhow::Result;
use async_trait::async_trait;
use std::ops::Range;

use super::{
    CompressionStrategy, StrategyContext, StrategyOutcome, latest_assistant_reply,
    offload_and_summarize,
};
use crate::context::prompts::{TOOL_RUN_CLOSING, TOOL_RUN_PREAMBLE};

/// Summarizes the earliest long run of tool messages before the latest
/// assistant reply.
pub struct ToolRunStrategy;

impl ToolRunStrategy {
    /// Earliest maximal run of tool messages in `messages[..boundary]` longer than `min_len`.
    fn find_run(messages: &[Message], boundary: usize, min_len: usize) -> Option<Range<usize>> {
        let mut i = 0;
        while i < boundary {
            if !messages[i].is_tool_message() {
                i += 1;
                continue;
            }
            let start = i;
            while i < boundary && messages[i].is_tool_message() {
                i += 1;
            }
            if i - start > min_len {
                return Some(start..i);
            }
        }
        None
    }
}

#[async_trait]
impl CompressionStrategy for ToolRunStrategy {
    fn name(&self) -> &'static str {
        "tool_run_summary"
    }

    async fn try_apply(
        &self,
        ctx: &StrategyContext<'_>,
        messages: &[Message],
    ) -> Result<Option<StrategyOutcome>> {
        let Some(boundary) = latest_assistant_reply(messages) else {
            return Ok(None);
        };
        let Some(run) =
            Self::find_run(messages, boundary, ctx.config.min_consecutive_tool_messages)
        else {
            return Ok(None);
        };

        log::debug!(
            "Summarizing tool run start={} end={} len={}",
            run.start,
            run.end,
            run.len()
        );

        let (summary, id) = offload_and_summarize(
            ctx,
            &messages[run.clone()],
            "Summary of earlier tool calls",
            TOOL_RUN_PREAMBLE,
            TOOL_RUN_CLOSING,
        )
        .await?;

        let mut rewritten = Vec::with_capacity(messages.len() - run.len() + 1);
        rewritten.extend_from_slice(&messages[..run.start]);
        rewritten.push(summary);
        rewritten.extend_from_slice(&messages[run.end..]);

        Ok(Some(StrategyOutcome {
            messages: rewritten,
            offload_ids: vec![id],
        }))
    }
}
