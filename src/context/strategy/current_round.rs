use crate::context::prompts::{self, CURRENT_ROUND_CLOSING, CURRENT_ROUND_PREAMBLE};
use crate::llm::{ContentBlock, Message, Role};
use crate::types::new_offload_id;
use anyhow::Result;
use async_trait::async_trait;

use super::{CompressionStrategy, StrategyContext, StrategyOutcome, latest_user_prompt};

/// Merges everything after the latest user prompt into one assistant digest.
///
/// Tool calls survive verbatim in the digest; tool results only reach the
/// model truncated. This is the last resort when earlier history is already
/// minimal.
pub struct CurrentRoundStrategy;

impl CurrentRoundStrategy {
    fn merged_message(digest: &str, range: &[Message], offload_id: &str) -> Message {
        let calls: Vec<String> = range
            .iter()
            .flat_map(|message| &message.content)
            .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
            .map(prompts::tool_call_line)
            .collect();

        let mut text = format!("[Summary of the current round]\n{}\n", digest.trim());
        if !calls.is_empty() {
            text.push_str(&calls.join("\n"));
            text.push('\n');
        }
        text.push_str(&prompts::reload_hint(offload_id));
        prompts::replacement(Role::Assistant, text, offload_id, false)
    }
}

#[async_trait]
impl CompressionStrategy for CurrentRoundStrategy {
    fn name(&self) -> &'static str {
        "current_round_summary"
    }

    async fn try_apply(
        &self,
        ctx: &StrategyContext<'_>,
        messages: &[Message],
    ) -> Result<Option<StrategyOutcome>> {
        let Some(prompt) = latest_user_prompt(messages) else {
            return Ok(None);
        };
        let range = &messages[prompt + 1..];
        match range {
            [] => return Ok(None),
            // A lone reply or digest: nothing left to merge.
            [only] if !only.is_tool_message() => return Ok(None),
            _ => {}
        }

        log::debug!("Merging current round of {} messages", range.len());

        let id = new_offload_id();
        ctx.offloader.offload(&id, range).await?;

        let request = ctx.summarizer.build_request_from_text(
            CURRENT_ROUND_PREAMBLE,
            &prompts::transcript(range),
            CURRENT_ROUND_CLOSING,
        );
        let summary = ctx.summarizer.run(request).await?;

        let mut rewritten = messages[..=prompt].to_vec();
        rewritten.push(Self::merged_message(&summary.text, range, &id));

        Ok(Some(StrategyOutcome {
            messages: rewritten,
            offload_ids: vec![id],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoContextConfig, Summarizer};
    use crate::memory::test_utils::{MockProvider, tool_pair};
    use crate::offload::{ContextOffloader, InMemoryOffloader};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_merges_round_in_progress() -> Result<()> {
        let provider = Arc::new(MockProvider::with_summaries(&["checked three files"]));
        let summarizer = Summarizer::new(provider.clone());
        let offloader = InMemoryOffloader::new();
        let config = AutoContextConfig::default();
        let ctx = StrategyContext {
            config: &config,
            offloader: &offloader,
            summarizer: &summarizer,
        };

        let mut messages = vec![Message::user("audit the crate")];
        messages.extend(tool_pair("c1", &"a".repeat(2000)));
        messages.extend(tool_pair("c2", "b"));
        messages.extend(tool_pair("c3", "c"));

        let outcome = CurrentRoundStrategy
            .try_apply(&ctx, &messages)
            .await?
            .expect("current round should be merged");

        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0], messages[0]);
        let merged = outcome.messages[1].text_content();
        assert!(outcome.messages[1].is_assistant_reply());
        assert!(merged.contains("checked three files"));
        assert!(merged.contains("[Tool call: name=read id=c1"));
        assert!(merged.contains("id=c3"));
        assert_eq!(prompts::offload_ids(&merged), outcome.offload_ids);
        assert_eq!(
            outcome.messages[1].offload_id(),
            Some(outcome.offload_ids[0].as_str())
        );
        assert_eq!(offloader.reload(&outcome.offload_ids[0]).await?, messages[1..]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_results_are_truncated_for_the_model() -> Result<()> {
        let provider = Arc::new(MockProvider::with_summaries(&["digest"]));
        let summarizer = Summarizer::new(provider.clone());
        let offloader = InMemoryOffloader::new();
        let config = AutoContextConfig::default();
        let ctx = StrategyContext {
            config: &config,
            offloader: &offloader,
            summarizer: &summarizer,
        };

        let mut messages = vec![Message::user("q")];
        messages.extend(tool_pair("c1", &"z".repeat(2000)));
        CurrentRoundStrategy.try_apply(&ctx, &messages).await?;

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let sent = requests[0].messages[0].text_content();
        assert!(sent.contains(&format!("{}...", "z".repeat(prompts::TOOL_RESULT_CHAR_LIMIT))));
        assert!(!sent.contains(&"z".repeat(prompts::TOOL_RESULT_CHAR_LIMIT + 1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_minimal_rounds_are_left_alone() -> Result<()> {
        let provider = Arc::new(MockProvider::with_summaries(&[]));
        let summarizer = Summarizer::new(provider.clone());
        let offloader = InMemoryOffloader::new();
        let config = AutoContextConfig::default();
        let ctx = StrategyContext {
            config: &config,
            offloader: &offloader,
            summarizer: &summarizer,
        };

        let answered = vec![Message::user("q"), Message::assistant("a")];
        let pending = vec![Message::assistant("a"), Message::user("q")];
        let no_prompt = vec![Message::assistant("a")];

        for messages in [answered, pending, no_prompt] {
            assert!(CurrentRoundStrategy.try_apply(&ctx, &messages).await?.is_none());
        }
        assert_eq!(provider.call_count(), 0);
        assert!(offloader.is_empty()?);
        Ok(())
    }
}
