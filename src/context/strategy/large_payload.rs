use crate::context::prompts;
use crate::llm::Message;
use crate::types::new_offload_id;
use anyhow::Result;
use async_trait::async_trait;

use super::{CompressionStrategy, StrategyContext, StrategyOutcome, latest_assistant_reply};

/// Offloads single oversized messages, replacing each with a short preview.
///
/// With tail protection neither the last `last_keep` messages nor anything
/// from the latest assistant reply onward is touched; without it only the
/// latest reply and what follows are kept.
pub struct LargePayloadStrategy {
    protect_tail: bool,
}

impl LargePayloadStrategy {
    #[must_use]
    pub const fn protecting_tail() -> Self {
        Self { protect_tail: true }
    }

    #[must_use]
    pub const fn unprotected() -> Self {
        Self {
            protect_tail: false,
        }
    }

    /// First index of the protected zone, or `None` to skip entirely.
    fn boundary(&self, messages: &[Message], last_keep: usize) -> Option<usize> {
        let latest_reply = latest_assistant_reply(messages);
        if self.protect_tail {
            if messages.len() < last_keep {
                return None;
            }
            let tail_start = messages.len() - last_keep;
            // Both the latest reply and the last `last_keep` messages stay intact.
            Some(latest_reply.map_or(tail_start, |idx| idx.min(tail_start)))
        } else {
            Some(latest_reply.unwrap_or(0))
        }
    }
}

#[async_trait]
impl CompressionStrategy for LargePayloadStrategy {
    fn name(&self) -> &'static str {
        if self.protect_tail {
            "large_payload_offload_protect_tail"
        } else {
            "large_payload_offload"
        }
    }

    async fn try_apply(
        &self,
        ctx: &StrategyContext<'_>,
        messages: &[Message],
    ) -> Result<Option<StrategyOutcome>> {
        let Some(boundary) = self.boundary(messages, ctx.config.last_keep) else {
            return Ok(None);
        };

        let threshold = ctx.config.large_payload_threshold;
        let mut rewritten: Option<Vec<Message>> = None;
        let mut offload_ids = Vec::new();

        for idx in (0..boundary).rev() {
            let message = &messages[idx];
            if prompts::is_replacement(message)
                || message.flattened_text().chars().count() <= threshold
            {
                continue;
            }

            let id = new_offload_id();
            ctx.offloader
                .offload(&id, std::slice::from_ref(message))
                .await?;
            log::debug!("Offloaded large {:?} message index={idx} id={id}", message.role);

            let preview =
                prompts::preview_message(message, ctx.config.offload_single_preview, &id);
            rewritten.get_or_insert_with(|| messages.to_vec())[idx] = preview;
            offload_ids.push(id);
        }

        Ok(rewritten.map(|messages| StrategyOutcome {
            messages,
            offload_ids,
        }))
    }
}
