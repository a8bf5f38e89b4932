//! Token estimation for threshold checks.

use crate::llm::{ContentBlock, Message};

/// Estimates token count for messages.
///
/// Uses a heuristic of ~4 characters per token. The result only feeds
/// threshold comparisons, so it is deterministic rather than exact.
pub struct TokenEstimator;

impl TokenEstimator {
    const CHARS_PER_TOKEN: usize = 4;

    /// Role and framing overhead per message.
    const MESSAGE_OVERHEAD: usize = 4;

    /// Id, name and framing of a tool use block.
    const TOOL_USE_OVERHEAD: usize = 20;

    /// Id and framing of a tool result block.
    const TOOL_RESULT_OVERHEAD: usize = 10;

    #[must_use]
    pub const fn estimate_text(text: &str) -> usize {
        text.len().div_ceil(Self::CHARS_PER_TOKEN)
    }

    #[must_use]
    pub fn estimate_message(message: &Message) -> usize {
        let name_tokens = message.name.as_deref().map_or(0, Self::estimate_text);
        let content_tokens: usize = message.content.iter().map(Self::estimate_block).sum();
        content_tokens + name_tokens + Self::MESSAGE_OVERHEAD
    }

    #[must_use]
    pub fn estimate_block(block: &ContentBlock) -> usize {
        match block {
            ContentBlock::Text { text } => Self::estimate_text(text),
            ContentBlock::ToolUse { name, input, .. } => {
                Self::estimate_text(name)
                    + Self::estimate_text(&input.to_string())
                    + Self::TOOL_USE_OVERHEAD
            }
            ContentBlock::ToolResult { name, output, .. } => {
                Self::estimate_text(name)
                    + output.iter().map(Self::estimate_block).sum::<usize>()
                    + Self::TOOL_RESULT_OVERHEAD
            }
        }
    }

    /// Estimate total tokens for a message history.
    #[must_use]
    pub fn estimate_history(messages: &[Message]) -> usize {
        messages.iter().map(Self::estimate_message).sum()
    }
}
