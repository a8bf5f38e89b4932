//! Streaming types for LLM responses.
//!
//! Providers yield [`StreamDelta`] events; [`StreamAccumulator`] folds them
//! into the final assistant message once the stream ends.

use crate::llm::{ChatOutcome, ContentBlock, Message, Role, StopReason, Usage};
use futures::Stream;
use std::pin::Pin;

/// Events yielded during a streaming LLM response.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A text fragment for the content block at `block_index`.
    TextDelta { delta: String, block_index: usize },

    /// Start of a tool use block.
    ToolUseStart {
        id: String,
        name: String,
        block_index: usize,
    },

    /// Incremental (possibly partial) JSON for a tool input.
    ToolInputDelta {
        id: String,
        delta: String,
        block_index: usize,
    },

    /// Usage information, typically sent at the end of the stream.
    Usage(Usage),

    /// Stream completed.
    Done { stop_reason: Option<StopReason> },

    /// Provider-side error reported in-band.
    Error { message: String, recoverable: bool },
}

/// Boxed stream of deltas returned by [`LlmProvider::chat_stream`](crate::llm::LlmProvider::chat_stream).
pub type StreamBox<'a> = Pin<Box<dyn Stream<Item = anyhow::Result<StreamDelta>> + Send + 'a>>;

/// Replays a non-streaming outcome as a sequence of deltas.
pub(crate) fn outcome_deltas(outcome: ChatOutcome) -> Vec<StreamDelta> {
    let response = match outcome {
        ChatOutcome::Success(response) => response,
        ChatOutcome::RateLimited => {
            return vec![StreamDelta::Error {
                message: "rate limited".to_string(),
                recoverable: true,
            }];
        }
        ChatOutcome::InvalidRequest(message) => {
            return vec![StreamDelta::Error {
                message: format!("invalid request: {message}"),
                recoverable: false,
            }];
        }
        ChatOutcome::ServerError(message) => {
            return vec![StreamDelta::Error {
                message: format!("server error: {message}"),
                recoverable: true,
            }];
        }
    };

    let mut deltas = Vec::with_capacity(response.content.len() + 2);
    for (block_index, block) in response.content.into_iter().enumerate() {
        match block {
            ContentBlock::Text { text } => deltas.push(StreamDelta::TextDelta {
                delta: text,
                block_index,
            }),
            ContentBlock::ToolUse { id, name, input } => {
                deltas.push(StreamDelta::ToolUseStart {
                    id: id.clone(),
                    name,
                    block_index,
                });
                deltas.push(StreamDelta::ToolInputDelta {
                    id,
                    delta: input.to_string(),
                    block_index,
                });
            }
            // Models do not author tool results.
            ContentBlock::ToolResult { .. } => {}
        }
    }
    deltas.push(StreamDelta::Usage(response.usage));
    deltas.push(StreamDelta::Done {
        stop_reason: response.stop_reason,
    });
    deltas
}

/// Collects [`StreamDelta`] events into a final message.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text_blocks: Vec<(usize, String)>,
    tool_uses: Vec<PendingToolUse>,
    usage: Option<Usage>,
    stop_reason: Option<StopReason>,
}

#[derive(Debug)]
struct PendingToolUse {
    id: String,
    name: String,
    input_json: String,
    block_index: usize,
}

impl StreamAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, delta: &StreamDelta) {
        match delta {
            StreamDelta::TextDelta { delta, block_index } => {
                match self
                    .text_blocks
                    .iter_mut()
                    .find(|(idx, _)| idx == block_index)
                {
                    Some((_, text)) => text.push_str(delta),
                    None => self.text_blocks.push((*block_index, delta.clone())),
                }
            }
            StreamDelta::ToolUseStart {
                id,
                name,
                block_index,
            } => self.tool_uses.push(PendingToolUse {
                id: id.clone(),
                name: name.clone(),
                input_json: String::new(),
                block_index: *block_index,
            }),
            StreamDelta::ToolInputDelta { id, delta, .. } => {
                if let Some(tool) = self.tool_uses.iter_mut().find(|t| t.id == *id) {
                    tool.input_json.push_str(delta);
                }
            }
            StreamDelta::Usage(usage) => self.usage = Some(usage.clone()),
            StreamDelta::Done { stop_reason } => self.stop_reason = *stop_reason,
            StreamDelta::Error { .. } => {}
        }
    }

    #[must_use]
    pub const fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    #[must_use]
    pub const fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    /// Text accumulated so far, in block order.
    #[must_use]
    pub fn text(&self) -> String {
        let mut blocks: Vec<&(usize, String)> = self.text_blocks.iter().collect();
        blocks.sort_by_key(|(idx, _)| *idx);
        blocks.into_iter().map(|(_, text)| text.as_str()).collect()
    }

    /// Convert accumulated content to blocks ordered by block index.
    ///
    /// Invalid tool input JSON becomes a null input.
    #[must_use]
    pub fn into_content_blocks(self) -> Vec<ContentBlock> {
        let mut blocks: Vec<(usize, ContentBlock)> = self
            .text_blocks
            .into_iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(idx, text)| (idx, ContentBlock::Text { text }))
            .collect();

        for tool in self.tool_uses {
            let input = serde_json::from_str(&tool.input_json).unwrap_or(serde_json::Value::Null);
            blocks.push((
                tool.block_index,
                ContentBlock::ToolUse {
                    id: tool.id,
                    name: tool.name,
                    input,
                },
            ));
        }

        blocks.sort_by_key(|(idx, _)| *idx);
        blocks.into_iter().map(|(_, block)| block).collect()
    }

    /// Consume the accumulator into a single assistant message.
    #[must_use]
    pub fn into_message(self) -> Message {
        Message::new(Role::Assistant, self.into_content_blocks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatResponse;
    use serde_json::json;

    fn text(delta: &str, block_index: usize) -> StreamDelta {
        StreamDelta::TextDelta {
            delta: delta.to_string(),
            block_index,
        }
    }

    #[test]
    fn test_accumulator_joins_text_in_block_order() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&text("second", 1));
        acc.apply(&text("first ", 0));
        acc.apply(&text("half", 0));

        assert_eq!(acc.text(), "first halfsecond");
        let blocks = acc.into_content_blocks();
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], ContentBlock::Text { text } if text == "first half"));
    }

    #[test]
    fn test_accumulator_tool_use_and_usage() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&StreamDelta::ToolUseStart {
            id: "call_1".to_string(),
            name: "read_file".to_string(),
            block_index: 0,
        });
        acc.apply(&StreamDelta::ToolInputDelta {
            id: "call_1".to_string(),
            delta: r#"{"path":"#.to_string(),
            block_index: 0,
        });
        acc.apply(&StreamDelta::ToolInputDelta {
            id: "call_1".to_string(),
            delta: r#""a.rs"}"#.to_string(),
            block_index: 0,
        });
        acc.apply(&StreamDelta::Usage(Usage {
            input_tokens: 12,
            output_tokens: 3,
        }));
        acc.apply(&StreamDelta::Done {
            stop_reason: Some(StopReason::ToolUse),
        });

        assert_eq!(acc.usage().map(|u| u.input_tokens), Some(12));
        assert!(matches!(acc.stop_reason(), Some(StopReason::ToolUse)));
        let message = acc.into_message();
        assert_eq!(message.role, Role::Assistant);
        match &message.content[0] {
            ContentBlock::ToolUse { input, .. } => assert_eq!(input["path"], "a.rs"),
            other => panic!("expected tool use, got {other:?}"),
        }
    }

    #[test]
    fn test_accumulator_invalid_tool_json_is_null() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&StreamDelta::ToolUseStart {
            id: "call_2".to_string(),
            name: "bash".to_string(),
            block_index: 0,
        });
        acc.apply(&StreamDelta::ToolInputDelta {
            id: "call_2".to_string(),
            delta: "{not json".to_string(),
            block_index: 0,
        });

        let blocks = acc.into_content_blocks();
        assert!(matches!(&blocks[0], ContentBlock::ToolUse { input, .. } if input.is_null()));
    }

    #[test]
    fn test_outcome_deltas_replay_success() {
        let outcome = ChatOutcome::Success(ChatResponse {
            id: "msg_1".to_string(),
            content: vec![
                ContentBlock::text("hello"),
                ContentBlock::ToolUse {
                    id: "call_3".to_string(),
                    name: "ls".to_string(),
                    input: json!({"dir": "."}),
                },
            ],
            model: "mock".to_string(),
            stop_reason: Some(StopReason::EndTurn),
            usage: Usage {
                input_tokens: 1,
                output_tokens: 2,
            },
        });

        let mut acc = StreamAccumulator::new();
        for delta in outcome_deltas(outcome) {
            acc.apply(&delta);
        }

        assert_eq!(acc.text(), "hello");
        assert_eq!(acc.usage().map(|u| u.output_tokens), Some(2));
        let blocks = acc.into_content_blocks();
        assert!(matches!(&blocks[1], ContentBlock::ToolUse { input, .. } if input["dir"] == "."));
    }

    #[test]
    fn test_outcome_deltas_replay_failures_as_errors() {
        let deltas = outcome_deltas(ChatOutcome::InvalidRequest("bad".to_string()));
        assert!(matches!(
            &deltas[..],
            [StreamDelta::Error { recoverable: false, message }] if message.contains("bad")
        ));

        let deltas = outcome_deltas(ChatOutcome::RateLimited);
        assert!(matches!(
            &deltas[..],
            [StreamDelta::Error {
                recoverable: true,
                ..
            }]
        ));
    }
}
