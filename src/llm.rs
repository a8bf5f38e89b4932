pub mod streaming;
pub mod types;

pub use streaming::{StreamAccumulator, StreamBox, StreamDelta};
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// A language model used to generate summaries.
///
/// Only [`chat`](LlmProvider::chat) is required; the default
/// [`chat_stream`](LlmProvider::chat_stream) replays its outcome as deltas.
/// Providers with native streaming should override it.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome>;

    fn chat_stream(&self, request: ChatRequest) -> StreamBox<'_> {
        Box::pin(async_stream::stream! {
            match self.chat(request).await {
                Ok(outcome) => {
                    for delta in streaming::outcome_deltas(outcome) {
                        yield Ok(delta);
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }

    fn model(&self) -> &str;
    fn provider(&self) -> &'static str;
}
