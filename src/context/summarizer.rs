//! LLM-backed summarization of message ranges.

use crate::llm::{ChatRequest, LlmProvider, Message, StreamAccumulator, StreamDelta, Usage};
use anyhow::{Context, Result, bail};
use futures::StreamExt;
use std::sync::Arc;

use super::prompts::{self, SUMMARY_SYSTEM};

/// Text produced by one summarization call.
#[derive(Debug, Clone)]
pub struct Summary {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Turns a list of messages into a digest using the model.
///
/// Failures are returned as-is: there is no fallback summary and no retry.
pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl Summarizer {
    pub const DEFAULT_MAX_TOKENS: u32 = 2000;

    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request for summarizing `messages`: preamble, transcript, closing instruction.
    #[must_use]
    pub fn build_request(
        &self,
        preamble: &str,
        messages: &[Message],
        closing: &str,
    ) -> ChatRequest {
        self.build_request_from_text(preamble, &prompts::transcript(messages), closing)
    }

    #[must_use]
    pub fn build_request_from_text(
        &self,
        preamble: &str,
        body: &str,
        closing: &str,
    ) -> ChatRequest {
        ChatRequest {
            system: SUMMARY_SYSTEM.to_string(),
            messages: vec![Message::user(format!(
                "{preamble}\n\n<messages>\n{body}</messages>\n\n{closing}"
            ))],
            tools: None,
            max_tokens: self.max_tokens,
        }
    }

    /// Summarize `messages` framed by `preamble` and `closing`.
    ///
    /// # Errors
    /// Returns an error if the model call fails, reports an error in the
    /// stream, or produces no text.
    pub async fn summarize(
        &self,
        preamble: &str,
        messages: &[Message],
        closing: &str,
    ) -> Result<Summary> {
        self.run(self.build_request(preamble, messages, closing)).await
    }

    /// Send a prepared request and fold the streamed reply into one text.
    ///
    /// # Errors
    /// Returns an error if the model call fails, reports an error in the
    /// stream, or produces no text.
    pub async fn run(&self, request: ChatRequest) -> Result<Summary> {
        let mut stream = self.provider.chat_stream(request);
        let mut accumulator = StreamAccumulator::new();

        log::debug!(
            "Requesting summary from provider={} model={}",
            self.provider.provider(),
            self.provider.model()
        );

        while let Some(item) = stream.next().await {
            let delta = item.context("Failed to call LLM for summarization")?;
            if let StreamDelta::Error {
                message,
                recoverable,
            } = &delta
            {
                bail!("Summarization failed (recoverable={recoverable}): {message}");
            }
            accumulator.apply(&delta);
        }

        let usage = accumulator.usage().cloned();
        let text = accumulator.text();
        if text.trim().is_empty() {
            bail!("No text in summarization response");
        }

        if let Some(usage) = &usage {
            log::debug!(
                "Summary received chars={} input_tokens={} output_tokens={}",
                text.len(),
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(Summary { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::test_utils::MockProvider;

    #[tokio::test]
    async fn test_summarize_returns_model_text() -> Result<()> {
        let provider = Arc::new(MockProvider::with_summaries(&["Read two files."]));
        let summarizer = Summarizer::new(provider.clone());

        let summary = summarizer
            .summarize("pre", &[Message::user("hello")], "post")
            .await?;

        assert_eq!(summary.text, "Read two files.");
        assert_eq!(summary.usage.map(|u| u.output_tokens), Some(20));
        assert_eq!(provider.call_count(), 1);
        Ok(())
    }

    #[test]
    fn test_request_frames_transcript() {
        let provider = Arc::new(MockProvider::with_summaries(&[]));
        let summarizer = Summarizer::new(provider).with_max_tokens(64);

        let request = summarizer.build_request("PRE", &[Message::user("question")], "POST");

        assert!(request.tools.is_none());
        assert_eq!(request.max_tokens, 64);
        assert_eq!(request.messages.len(), 1);
        let text = request.messages[0].text_content();
        assert!(text.starts_with("PRE"));
        assert!(text.contains("User: question"));
        assert!(text.ends_with("POST"));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = Arc::new(MockProvider::failing("connection reset"));
        let summarizer = Summarizer::new(provider);

        let err = summarizer
            .summarize("pre", &[Message::user("x")], "post")
            .await
            .expect_err("failure should propagate");

        assert!(format!("{err:#}").contains("connection reset"));
    }

    #[tokio::test]
    async fn test_server_error_outcome_propagates() {
        let provider = Arc::new(MockProvider::server_error("overloaded"));
        let summarizer = Summarizer::new(provider);

        let err = summarizer
            .summarize("pre", &[Message::user("x")], "post")
            .await
            .expect_err("server error should propagate");

        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_empty_summary_is_an_error() {
        let provider = Arc::new(MockProvider::with_summaries(&["   "]));
        let summarizer = Summarizer::new(provider);

        assert!(
            summarizer
                .summarize("pre", &[Message::user("x")], "post")
                .await
                .is_err()
        );
    }
}
