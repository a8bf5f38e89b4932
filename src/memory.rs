//! The compressing conversation memory.
//!
//! [`AutoContextMemory`] keeps two lists: an append-only original ledger and
//! a working list that is compressed in place before it is handed to the
//! model. Compression runs lazily inside
//! [`get_messages`](Memory::get_messages).
//!
//! # Example
//!
//! ```ignore
//! use auto_context::{AutoContextConfig, AutoContextMemory, Memory, llm::Message};
//!
//! let memory = AutoContextMemory::builder()
//!     .provider(my_provider)
//!     .config(AutoContextConfig::default().with_msg_threshold(40))
//!     .build()?;
//!
//! memory.add_message(Message::user("Find the flaky test")).await?;
//! let context = memory.get_messages().await?;
//! ```

mod builder;
#[cfg(test)]
pub(crate) mod test_utils;

pub use builder::AutoContextMemoryBuilder;

use crate::context::{
    AutoContextConfig, CompressionStrategy, StrategyContext, Summarizer, TokenEstimator,
};
use crate::llm::Message;
use crate::offload::ContextOffloader;
use crate::stores::MemoryStorage;
use crate::types::SessionId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Message memory consumed by an agent loop.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Record a new message.
    ///
    /// # Errors
    /// Returns an error if the message cannot be stored.
    async fn add_message(&self, message: Message) -> Result<()>;

    /// Messages to send with the next model call.
    ///
    /// # Errors
    /// Returns an error if storage, offloading or summarization fails.
    async fn get_messages(&self) -> Result<Vec<Message>>;

    /// Remove the message at `index` from the model-facing list.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    async fn delete_message(&self, index: usize) -> Result<()>;

    /// Forget everything.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    async fn clear(&self) -> Result<()>;
}

/// What one compression pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    /// Name of the strategy that rewrote the working list.
    pub strategy: &'static str,
    /// Offload records created by the rewrite.
    pub offload_ids: Vec<String>,
    pub original_count: usize,
    pub new_count: usize,
    pub original_tokens: usize,
    pub new_tokens: usize,
}

/// [`Memory`] that compresses its working list once it grows past the
/// configured thresholds.
///
/// At most one strategy runs per [`compact`](Self::compact) call. The working
/// list is replaced in one step only after the strategy has finished, so a
/// failed offload or summary leaves it untouched.
pub struct AutoContextMemory {
    config: AutoContextConfig,
    working: Arc<dyn MemoryStorage>,
    original: Arc<dyn MemoryStorage>,
    offloader: Arc<dyn ContextOffloader>,
    summarizer: Summarizer,
    strategies: Vec<Box<dyn CompressionStrategy>>,
    session_id: Option<SessionId>,
}

impl AutoContextMemory {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> AutoContextMemoryBuilder<()> {
        AutoContextMemoryBuilder::new()
    }

    #[must_use]
    pub const fn config(&self) -> &AutoContextConfig {
        &self.config
    }

    #[must_use]
    pub const fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    fn session_label(&self) -> &str {
        self.session_id.as_ref().map_or("-", SessionId::as_str)
    }

    /// Whether `messages` have reached the message-count or token threshold.
    #[must_use]
    pub fn needs_compression(&self, messages: &[Message]) -> bool {
        let count = messages.len();
        if count >= self.config.msg_threshold {
            log::debug!(
                "Message threshold reached count={count} threshold={}",
                self.config.msg_threshold
            );
            return true;
        }

        let tokens = TokenEstimator::estimate_history(messages);
        let threshold = self.config.token_threshold();
        log::debug!("Token check tokens={tokens} threshold={threshold}");
        tokens >= threshold
    }

    /// Run one compression pass over the working list.
    ///
    /// Returns `None` when no threshold is reached or when no strategy
    /// applies to the current shape of the history.
    ///
    /// # Errors
    /// Returns an error if storage, offloading or summarization fails; the
    /// working list is unchanged in that case.
    pub async fn compact(&self) -> Result<Option<CompressionResult>> {
        let current = self
            .working
            .get_messages()
            .await
            .context("Failed to read working storage")?;
        if !self.needs_compression(&current) {
            return Ok(None);
        }

        let ctx = StrategyContext {
            config: &self.config,
            offloader: self.offloader.as_ref(),
            summarizer: &self.summarizer,
        };

        for strategy in &self.strategies {
            let Some(outcome) = strategy
                .try_apply(&ctx, &current)
                .await
                .with_context(|| format!("Compression strategy {} failed", strategy.name()))?
            else {
                log::debug!("Strategy {} does not apply", strategy.name());
                continue;
            };

            let result = CompressionResult {
                strategy: strategy.name(),
                offload_ids: outcome.offload_ids,
                original_count: current.len(),
                new_count: outcome.messages.len(),
                original_tokens: TokenEstimator::estimate_history(&current),
                new_tokens: TokenEstimator::estimate_history(&outcome.messages),
            };

            self.working
                .replace_messages(outcome.messages)
                .await
                .context("Failed to replace working storage")?;

            log::info!(
                "Context compressed session={} strategy={} messages={}->{} tokens={}->{} \
                 offloaded={}",
                self.session_label(),
                result.strategy,
                result.original_count,
                result.new_count,
                result.original_tokens,
                result.new_tokens,
                result.offload_ids.len()
            );
            return Ok(Some(result));
        }

        log::warn!(
            "Context over threshold but no compression strategy applies session={} messages={}",
            self.session_label(),
            current.len()
        );
        Ok(None)
    }

    /// The full, uncompressed history in insertion order.
    ///
    /// # Errors
    /// Returns an error if original storage cannot be read.
    pub async fn original_messages(&self) -> Result<Vec<Message>> {
        self.original.get_messages().await
    }

    /// Messages stored under a reload hint's id.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read or decoded.
    pub async fn reload(&self, offload_id: &str) -> Result<Vec<Message>> {
        self.offloader
            .reload(offload_id)
            .await
            .with_context(|| format!("Failed to reload offloaded context {offload_id}"))
    }
}

#[async_trait]
impl Memory for AutoContextMemory {
    async fn add_message(&self, message: Message) -> Result<()> {
        self.original
            .add_message(message.clone())
            .await
            .context("Failed to append to original storage")?;
        self.working
            .add_message(message)
            .await
            .context("Failed to append to working storage")
    }

    async fn get_messages(&self) -> Result<Vec<Message>> {
        self.compact().await?;
        self.working.get_messages().await
    }

    async fn delete_message(&self, index: usize) -> Result<()> {
        self.working.delete_message(index).await
    }

    async fn clear(&self) -> Result<()> {
        self.working.clear().await?;
        self.original.clear().await
    }
}
