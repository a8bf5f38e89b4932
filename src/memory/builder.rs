use crate::context::{AutoContextConfig, Summarizer, default_strategies};
use crate::llm::LlmProvider;
use crate::offload::{ContextOffloader, InMemoryOffloader, LocalFileOffloader};
use crate::stores::{InMemoryStorage, MemoryStorage};
use crate::types::SessionId;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::AutoContextMemory;

/// Builder for constructing an [`AutoContextMemory`].
///
/// Only the provider is required. Storages and the offloader default to
/// fresh in-memory instances owned by the built memory. With
/// [`offload_dir`](Self::offload_dir), records go to
/// `<dir>/<session_id>/` instead, so sessions sharing a directory never see
/// each other's records.
///
/// # Example
///
/// ```ignore
/// let memory = AutoContextMemory::builder()
///     .provider(my_provider)
///     .offloader(Arc::new(LocalFileOffloader::new("/var/lib/agent/context")))
///     .build()?;
/// ```
pub struct AutoContextMemoryBuilder<P> {
    provider: Option<Arc<P>>,
    config: Option<AutoContextConfig>,
    working: Option<Arc<dyn MemoryStorage>>,
    original: Option<Arc<dyn MemoryStorage>>,
    offloader: Option<Arc<dyn ContextOffloader>>,
    session_id: Option<SessionId>,
    offload_dir: Option<PathBuf>,
    summary_max_tokens: Option<u32>,
}

impl AutoContextMemoryBuilder<()> {
    /// Create a new builder with no components set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            provider: None,
            config: None,
            working: None,
            original: None,
            offloader: None,
            session_id: None,
            offload_dir: None,
            summary_max_tokens: None,
        }
    }
}

impl Default for AutoContextMemoryBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> AutoContextMemoryBuilder<P> {
    /// Set the model used for summaries.
    #[must_use]
    pub fn provider<P2: LlmProvider>(self, provider: P2) -> AutoContextMemoryBuilder<P2> {
        self.shared_provider(Arc::new(provider))
    }

    /// Set a provider that is also used elsewhere.
    #[must_use]
    pub fn shared_provider<P2: LlmProvider>(
        self,
        provider: Arc<P2>,
    ) -> AutoContextMemoryBuilder<P2> {
        AutoContextMemoryBuilder {
            provider: Some(provider),
            config: self.config,
            working: self.working,
            original: self.original,
            offloader: self.offloader,
            session_id: self.session_id,
            offload_dir: self.offload_dir,
            summary_max_tokens: self.summary_max_tokens,
        }
    }

    #[must_use]
    pub fn config(mut self, config: AutoContextConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the storage for the compressed, model-facing list.
    #[must_use]
    pub fn working_storage<S: MemoryStorage + 'static>(mut self, storage: Arc<S>) -> Self {
        self.working = Some(storage);
        self
    }

    /// Set the storage for the append-only ledger.
    #[must_use]
    pub fn original_storage<S: MemoryStorage + 'static>(mut self, storage: Arc<S>) -> Self {
        self.original = Some(storage);
        self
    }

    /// Set where evicted messages are kept.
    ///
    /// Takes precedence over [`offload_dir`](Self::offload_dir).
    #[must_use]
    pub fn offloader<O: ContextOffloader + 'static>(mut self, offloader: Arc<O>) -> Self {
        self.offloader = Some(offloader);
        self
    }

    /// Offload to JSON files under `dir`, scoped by session.
    ///
    /// A fresh session id is generated at build time if none was set.
    #[must_use]
    pub fn offload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.offload_dir = Some(dir.into());
        self
    }

    /// Session this memory belongs to. Scopes [`offload_dir`](Self::offload_dir)
    /// records and is included in compression logs.
    #[must_use]
    pub fn session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Cap the length of each generated summary.
    #[must_use]
    pub fn summary_max_tokens(mut self, max_tokens: u32) -> Self {
        self.summary_max_tokens = Some(max_tokens);
        self
    }
}

impl<P: LlmProvider + 'static> AutoContextMemoryBuilder<P> {
    /// Build the memory.
    ///
    /// # Errors
    /// Returns an error if the provider is missing or the configuration is invalid.
    pub fn build(self) -> Result<AutoContextMemory> {
        let provider: Arc<dyn LlmProvider> = self.provider.context("provider is required")?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut session_id = self.session_id;
        let offloader: Arc<dyn ContextOffloader> = match (self.offloader, self.offload_dir) {
            (Some(offloader), _) => offloader,
            (None, Some(dir)) => {
                let session = session_id.get_or_insert_with(SessionId::new);
                Arc::new(LocalFileOffloader::for_session(dir, session))
            }
            (None, None) => Arc::new(InMemoryOffloader::new()),
        };

        let mut summarizer = Summarizer::new(provider);
        if let Some(max_tokens) = self.summary_max_tokens {
            summarizer = summarizer.with_max_tokens(max_tokens);
        }

        Ok(AutoContextMemory {
            config,
            working: self
                .working
                .unwrap_or_else(|| Arc::new(InMemoryStorage::new())),
            original: self
                .original
                .unwrap_or_else(|| Arc::new(InMemoryStorage::new())),
            offloader,
            summarizer,
            strategies: default_strategies(),
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::test_utils::MockProvider;

    #[test]
    fn test_build_with_defaults() -> Result<()> {
        let memory = AutoContextMemory::builder()
            .provider(MockProvider::with_summaries(&[]))
            .build()?;

        assert_eq!(memory.config().msg_threshold, 100);
        assert!(memory.session_id().is_none());
        Ok(())
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = AutoContextMemory::builder()
            .provider(MockProvider::with_summaries(&[]))
            .config(AutoContextConfig::default().with_token_ratio(1.5))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_session_id_is_kept() -> Result<()> {
        let memory = AutoContextMemory::builder()
            .provider(MockProvider::with_summaries(&[]))
            .session_id(SessionId::from_string("session-7"))
            .build()?;

        assert_eq!(memory.session_id().map(SessionId::as_str), Some("session-7"));
        Ok(())
    }

    #[test]
    fn test_offload_dir_generates_session() -> Result<()> {
        let memory = AutoContextMemory::builder()
            .provider(MockProvider::with_summaries(&[]))
            .offload_dir(std::env::temp_dir())
            .build()?;

        assert!(memory.session_id().is_some());
        Ok(())
    }
}
