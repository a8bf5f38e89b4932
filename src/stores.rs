//! Ordered message storage.
//!
//! [`AutoContextMemory`](crate::AutoContextMemory) wires two independent
//! [`MemoryStorage`] instances:
//!
//! - *working*: the compactable list sent to the model, rewritten by whole-list swaps
//! - *original*: the append-only, full-fidelity ledger
//!
//! [`InMemoryStorage`] is the built-in backend. Implement the trait to keep
//! either list in your own database.

use crate::llm::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// Append-ordered container of messages.
///
/// Implementations must be safe for concurrent `add_message` and
/// `get_messages`: readers never observe a partially applied write.
#[async_trait]
pub trait MemoryStorage: Send + Sync {
    /// Append a message.
    ///
    /// # Errors
    /// Returns an error if the message cannot be stored.
    async fn add_message(&self, message: Message) -> Result<()>;

    /// Snapshot of the stored messages, in insertion order.
    ///
    /// # Errors
    /// Returns an error if the messages cannot be read.
    async fn get_messages(&self) -> Result<Vec<Message>>;

    /// Remove the message at `index`. Out-of-range indices are a no-op.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    async fn delete_message(&self, index: usize) -> Result<()>;

    /// Remove every message.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    async fn clear(&self) -> Result<()>;

    /// Replace the whole list in one step.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    async fn replace_messages(&self, messages: Vec<Message>) -> Result<()>;

    /// Number of stored messages.
    ///
    /// # Errors
    /// Returns an error if the count cannot be retrieved.
    async fn len(&self) -> Result<usize> {
        Ok(self.get_messages().await?.len())
    }
}

/// In-process [`MemoryStorage`] guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: RwLock::new(messages),
        }
    }
}

#[async_trait]
impl MemoryStorage for InMemoryStorage {
    async fn add_message(&self, message: Message) -> Result<()> {
        self.messages
            .write()
            .ok()
            .context("lock poisoned")?
            .push(message);
        Ok(())
    }

    async fn get_messages(&self) -> Result<Vec<Message>> {
        let messages = self.messages.read().ok().context("lock poisoned")?;
        Ok(messages.clone())
    }

    async fn delete_message(&self, index: usize) -> Result<()> {
        let mut messages = self.messages.write().ok().context("lock poisoned")?;
        if index < messages.len() {
            messages.remove(index);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.messages
            .write()
            .ok()
            .context("lock poisoned")?
            .clear();
        Ok(())
    }

    async fn replace_messages(&self, messages: Vec<Message>) -> Result<()> {
        *self.messages.write().ok().context("lock poisoned")? = messages;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.messages.read().ok().context("lock poisoned")?.len())
    }
}
