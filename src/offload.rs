//! Off-loading of evicted context.
//!
//! When compression removes messages from working storage it first stores
//! them here under a fresh id, and the replacement message names that id so
//! the content can be reloaded later.
//!
//! - [`InMemoryOffloader`] keeps records in a map owned by one engine
//! - [`LocalFileOffloader`] writes one JSON file per record

mod local;

pub use local::LocalFileOffloader;

use crate::llm::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key/value store for evicted message lists.
#[async_trait]
pub trait ContextOffloader: Send + Sync {
    /// Store `messages` under `id`, overwriting any previous record.
    ///
    /// # Errors
    /// Returns an error if the record cannot be persisted.
    async fn offload(&self, id: &str, messages: &[Message]) -> Result<()>;

    /// Load the record stored under `id`, or an empty list if there is none.
    ///
    /// # Errors
    /// Returns an error if the record exists but cannot be read or decoded.
    async fn reload(&self, id: &str) -> Result<Vec<Message>>;

    /// Remove the record stored under `id`.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    async fn clear(&self, id: &str) -> Result<()>;
}

/// [`ContextOffloader`] backed by a map owned by this instance.
#[derive(Debug, Default)]
pub struct InMemoryOffloader {
    records: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryOffloader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.records.read().ok().context("lock poisoned")?.len())
    }

    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self
            .records
            .read()
            .ok()
            .context("lock poisoned")?
            .contains_key(id))
    }
}

#[async_trait]
impl ContextOffloader for InMemoryOffloader {
    async fn offload(&self, id: &str, messages: &[Message]) -> Result<()> {
        self.records
            .write()
            .ok()
            .context("lock poisoned")?
            .insert(id.to_string(), messages.to_vec());
        Ok(())
    }

    async fn reload(&self, id: &str) -> Result<Vec<Message>> {
        let records = self.records.read().ok().context("lock poisoned")?;
        Ok(records.get(id).cloned().unwrap_or_default())
    }

    async fn clear(&self, id: &str) -> Result<()> {
        self.records
            .write()
            .ok()
            .context("lock poisoned")?
            .remove(id);
        Ok(())
    }
}
