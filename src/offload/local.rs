use super::ContextOffloader;
use crate::llm::Message;
use crate::types::SessionId;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each offload record as `<root>/<id>.json`.
pub struct LocalFileOffloader {
    root: PathBuf,
}

impl LocalFileOffloader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Records for `session` live in `<root>/<session>/`.
    #[must_use]
    pub fn for_session(root: impl Into<PathBuf>, session: &SessionId) -> Self {
        Self::new(root.into().join(session.as_str()))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        // Ids become file names; anything that could escape the root is refused.
        if id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\'])
        {
            bail!("invalid offload id: {id:?}");
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

#[async_trait]
impl ContextOffloader for LocalFileOffloader {
    async fn offload(&self, id: &str, messages: &[Message]) -> Result<()> {
        let path = self.record_path(id)?;
        let json = serde_json::to_vec_pretty(messages)
            .with_context(|| format!("Failed to encode offloaded context {id}"))?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.root.display()))?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write offloaded context {id}: {}", path.display()))
    }

    async fn reload(&self, id: &str) -> Result<Vec<Message>> {
        let path = self.record_path(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read offloaded context {id}: {}", path.display())
                });
            }
        };

        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to decode offloaded context {id}"))
    }

    async fn clear(&self, id: &str) -> Result<()> {
        let path = self.record_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to delete offloaded context {id}: {}", path.display())
            }),
        }
    }
}
