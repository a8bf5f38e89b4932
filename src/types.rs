//! Identifier types shared across the crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one conversation session.
///
/// Used to keep offloaded context of concurrent sessions apart when they
/// share a backing store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fresh identifier for one offload record.
#[must_use]
pub fn new_offload_id() -> String {
    Uuid::new_v4().to_string()
}
