//! Auto Context - automatic context compression for LLM agent memory.
//!
//! This crate keeps a growing conversation within a token and message budget:
//! - Append-only original ledger next to a compressible working list
//! - Priority-ordered compression strategies driven by a language model
//! - Off-loading of evicted messages with reload hints for later recovery
//! - In-memory and local-file backends behind async traits
//!
//! # Example
//!
//! ```ignore
//! use auto_context::{AutoContextConfig, AutoContextMemory, Memory, llm::Message};
//!
//! let memory = AutoContextMemory::builder()
//!     .provider(my_provider)
//!     .config(AutoContextConfig::default())
//!     .build()?;
//!
//! memory.add_message(Message::user("Summarize the failing tests")).await?;
//! let messages = memory.get_messages().await?;
//! ```

#![forbid(unsafe_code)]

pub mod context;
pub mod llm;
mod memory;
pub mod offload;
mod stores;
mod types;

pub use context::{AutoContextConfig, CompressionStrategy, TokenEstimator};
pub use llm::LlmProvider;
pub use memory::{AutoContextMemory, AutoContextMemoryBuilder, CompressionResult, Memory};
pub use offload::{ContextOffloader, InMemoryOffloader, LocalFileOffloader};
pub use stores::{InMemoryStorage, MemoryStorage};
pub use types::{SessionId, new_offload_id};
