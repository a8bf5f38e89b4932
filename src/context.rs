//! Context compression for long-running conversations.
//!
//! Before each model call the working message list is checked against a
//! message-count and a token threshold. Once either is reached, one
//! [`CompressionStrategy`] rewrites the list: long tool runs and finished
//! rounds become model-written summaries, oversized single messages become
//! previews. Everything removed is written to a
//! [`ContextOffloader`](crate::offload::ContextOffloader) first, and every
//! replacement carries a reload hint naming the offload id.
//!
//! # Configuration
//!
//! Use [`AutoContextConfig`] to tune when compression triggers:
//! - `msg_threshold`: message count that triggers compression
//! - `max_token` and `token_ratio`: token budget and the fraction that triggers
//! - `last_keep`: recent messages protected from payload offloading
//! - `min_consecutive_tool_messages`: tool runs must be longer than this

mod config;
mod estimator;
pub mod prompts;
pub mod strategy;
mod summarizer;

pub use config::AutoContextConfig;
pub use estimator::TokenEstimator;
pub use prompts::{offload_ids, reload_hint};
pub use strategy::{CompressionStrategy, StrategyContext, StrategyOutcome, default_strategies};
pub use summarizer::{Summarizer, Summary};
