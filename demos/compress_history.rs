//! Context compression example.
//!
//! Feeds a long, tool-heavy conversation into an [`AutoContextMemory`] with
//! small thresholds and prints how the working list shrinks while the
//! original ledger keeps everything. A canned provider stands in for a real
//! model.
//!
//! # Running
//!
//! ```bash
//! cargo run --example compress_history
//! ```
//!
//! To see debug logs from the crate:
//! ```bash
//! RUST_LOG=auto_context=debug cargo run --example compress_history
//! ```

use anyhow::Result;
use async_trait::async_trait;
use auto_context::context::offload_ids;
use auto_context::llm::{
    ChatOutcome, ChatRequest, ChatResponse, ContentBlock, Message, StopReason, Usage,
};
use auto_context::{AutoContextConfig, AutoContextMemory, LlmProvider, Memory, SessionId};
use serde_json::json;

/// Answers every summary request with a one-line digest of its size.
struct CannedProvider;

#[async_trait]
impl LlmProvider for CannedProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome> {
        let chars: usize = request
            .messages
            .iter()
            .map(|m| m.text_content().len())
            .sum();
        Ok(ChatOutcome::Success(ChatResponse {
            id: "canned".to_string(),
            content: vec![ContentBlock::text(format!(
                "Condensed {chars} characters of earlier work."
            ))],
            model: "canned".to_string(),
            stop_reason: Some(StopReason::EndTurn),
            usage: Usage {
                input_tokens: 0,
                output_tokens: 0,
            },
        }))
    }

    fn model(&self) -> &'static str {
        "canned"
    }

    fn provider(&self) -> &'static str {
        "demo"
    }
}

fn task(round: usize) -> Vec<Message> {
    let mut messages = vec![Message::user(format!("Investigate failing test #{round}"))];
    for step in 0..4 {
        let id = format!("call_{round}_{step}");
        messages.push(Message::tool_use(
            &id,
            "read_file",
            json!({ "path": format!("tests/case_{round}_{step}.rs") }),
        ));
        messages.push(Message::tool_result(&id, "read_file", "fn case() {}\n".repeat(40)));
    }
    messages.push(Message::assistant(format!("Test #{round} fixed.")));
    messages
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging for debug output (the crate uses the `log` crate)
    env_logger::init();

    let session = SessionId::new();
    let root = std::env::temp_dir().join("auto-context-demo");

    let memory = AutoContextMemory::builder()
        .provider(CannedProvider)
        .config(
            AutoContextConfig::default()
                .with_msg_threshold(20)
                .with_last_keep(10)
                .with_large_payload_threshold(400)
                .with_min_consecutive_tool_messages(4),
        )
        .offload_dir(&root)
        .session_id(session.clone())
        .build()?;

    println!(
        "Session {session}, offloading to {}\n",
        root.join(session.as_str()).display()
    );

    for round in 0..6 {
        for message in task(round) {
            memory.add_message(message).await?;
        }
        let working = memory.get_messages().await?;
        let original = memory.original_messages().await?;
        println!(
            "round {round}: working={} original={}",
            working.len(),
            original.len()
        );
    }

    let working = memory.get_messages().await?;
    println!("\nWorking context:");
    for message in &working {
        let text = message.flattened_text();
        let line = text.lines().next().unwrap_or_default();
        println!("  {:<9} {line}", message.role.as_str());
    }

    if let Some(id) = working
        .iter()
        .flat_map(|m| offload_ids(&m.text_content()))
        .next()
    {
        let restored = memory.reload(&id).await?;
        println!("\nReloaded {} messages from {id}", restored.len());
    }

    Ok(())
}
