use crate::llm::{
    ChatOutcome, ChatRequest, ChatResponse, ContentBlock, LlmProvider, Message, StopReason, Usage,
};
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::json;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

// ===================
// Mock LLM Provider
// ===================

enum Script {
    Outcomes(Vec<ChatOutcome>),
    Fail(String),
}

/// Provider that replays scripted outcomes and records every request.
pub struct MockProvider {
    script: Script,
    requests: RwLock<Vec<ChatRequest>>,
    call_count: AtomicUsize,
}

impl MockProvider {
    fn scripted(script: Script) -> Self {
        Self {
            script,
            requests: RwLock::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Answers with `summaries` in order, then with "Done".
    pub fn with_summaries(summaries: &[&str]) -> Self {
        Self::scripted(Script::Outcomes(
            summaries.iter().map(|s| Self::text_response(s)).collect(),
        ))
    }

    /// Every call returns a transport error.
    pub fn failing(message: &str) -> Self {
        Self::scripted(Script::Fail(message.to_string()))
    }

    /// Every call reports a server error outcome.
    pub fn server_error(message: &str) -> Self {
        Self::scripted(Script::Outcomes(vec![
            ChatOutcome::ServerError(message.to_string());
            8
        ]))
    }

    pub fn text_response(text: &str) -> ChatOutcome {
        ChatOutcome::Success(ChatResponse {
            id: "msg_1".to_string(),
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            model: "mock-model".to_string(),
            stop_reason: Some(StopReason::EndTurn),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.read().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.write().expect("lock poisoned").push(request);

        match &self.script {
            Script::Fail(message) => bail!("{message}"),
            Script::Outcomes(outcomes) => Ok(outcomes
                .get(idx)
                .cloned()
                .unwrap_or_else(|| Self::text_response("Done"))),
        }
    }

    fn model(&self) -> &'static str {
        "mock-model"
    }

    fn provider(&self) -> &'static str {
        "mock"
    }
}

// ===================
// Message fixtures
// ===================

/// A `read` tool call and its result.
pub fn tool_pair(id: &str, output: &str) -> Vec<Message> {
    vec![
        Message::tool_use(id, "read", json!({ "path": format!("{id}.rs") })),
        Message::tool_result(id, "read", output),
    ]
}
