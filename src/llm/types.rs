use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write;

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<Tool>>,
    pub max_tokens: u32,
}

/// A single conversation message.
///
/// Messages are never edited in place once they are part of a history;
/// compression builds new messages and swaps whole lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Message {
    /// Metadata key holding the offload id of a compression replacement.
    pub const OFFLOAD_ID_KEY: &'static str = "offload_id";

    /// Metadata key set on a replacement that stands in for tool traffic.
    pub const TOOL_TRAFFIC_KEY: &'static str = "tool_traffic";

    #[must_use]
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            name: None,
            metadata: None,
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentBlock::text(text)])
    }

    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentBlock::text(text)])
    }

    /// Assistant message requesting a single tool call.
    #[must_use]
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::new(
            Role::Assistant,
            vec![ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }],
        )
    }

    /// Tool-role message answering the tool call with the same `id`.
    #[must_use]
    pub fn tool_result(
        id: impl Into<String>,
        name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::new(
            Role::Tool,
            vec![ContentBlock::ToolResult {
                id: id.into(),
                name: name.into(),
                output: vec![ContentBlock::text(output)],
            }],
        )
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Concatenated text of the top-level text blocks.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every piece of text carried by the message, including tool inputs and
    /// nested tool-result output.
    #[must_use]
    pub fn flattened_text(&self) -> String {
        let mut output = String::new();
        for block in &self.content {
            block.flatten_into(&mut output);
        }
        output
    }

    #[must_use]
    pub fn has_tool_blocks(&self) -> bool {
        self.content.iter().any(ContentBlock::is_tool_block)
    }

    /// Offload id recorded on a compression replacement.
    #[must_use]
    pub fn offload_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get(Self::OFFLOAD_ID_KEY)?
            .as_str()
    }

    /// Whether this message is a replacement that stands in for tool traffic.
    #[must_use]
    pub fn replaces_tool_traffic(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(Self::TOOL_TRAFFIC_KEY))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Tool-role messages, any message carrying a tool-use or tool-result
    /// block, and replacements of such messages.
    #[must_use]
    pub fn is_tool_message(&self) -> bool {
        self.role == Role::Tool || self.has_tool_blocks() || self.replaces_tool_traffic()
    }

    /// An assistant message that answers the user rather than calling a tool.
    #[must_use]
    pub fn is_assistant_reply(&self) -> bool {
        self.role == Role::Assistant && !self.is_tool_message()
    }

    #[must_use]
    pub fn is_user_prompt(&self) -> bool {
        self.role == Role::User && !self.is_tool_message()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::Tool => "Tool",
            Self::System => "System",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        id: String,
        name: String,
        output: Vec<ContentBlock>,
    },
}

impl ContentBlock {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub const fn is_tool_block(&self) -> bool {
        matches!(self, Self::ToolUse { .. } | Self::ToolResult { .. })
    }

    fn flatten_into(&self, output: &mut String) {
        match self {
            Self::Text { text } => output.push_str(text),
            Self::ToolUse { name, input, .. } => {
                let _ = write!(output, "{name} {input}");
            }
            Self::ToolResult { output: blocks, .. } => {
                for block in blocks {
                    block.flatten_into(output);
                }
            }
        }
    }

    /// Text of a tool result's output blocks.
    #[must_use]
    pub fn output_text(blocks: &[Self]) -> String {
        let mut output = String::new();
        for block in blocks {
            block.flatten_into(&mut output);
        }
        output
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: Option<StopReason>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Success(ChatResponse),
    RateLimited,
    InvalidRequest(String),
    ServerError(String),
}
