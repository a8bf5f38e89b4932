//! Fixed prompt text and replacement-message templates.

use crate::llm::{ContentBlock, Message, Role};
use serde_json::{Map, Value};
use std::fmt::Write;

/// Tool results are cut to this many characters in transcripts and merged rounds.
pub const TOOL_RESULT_CHAR_LIMIT: usize = 500;

pub const SUMMARY_SYSTEM: &str = "You are a precise summarizer. You compress parts of an agent conversation so the agent can keep working with a smaller context. Preserve every technical detail needed to continue the work.";

pub const TOOL_RUN_PREAMBLE: &str = "The following is a run of consecutive tool calls and their results from earlier in the conversation.";
pub const TOOL_RUN_CLOSING: &str = "Summarize what these tool calls did and what they found. Keep file paths, identifiers, commands, error messages and conclusions. Answer with the summary only.";

pub const ROUND_PREAMBLE: &str = "The following is the work an assistant did to answer one earlier user request, ending with its reply.";
pub const ROUND_CLOSING: &str = "Summarize the steps taken and the answer given. Keep decisions, file paths, identifiers and any open issues. Answer with the summary only.";

pub const CURRENT_ROUND_PREAMBLE: &str = "The following is the work done so far for the request the assistant is currently handling. Tool calls are listed verbatim; tool results are truncated.";
pub const CURRENT_ROUND_CLOSING: &str = "Write a short digest of the progress so far: what was attempted, what was learned and what remains. Answer with the digest only.";

const HINT_MARKER: &str = "ID=";

/// Hint appended to every replacement message that stands in for offloaded content.
#[must_use]
pub fn reload_hint(offload_id: &str) -> String {
    format!("[Original content offloaded; you may reload with {HINT_MARKER}{offload_id}]")
}

/// Whether `message` is a replacement written by compression.
#[must_use]
pub fn is_replacement(message: &Message) -> bool {
    message.offload_id().is_some()
}

/// Single-text-block message standing in for offloaded content.
///
/// The offload id is recorded in metadata, and `tool_traffic` keeps a
/// stand-in for a tool call or result classified as tool traffic.
#[must_use]
pub fn replacement(role: Role, text: String, offload_id: &str, tool_traffic: bool) -> Message {
    let mut metadata = Map::new();
    metadata.insert(
        Message::OFFLOAD_ID_KEY.to_string(),
        Value::String(offload_id.to_string()),
    );
    if tool_traffic {
        metadata.insert(Message::TOOL_TRAFFIC_KEY.to_string(), Value::Bool(true));
    }
    Message::new(role, vec![ContentBlock::text(text)]).with_metadata(metadata)
}

/// Every offload id named by a reload hint in `text`, in order.
#[must_use]
pub fn offload_ids(text: &str) -> Vec<String> {
    text.match_indices(HINT_MARKER)
        .map(|(at, _)| {
            text[at + HINT_MARKER.len()..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
        })
        .filter(|id| !id.is_empty())
        .collect()
}

/// First `limit` characters of `text`, char-boundary safe.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Replacement for one oversized message: preview plus reload hint.
#[must_use]
pub fn preview_message(original: &Message, preview_chars: usize, offload_id: &str) -> Message {
    let preview = truncate_chars(&original.flattened_text(), preview_chars);
    let text = format!(
        "[Large {} message offloaded. Preview]\n{preview}\n{}",
        original.role.as_str().to_lowercase(),
        reload_hint(offload_id)
    );
    let mut message = replacement(original.role, text, offload_id, original.is_tool_message());
    message.name.clone_from(&original.name);
    message
}

/// Assistant message carrying a model digest of offloaded messages.
#[must_use]
pub fn summary_message(heading: &str, digest: &str, offload_id: &str) -> Message {
    let text = format!(
        "[{heading}]\n{}\n{}",
        digest.trim(),
        reload_hint(offload_id)
    );
    replacement(Role::Assistant, text, offload_id, false)
}

/// Plain-text transcript of `messages` for a summarization request.
///
/// Tool calls keep their name, id and input verbatim; tool results are cut to
/// [`TOOL_RESULT_CHAR_LIMIT`] characters.
#[must_use]
pub fn transcript(messages: &[Message]) -> String {
    let mut output = String::new();

    for message in messages {
        let _ = write!(output, "{}", message.role.as_str());
        if let Some(name) = &message.name {
            let _ = write!(output, " ({name})");
        }
        output.push_str(": ");

        for block in &message.content {
            match block {
                ContentBlock::Text { text } => {
                    let _ = writeln!(output, "{text}");
                }
                ContentBlock::ToolUse { .. } => {
                    let _ = writeln!(output, "{}", tool_call_line(block));
                }
                ContentBlock::ToolResult { id, name, output: result } => {
                    let _ = writeln!(
                        output,
                        "[Tool result: name={name} id={id}] {}",
                        truncate_chars(
                            &ContentBlock::output_text(result),
                            TOOL_RESULT_CHAR_LIMIT
                        )
                    );
                }
            }
        }
        output.push('\n');
    }

    output
}

/// `[Tool call: name=.. id=.. input=..]` for a tool-use block, empty otherwise.
#[must_use]
pub fn tool_call_line(block: &ContentBlock) -> String {
    match block {
        ContentBlock::ToolUse { id, name, input } => {
            format!("[Tool call: name={name} id={id} input={input}]")
        }
        _ => String::new(),
    }
}
