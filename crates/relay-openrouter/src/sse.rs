// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoder for OpenRouter streaming chat-completion responses.
//!
//! The response body is a sequence of `data:` lines terminated by a
//! `[DONE]` sentinel. Each payload is decoded into a [`ChatEvent`]: a text
//! delta with an optional usage snapshot, or the completion marker.
//! Providers vary in how they shape deltas (plain string content, content
//! part arrays, tool-call argument fragments), so extraction walks the JSON
//! rather than insisting on one schema.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use relay_core::{RelayError, TokenUsage};
use serde_json::Value;

/// Sentinel line ending an OpenRouter stream.
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded provider chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A content delta. `content` may be empty when the chunk only refines
    /// usage counters.
    Delta {
        content: String,
        usage: Option<TokenUsage>,
    },
    /// The `[DONE]` completion marker.
    Done,
}

/// Parses a streaming response into typed [`ChatEvent`]s.
pub fn parse_chat_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<ChatEvent, RelayError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();
    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = event.data.trim();
                if data.is_empty() {
                    return None;
                }
                Some(decode_chunk(data))
            }
            Err(e) => Some(Err(RelayError::Upstream {
                status: None,
                message: format!("stream transport error: {e}"),
            })),
        }
    });
    Box::pin(mapped)
}

/// Decodes one `data:` payload.
pub fn decode_chunk(data: &str) -> Result<ChatEvent, RelayError> {
    if data == DONE_SENTINEL {
        return Ok(ChatEvent::Done);
    }
    let value: Value = serde_json::from_str(data)
        .map_err(|e| RelayError::Decode(format!("unparsable provider chunk: {e}")))?;

    // A mid-stream error object, e.g. {"error": {"code": 429, "message": ...}}.
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("provider reported an error")
            .to_string();
        let status = error
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok());
        return Err(RelayError::Upstream { status, message });
    }

    let delta = value
        .pointer("/choices/0/delta")
        .cloned()
        .unwrap_or(Value::Null);
    let content = extract_content(&delta);
    let usage = extract_usage(&value, &delta);
    Ok(ChatEvent::Delta { content, usage })
}

/// Pulls the text out of a delta: a plain string, a list of parts, or
/// tool-call argument fragments.
fn extract_content(delta: &Value) -> String {
    match delta.get("content") {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Array(parts)) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    Value::String(s) => out.push_str(s),
                    Value::Object(obj) => {
                        if let Some(Value::String(s)) = obj.get("text").or_else(|| obj.get("content"))
                        {
                            out.push_str(s);
                        }
                    }
                    _ => {}
                }
            }
            if !out.is_empty() {
                return out;
            }
        }
        _ => {}
    }

    let mut out = String::new();
    if let Some(Value::Array(calls)) = delta.get("tool_calls") {
        for call in calls {
            if let Some(Value::String(args)) = call.pointer("/function/arguments") {
                out.push_str(args);
            }
            if let Some(Value::String(text)) = call.get("text") {
                out.push_str(text);
            }
        }
    }
    out
}

/// Reads usage counters from wherever the provider put them; the provider
/// may refine counts during the stream, so the latest snapshot wins.
fn extract_usage(chunk: &Value, delta: &Value) -> Option<TokenUsage> {
    let usage = chunk
        .get("usage")
        .filter(|u| u.is_object())
        .or_else(|| delta.get("usage").filter(|u| u.is_object()))
        .or_else(|| chunk.pointer("/choices/0/usage").filter(|u| u.is_object()))?;
    let prompt_tokens = usage
        .get("prompt_tokens")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let completion_tokens = usage
        .get("completion_tokens")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let total_tokens = usage
        .get("total_tokens")
        .and_then(Value::as_i64)
        .unwrap_or(prompt_tokens + completion_tokens);
    Some(TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_sentinel_decodes_to_done() {
        assert_eq!(decode_chunk("[DONE]").unwrap(), ChatEvent::Done);
    }

    #[test]
    fn string_content_delta() {
        let event = decode_chunk(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(
            event,
            ChatEvent::Delta {
                content: "Hel".to_string(),
                usage: None
            }
        );
    }

    #[test]
    fn content_part_array_is_joined() {
        let event = decode_chunk(
            r#"{"choices":[{"delta":{"content":[{"type":"text","text":"Hel"},{"text":"lo"}]}}]}"#,
        )
        .unwrap();
        match event {
            ChatEvent::Delta { content, .. } => assert_eq!(content, "Hello"),
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_arguments_count_as_content() {
        let event = decode_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"function":{"arguments":"{\"q\":1}"}}]}}]}"#,
        )
        .unwrap();
        match event {
            ChatEvent::Delta { content, .. } => assert_eq!(content, "{\"q\":1}"),
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn top_level_usage_is_extracted() {
        let event = decode_chunk(
            r#"{"choices":[{"delta":{}}],"usage":{"prompt_tokens":12,"completion_tokens":2}}"#,
        )
        .unwrap();
        match event {
            ChatEvent::Delta { content, usage } => {
                assert!(content.is_empty());
                let usage = usage.unwrap();
                assert_eq!(usage.prompt_tokens, 12);
                assert_eq!(usage.completion_tokens, 2);
                assert_eq!(usage.total_tokens, 14);
            }
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn explicit_total_tokens_wins_over_sum() {
        let event = decode_chunk(
            r#"{"choices":[{"delta":{},"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":5}}]}"#,
        )
        .unwrap();
        match event {
            ChatEvent::Delta { usage, .. } => assert_eq!(usage.unwrap().total_tokens, 5),
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn provider_error_chunk_surfaces_upstream_error() {
        let err = decode_chunk(r#"{"error":{"code":429,"message":"Rate limit exceeded"}}"#)
            .unwrap_err();
        match err {
            RelayError::Upstream { status, message } => {
                assert_eq!(status, Some(429));
                assert!(message.contains("Rate limit exceeded"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_chunk_is_a_decode_error() {
        let err = decode_chunk("not json").unwrap_err();
        assert!(matches!(err, RelayError::Decode(_)));
    }
}
