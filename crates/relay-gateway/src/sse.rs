// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE framing for the downstream client.
//!
//! The wire grammar is bit-exact: `event: <name>\ndata: <one-line
//! json>\n\n`. Frames are encoded here rather than with axum's `Sse`
//! helper so the byte layout never drifts. The decoder exists for tests
//! that replay captured streams.

use bytes::Bytes;
use serde_json::Value;

pub const EVENT_START: &str = "start";
pub const EVENT_TOKEN: &str = "token";
pub const EVENT_DONE: &str = "done";
pub const EVENT_ERROR: &str = "error";

/// Encodes one frame. `serde_json`'s display form is already compact
/// one-line JSON.
pub fn encode_frame(event: &str, data: &Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

/// Encodes one frame as bytes ready for the response body.
pub fn frame_bytes(event: &str, data: &Value) -> Bytes {
    Bytes::from(encode_frame(event, data))
}

/// Decodes a captured SSE stream into `(event, payload)` pairs.
///
/// Recognizes `event:` and `data:` lines, joins multi-line `data:` into a
/// single payload, and emits one pair per blank-line-separated block. A
/// block without an `event:` line reports the protocol default `message`.
pub fn decode_frames(input: &str) -> Vec<(String, String)> {
    let mut frames = Vec::new();
    for block in input.split("\n\n") {
        let mut event: Option<String> = None;
        let mut data_lines: Vec<&str> = Vec::new();
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event = Some(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
            }
        }
        if event.is_none() && data_lines.is_empty() {
            continue;
        }
        frames.push((
            event.unwrap_or_else(|| "message".to_string()),
            data_lines.join("\n"),
        ));
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_matches_wire_grammar_exactly() {
        let frame = encode_frame(EVENT_TOKEN, &json!({"token": " hello"}));
        assert_eq!(frame, "event: token\ndata: {\"token\":\" hello\"}\n\n");
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let payload = json!({"assistant": "Hi hello", "usage": null});
        let encoded = encode_frame(EVENT_DONE, &payload);
        let decoded = decode_frames(&encoded);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, EVENT_DONE);
        assert_eq!(
            serde_json::from_str::<Value>(&decoded[0].1).unwrap(),
            payload
        );
    }

    #[test]
    fn decode_joins_multi_line_data() {
        let input = "event: token\ndata: line one\ndata: line two\n\n";
        let decoded = decode_frames(input);
        assert_eq!(decoded, vec![("token".to_string(), "line one\nline two".to_string())]);
    }

    #[test]
    fn decode_defaults_missing_event_name() {
        let decoded = decode_frames("data: {\"x\":1}\n\n");
        assert_eq!(decoded[0].0, "message");
    }

    #[test]
    fn decode_splits_consecutive_frames() {
        let input = "event: start\ndata: {}\n\nevent: token\ndata: {\"token\":\"a\"}\n\nevent: done\ndata: {}\n\n";
        let decoded = decode_frames(input);
        let names: Vec<&str> = decoded.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(names, vec!["start", "token", "done"]);
    }
}
