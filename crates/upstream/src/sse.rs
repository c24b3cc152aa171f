//! Line-level SSE plumbing for the upstream contract.
//!
//! The upstream emits newline-delimited event lines. Only `data:` lines
//! carry payloads; anything malformed is skipped without aborting the
//! stream. The split between "drain complete lines" and "interpret one
//! payload" keeps both halves independently testable.

/// The literal payload that terminates an upstream stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Pull complete lines out of the receive buffer, leaving any trailing
/// partial line in place for the next network chunk.
pub(crate) fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines
}

/// Extract the payload of a `data:` line, or `None` for any other line
/// (comments, `event:`/`id:` fields, noise).
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    let payload = line.trim().strip_prefix("data:")?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}

/// Pull the incremental text fragment out of one event payload:
/// `choices[0].delta.content`. Non-JSON payloads and chunks without a
/// content delta (role announcements, finish chunks) yield `None`.
pub(crate) fn delta_content(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let content = value
        .get("choices")?
        .as_array()?
        .first()?
        .get("delta")?
        .get("content")?
        .as_str()?;
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
