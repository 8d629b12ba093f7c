//! Coalescing of streaming `workflow.node.output.delta` events.

use agentline_core::Event;
use agentline_core::classify::is_delta;

use crate::entry::StreamEvent;

/// Try to fold `incoming` into the last buffered entry.
///
/// Returns `true` when the buffer absorbed the delta; the caller pushes it as
/// a new entry otherwise. An empty delta following any delta only refreshes
/// metadata. A non-empty delta merges when both belong to the same stream, and
/// the merged text keeps at most `max_chars` of the most recent characters.
pub fn maybe_merge_delta(
    buffer: &mut Vec<StreamEvent>,
    incoming: &Event,
    max_chars: usize,
) -> bool {
    let Some(last) = buffer.last_mut() else {
        return false;
    };
    if !is_delta(&last.event) {
        return false;
    }

    let text = incoming.delta().unwrap_or_default();
    if text.is_empty() {
        let prior = last.event.delta().unwrap_or_default().to_string();
        last.event = last.event.overlaid_with(incoming).with_payload_field("delta", prior);
        return true;
    }

    if !same_stream(&last.event, incoming) {
        return false;
    }

    let mut combined = last.event.delta().unwrap_or_default().to_string();
    combined.push_str(text);
    let bounded = keep_tail(combined, max_chars);
    last.event = last.event.overlaid_with(incoming).with_payload_field("delta", bounded);
    true
}

fn same_stream(a: &Event, b: &Event) -> bool {
    a.node_id == b.node_id
        && a.session_id == b.session_id
        && a.task_id == b.task_id
        && a.parent_task_id == b.parent_task_id
        && a.agent_level == b.agent_level
}

/// Keep the last `max_chars` characters of `text`.
pub fn keep_tail(text: String, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((start, _)) if start > 0 => text[start..].to_string(),
        _ => text,
    }
}
