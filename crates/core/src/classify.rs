//! Pure predicates over [`Event`]s.
//!
//! None of these panic or fail: a missing or mistyped field simply makes the
//! predicate return `false`.

use crate::trace::{AgentLevel, Event, EventType};

/// Tool name that delegates work to sub-agents.
pub const DEFAULT_DELEGATION_TOOL: &str = "subagent";
/// Tool name of the clarifying-question tool.
pub const DEFAULT_CLEARIFY_TOOL: &str = "clearify";

/// Result prefixes the orchestrator uses when it rejects a tool call and asks
/// the model to retry. A clearify completion carrying one of these did not
/// actually open a task.
pub const DEFAULT_RETRY_MARKERS: &[&str] = &[
    "每轮仅允许 1 次工具调用",
    "你在调用动作工具前必须先调用 plan()",
    "在调用动作工具前必须先调用 clearify()",
    "[orchestrator-retry]",
];

pub fn is_event_type(event: &Event, candidates: &[EventType]) -> bool {
    candidates.contains(&event.event_type)
}

pub fn is_subagent_like(event: &Event) -> bool {
    event.agent_level == AgentLevel::Subagent
}

pub fn is_delta(event: &Event) -> bool {
    event.event_type == EventType::NodeOutputDelta
}

/// `workflow.result.final` or `workflow.result.cancelled`.
pub fn is_terminal(event: &Event) -> bool {
    matches!(
        event.event_type,
        EventType::ResultFinal | EventType::ResultCancelled
    )
}

pub fn is_tool_completion(event: &Event) -> bool {
    event.event_type == EventType::ToolCompleted
}

pub fn is_tool_start(event: &Event) -> bool {
    event.event_type == EventType::ToolStarted
}

pub fn is_diagnostic(event: &Event) -> bool {
    matches!(event.event_type, EventType::Diagnostic(_))
}

/// Core-level start or completion of the delegation tool. These events only
/// anchor sub-agent groups and never render on their own.
pub fn is_delegation_call(event: &Event, delegation_tool: &str) -> bool {
    if event.agent_level != AgentLevel::Core {
        return false;
    }
    if !matches!(
        event.event_type,
        EventType::ToolStarted | EventType::ToolCompleted
    ) {
        return false;
    }
    event
        .tool_name()
        .map(|name| name.trim().eq_ignore_ascii_case(delegation_tool))
        .unwrap_or(false)
}

/// Core-level clearify completion that is not an orchestrator retry.
pub fn is_clearify_completion<S: AsRef<str>>(
    event: &Event,
    clearify_tool: &str,
    retry_markers: &[S],
) -> bool {
    if event.agent_level != AgentLevel::Core || !is_tool_completion(event) {
        return false;
    }
    if event.tool_name() != Some(clearify_tool) {
        return false;
    }
    !is_retry_sentinel(event.result_text().unwrap_or_default(), retry_markers)
}

pub fn is_retry_sentinel<S: AsRef<str>>(result: &str, retry_markers: &[S]) -> bool {
    let trimmed = result.trim_start();
    retry_markers.iter().any(|marker| {
        let marker: &str = marker.as_ref();
        !marker.is_empty() && trimmed.starts_with(marker)
    })
}

/// Collapse runs of whitespace and trim, for comparing rendered text.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
