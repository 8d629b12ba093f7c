//! Identity and grouping keys derived from event fields.
//!
//! Keys are opaque strings; only equality matters.

use agentline_core::Event;
use agentline_core::classify::is_subagent_like;

/// Identity of the sub-agent thread an event belongs to:
/// `parent_task_id`+`task_id`, else `call_id`, else `subtask_index`.
pub fn subagent_key(event: &Event) -> String {
    if let (Some(parent), Some(task)) = (&event.parent_task_id, &event.task_id) {
        return format!("task:{parent}:{task}");
    }
    if let Some(call_id) = &event.call_id {
        return format!("call:{call_id}");
    }
    if let Some(index) = event.subtask_index {
        return format!("subtask:{index}");
    }
    "subagent:unknown".to_string()
}

/// Coarser key so sibling sub-tasks of one parent render together.
pub fn subagent_group_key(event: &Event) -> String {
    match &event.parent_task_id {
        Some(parent) => format!("parent:{parent}"),
        None => subagent_key(event),
    }
}

/// Anchor ids a sub-agent event may point back to, most specific first: the
/// call named by `causation_id`, then its task-creation anchor. Callers take
/// the first one registered in the anchor map.
pub fn subagent_anchor_candidates(event: &Event) -> Vec<String> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(call_id) = &event.causation_id {
        candidates.push(call_anchor_id(call_id));
    }
    if let (Some(parent), Some(task)) = (&event.parent_task_id, &event.task_id) {
        candidates.push(task_anchor_id(parent, task));
    }
    candidates
}

pub fn call_anchor_id(call_id: &str) -> String {
    format!("call:{call_id}")
}

pub fn task_anchor_id(parent_task_id: &str, task_id: &str) -> String {
    format!("task:{parent_task_id}:{task_id}")
}

/// Thread identity for any event: the sub-agent key for sub-agent events,
/// otherwise the session/task pair of the core agent.
pub fn thread_key(event: &Event) -> String {
    if is_subagent_like(event) {
        return subagent_key(event);
    }
    format!(
        "core:{}:{}",
        event.session_id.as_deref().unwrap_or_default(),
        event.task_id.as_deref().unwrap_or_default()
    )
}
