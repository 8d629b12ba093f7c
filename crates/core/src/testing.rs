use crate::{AgentLevel, Event, EventType};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

/// Event at `second` seconds past a fixed base instant, in session `s1`.
pub fn event(event_type: EventType, second: i64) -> Event {
    let mut event = Event::new(event_type);
    event.timestamp = Utc.timestamp_opt(1_771_027_200 + second, 0).single();
    event.session_id = Some("s1".to_string());
    event
}

/// Core-level event with a top-level `task_id`.
pub fn core(event_type: EventType, second: i64, task_id: &str) -> Event {
    let mut event = event(event_type, second);
    event.task_id = Some(task_id.to_string());
    event
}

/// Sub-agent event belonging to `parent/task`.
pub fn subagent(event_type: EventType, second: i64, parent: &str, task: &str) -> Event {
    let mut event = event(event_type, second);
    event.agent_level = AgentLevel::Subagent;
    event.parent_task_id = Some(parent.to_string());
    event.task_id = Some(task.to_string());
    event
}

pub fn with(mut event: Event, key: &str, value: impl Into<Value>) -> Event {
    event.payload.insert(key.to_string(), value.into());
    event
}

pub fn delta(second: i64, task_id: &str, text: &str) -> Event {
    with(core(EventType::NodeOutputDelta, second, task_id), "delta", text)
}

pub fn tool_started(second: i64, task_id: &str, call_id: &str, tool: &str) -> Event {
    let mut event = with(core(EventType::ToolStarted, second, task_id), "tool_name", tool);
    event.call_id = Some(call_id.to_string());
    event
}

pub fn tool_completed(
    second: i64,
    task_id: &str,
    call_id: &str,
    tool: &str,
    result: &str,
) -> Event {
    let mut event = core(EventType::ToolCompleted, second, task_id);
    event.call_id = Some(call_id.to_string());
    event.payload.insert("tool_name".to_string(), json!(tool));
    event.payload.insert("result".to_string(), json!(result));
    event
}

pub fn final_answer(second: i64, task_id: &str, answer: &str) -> Event {
    with(core(EventType::ResultFinal, second, task_id), "final_answer", answer)
}
