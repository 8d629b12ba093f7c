use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Payload keys that are lifted into [`Event`] fields when the producer nests
/// them under `payload` instead of the envelope.
const LIFTED_PAYLOAD_KEYS: &[&str] = &["node_id", "call_id", "causation_id", "subtask_index"];

/// Which agent produced an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLevel {
    #[default]
    Core,
    Subagent,
}

impl AgentLevel {
    /// Anything other than `"subagent"` is the top-level agent.
    pub fn from_wire(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("subagent") {
            Self::Subagent
        } else {
            Self::Core
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Subagent => "subagent",
        }
    }
}

impl fmt::Display for AgentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event type - the `workflow.*` vocabulary emitted by the agent runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    InputReceived,
    NodeStarted,
    NodeCompleted,
    NodeFailed,
    NodeOutputDelta,
    NodeOutputSummary,
    ToolStarted,
    ToolProgress,
    ToolCompleted,
    ResultFinal,
    ResultCancelled,
    SubflowProgress,
    SubflowCompleted,
    LifecycleUpdated,
    ArtifactManifest,
    ExecutorUpdate,
    ExecutorUserMessage,
    /// `workflow.diagnostic.*`; holds the full wire tag.
    Diagnostic(String),
    /// Unrecognized tag, kept verbatim.
    Other(String),
}

impl EventType {
    pub const DIAGNOSTIC_PREFIX: &'static str = "workflow.diagnostic.";

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "workflow.input.received" => Self::InputReceived,
            "workflow.node.started" => Self::NodeStarted,
            "workflow.node.completed" => Self::NodeCompleted,
            "workflow.node.failed" => Self::NodeFailed,
            "workflow.node.output.delta" => Self::NodeOutputDelta,
            "workflow.node.output.summary" => Self::NodeOutputSummary,
            "workflow.tool.started" => Self::ToolStarted,
            "workflow.tool.progress" => Self::ToolProgress,
            "workflow.tool.completed" => Self::ToolCompleted,
            "workflow.result.final" => Self::ResultFinal,
            "workflow.result.cancelled" => Self::ResultCancelled,
            "workflow.subflow.progress" => Self::SubflowProgress,
            "workflow.subflow.completed" => Self::SubflowCompleted,
            "workflow.lifecycle.updated" => Self::LifecycleUpdated,
            "workflow.artifact.manifest" => Self::ArtifactManifest,
            "workflow.executor.update" => Self::ExecutorUpdate,
            "workflow.executor.user_message" => Self::ExecutorUserMessage,
            other if other.starts_with(Self::DIAGNOSTIC_PREFIX) => {
                Self::Diagnostic(other.to_string())
            }
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InputReceived => "workflow.input.received",
            Self::NodeStarted => "workflow.node.started",
            Self::NodeCompleted => "workflow.node.completed",
            Self::NodeFailed => "workflow.node.failed",
            Self::NodeOutputDelta => "workflow.node.output.delta",
            Self::NodeOutputSummary => "workflow.node.output.summary",
            Self::ToolStarted => "workflow.tool.started",
            Self::ToolProgress => "workflow.tool.progress",
            Self::ToolCompleted => "workflow.tool.completed",
            Self::ResultFinal => "workflow.result.final",
            Self::ResultCancelled => "workflow.result.cancelled",
            Self::SubflowProgress => "workflow.subflow.progress",
            Self::SubflowCompleted => "workflow.subflow.completed",
            Self::LifecycleUpdated => "workflow.lifecycle.updated",
            Self::ArtifactManifest => "workflow.artifact.manifest",
            Self::ExecutorUpdate => "workflow.executor.update",
            Self::ExecutorUserMessage => "workflow.executor.user_message",
            Self::Diagnostic(raw) | Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event from the agent execution stream.
///
/// Cross-cutting envelope fields are lifted into typed fields so every access
/// is total; type-specific data stays in `payload` and is read through the
/// accessor methods, which return `None` for missing or mistyped values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEvent", into = "WireEvent")]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: Option<DateTime<Utc>>,
    pub agent_level: AgentLevel,
    pub session_id: Option<String>,
    pub task_id: Option<String>,
    pub parent_task_id: Option<String>,
    pub node_id: Option<String>,
    pub call_id: Option<String>,
    /// Call id of the delegation tool call that spawned this run.
    pub causation_id: Option<String>,
    pub subtask_index: Option<u64>,
    pub payload: Map<String, Value>,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            timestamp: None,
            agent_level: AgentLevel::Core,
            session_id: None,
            task_id: None,
            parent_task_id: None,
            node_id: None,
            call_id: None,
            causation_id: None,
            subtask_index: None,
            payload: Map::new(),
        }
    }

    pub fn is_subagent(&self) -> bool {
        self.agent_level == AgentLevel::Subagent
    }

    pub fn timestamp_millis(&self) -> Option<i64> {
        self.timestamp.map(|ts| ts.timestamp_millis())
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn payload_u64(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(value_as_u64)
    }

    pub fn payload_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }

    pub fn delta(&self) -> Option<&str> {
        self.payload_str("delta")
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.payload_str("final_answer")
    }

    /// Text of a `workflow.node.output.summary` event.
    pub fn summary_content(&self) -> Option<&str> {
        self.payload_str("content")
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.payload_str("tool_name")
    }

    pub fn result_text(&self) -> Option<&str> {
        self.payload_str("result")
    }

    pub fn error_text(&self) -> Option<&str> {
        self.payload_str("error").filter(|s| !s.is_empty())
    }

    pub fn is_streaming(&self) -> bool {
        self.payload_bool("is_streaming").unwrap_or(false)
    }

    pub fn stream_finished(&self) -> bool {
        self.payload_bool("stream_finished").unwrap_or(false)
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.payload.get("metadata").and_then(Value::as_object)
    }

    /// Shallow merge: fields present on `newer` win, absent ones keep `self`'s.
    pub fn overlaid_with(&self, newer: &Event) -> Event {
        let mut payload = self.payload.clone();
        for (key, value) in &newer.payload {
            payload.insert(key.clone(), value.clone());
        }
        Event {
            event_type: newer.event_type.clone(),
            timestamp: newer.timestamp.or(self.timestamp),
            agent_level: newer.agent_level,
            session_id: newer.session_id.clone().or_else(|| self.session_id.clone()),
            task_id: newer.task_id.clone().or_else(|| self.task_id.clone()),
            parent_task_id: newer
                .parent_task_id
                .clone()
                .or_else(|| self.parent_task_id.clone()),
            node_id: newer.node_id.clone().or_else(|| self.node_id.clone()),
            call_id: newer.call_id.clone().or_else(|| self.call_id.clone()),
            causation_id: newer
                .causation_id
                .clone()
                .or_else(|| self.causation_id.clone()),
            subtask_index: newer.subtask_index.or(self.subtask_index),
            payload,
        }
    }

    /// Copy of this event with one payload field replaced.
    pub fn with_payload_field(&self, key: &str, value: impl Into<Value>) -> Event {
        let mut copy = self.clone();
        copy.payload.insert(key.to_string(), value.into());
        copy
    }
}

/// Parse an RFC 3339 timestamp, or epoch milliseconds given as a number.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(value: Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.trim().is_empty() { None } else { Some(s) }
}

// ── Wire envelope ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireEvent {
    #[serde(default)]
    event_type: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    timestamp: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    agent_level: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    session_id: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    task_id: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    parent_task_id: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    node_id: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    call_id: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    causation_id: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    subtask_index: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireEvent> for Event {
    fn from(wire: WireEvent) -> Self {
        // Flattened producers put payload fields on the envelope; nested
        // payload values win on conflict.
        let mut payload = wire.extra;
        if let Value::Object(nested) = wire.payload {
            for (key, value) in nested {
                payload.insert(key, value);
            }
        }

        let mut lift = |top: Value, key: &str| -> Value {
            let from_payload = payload.remove(key).unwrap_or(Value::Null);
            match top {
                Value::Null => from_payload,
                Value::String(ref s) if s.trim().is_empty() => from_payload,
                other => other,
            }
        };
        let node_id = lift(wire.node_id, LIFTED_PAYLOAD_KEYS[0]);
        let call_id = lift(wire.call_id, LIFTED_PAYLOAD_KEYS[1]);
        let causation_id = lift(wire.causation_id, LIFTED_PAYLOAD_KEYS[2]);
        let subtask_index = lift(wire.subtask_index, LIFTED_PAYLOAD_KEYS[3]);

        Event {
            event_type: EventType::parse(wire.event_type.as_str().unwrap_or_default()),
            timestamp: parse_timestamp(&wire.timestamp),
            agent_level: wire
                .agent_level
                .as_str()
                .map(AgentLevel::from_wire)
                .unwrap_or_default(),
            session_id: value_as_string(wire.session_id),
            task_id: value_as_string(wire.task_id),
            parent_task_id: value_as_string(wire.parent_task_id),
            node_id: value_as_string(node_id),
            call_id: value_as_string(call_id),
            causation_id: value_as_string(causation_id),
            subtask_index: value_as_u64(&subtask_index),
            payload,
        }
    }
}

impl From<Event> for WireEvent {
    fn from(event: Event) -> Self {
        let opt = |v: Option<String>| v.map(Value::String).unwrap_or(Value::Null);
        WireEvent {
            event_type: Value::String(event.event_type.as_str().to_string()),
            timestamp: event
                .timestamp
                .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
                .unwrap_or(Value::Null),
            agent_level: Value::String(event.agent_level.as_str().to_string()),
            session_id: opt(event.session_id),
            task_id: opt(event.task_id),
            parent_task_id: opt(event.parent_task_id),
            node_id: opt(event.node_id),
            call_id: opt(event.call_id),
            causation_id: opt(event.causation_id),
            subtask_index: event.subtask_index.map(Value::from).unwrap_or(Value::Null),
            payload: if event.payload.is_empty() {
                Value::Null
            } else {
                Value::Object(event.payload)
            },
            extra: Map::new(),
        }
    }
}
