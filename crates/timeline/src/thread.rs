use agentline_core::{Event, EventType};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entry::StreamEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ThreadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::Pending => Tone::Neutral,
            Self::Running => Tone::Info,
            Self::Completed => Tone::Success,
            Self::Cancelled => Tone::Warning,
            Self::Failed => Tone::Danger,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

/// Summary of a sub-agent run, folded from every event of the thread,
/// including ones that are not displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubagentContext {
    pub preview: Option<String>,
    pub total_subtasks: Option<u64>,
    pub max_parallel: Option<u64>,
    pub completed: Option<u64>,
    pub total: Option<u64>,
    pub tokens: Option<u64>,
    pub tool_calls: Option<u64>,
    pub status: ThreadStatus,
    pub last_error: Option<String>,
}

impl SubagentContext {
    pub fn merge(&mut self, event: &Event) {
        if self.preview.is_none() {
            self.preview = event
                .payload_str("subtask_preview")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from);
        }

        let latest = |slot: &mut Option<u64>, key: &str| {
            if let Some(value) = event.payload_u64(key) {
                *slot = Some(value);
            }
        };
        latest(&mut self.total_subtasks, "total_subtasks");
        latest(&mut self.max_parallel, "max_parallel");
        latest(&mut self.completed, "completed");
        latest(&mut self.total, "total");
        latest(&mut self.tokens, "tokens");
        latest(&mut self.tool_calls, "tool_calls");

        if let Some(next) = status_after(event) {
            if !(self.status.is_terminal() && next == ThreadStatus::Running) {
                self.status = next;
            }
        }

        if matches!(
            event.event_type,
            EventType::NodeFailed | EventType::ToolCompleted | EventType::SubflowCompleted
        ) {
            if let Some(error) = event.error_text() {
                self.last_error = Some(error.to_string());
            }
        }
    }

    pub fn tone(&self) -> Tone {
        self.status.tone()
    }
}

fn status_after(event: &Event) -> Option<ThreadStatus> {
    match event.event_type {
        EventType::NodeStarted
        | EventType::NodeCompleted
        | EventType::NodeOutputDelta
        | EventType::NodeOutputSummary
        | EventType::ToolStarted
        | EventType::ToolProgress
        | EventType::ToolCompleted
        | EventType::SubflowProgress => Some(ThreadStatus::Running),
        EventType::ResultFinal => Some(ThreadStatus::Completed),
        EventType::ResultCancelled => Some(ThreadStatus::Cancelled),
        EventType::NodeFailed => Some(ThreadStatus::Failed),
        EventType::SubflowCompleted => Some(if event.payload.contains_key("cancel_reason") {
            ThreadStatus::Cancelled
        } else if event.error_text().is_some() {
            ThreadStatus::Failed
        } else {
            ThreadStatus::Completed
        }),
        _ => None,
    }
}

/// Event types shown inside a sub-agent card.
pub fn shows_in_subagent_card(event: &Event) -> bool {
    matches!(
        event.event_type,
        EventType::ToolStarted
            | EventType::ToolCompleted
            | EventType::ResultFinal
            | EventType::ResultCancelled
            | EventType::NodeOutputSummary
            | EventType::NodeFailed
    )
}

/// Accumulated events and context of one sub-agent execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubagentThread {
    pub key: String,
    pub group_key: String,
    pub context: SubagentContext,
    pub events: Vec<StreamEvent>,
    pub subtask_index: Option<u64>,
    pub anchor_event_id: Option<String>,
    pub anchor_timestamp: Option<i64>,
    pub first_seen_at: Option<DateTime<Utc>>,
    pub first_arrival: usize,
}

impl SubagentThread {
    pub fn new(key: String, group_key: String, first_arrival: usize) -> Self {
        Self {
            key,
            group_key,
            context: SubagentContext::default(),
            events: Vec::new(),
            subtask_index: None,
            anchor_event_id: None,
            anchor_timestamp: None,
            first_seen_at: None,
            first_arrival,
        }
    }

    /// Fold identity fields of a contributing event.
    pub(crate) fn observe(&mut self, event: &Event) {
        self.context.merge(event);
        if self.subtask_index.is_none() {
            self.subtask_index = event.subtask_index;
        }
        if let Some(ts) = event.timestamp {
            self.first_seen_at = Some(self.first_seen_at.map_or(ts, |seen| seen.min(ts)));
        }
    }

    /// Order captured events by timestamp, then arrival.
    pub(crate) fn sort_events(&mut self) {
        self.events.sort_by_key(|item| {
            (
                item.event.timestamp_millis().unwrap_or(i64::MAX),
                item.source_index,
            )
        });
    }

    pub fn first_seen_millis(&self) -> Option<i64> {
        self.first_seen_at.map(|ts| ts.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentline_core::testing;

    #[test]
    fn context_merges_progress_and_keeps_first_preview() {
        let mut ctx = SubagentContext::default();
        let first = testing::with(
            testing::with(
                testing::subagent(EventType::SubflowProgress, 0, "p", "t"),
                "subtask_preview",
                "Audit deps",
            ),
            "completed",
            0,
        );
        let second = testing::with(
            testing::with(
                testing::subagent(EventType::SubflowProgress, 1, "p", "t"),
                "subtask_preview",
                "Other",
            ),
            "completed",
            2,
        );
        ctx.merge(&first);
        ctx.merge(&second);

        assert_eq!(ctx.preview.as_deref(), Some("Audit deps"));
        assert_eq!(ctx.completed, Some(2));
        assert_eq!(ctx.status, ThreadStatus::Running);
        assert_eq!(ctx.tone(), Tone::Info);
    }

    #[test]
    fn terminal_status_is_sticky_against_running() {
        let mut ctx = SubagentContext::default();
        ctx.merge(&testing::subagent(EventType::ResultFinal, 0, "p", "t"));
        ctx.merge(&testing::subagent(EventType::ToolCompleted, 1, "p", "t"));
        assert_eq!(ctx.status, ThreadStatus::Completed);

        ctx.merge(&testing::with(
            testing::subagent(EventType::NodeFailed, 2, "p", "t"),
            "error",
            "boom",
        ));
        assert_eq!(ctx.status, ThreadStatus::Failed);
        assert_eq!(ctx.last_error.as_deref(), Some("boom"));
        assert_eq!(ctx.tone(), Tone::Danger);
    }

    #[test]
    fn subflow_completion_maps_to_status() {
        let mut ctx = SubagentContext::default();
        ctx.merge(&testing::with(
            testing::subagent(EventType::SubflowCompleted, 0, "p", "t"),
            "cancel_reason",
            "user",
        ));
        assert_eq!(ctx.status, ThreadStatus::Cancelled);
    }

    #[test]
    fn card_filter() {
        assert!(shows_in_subagent_card(&Event::new(EventType::ToolStarted)));
        assert!(shows_in_subagent_card(&Event::new(EventType::NodeOutputSummary)));
        assert!(!shows_in_subagent_card(&Event::new(EventType::NodeOutputDelta)));
        assert!(!shows_in_subagent_card(&Event::new(EventType::SubflowProgress)));
    }

    #[test]
    fn events_sort_by_time_then_arrival() {
        let mut thread = SubagentThread::new("k".into(), "g".into(), 0);
        thread.events = vec![
            StreamEvent::new(3, testing::subagent(EventType::ToolCompleted, 5, "p", "t")),
            StreamEvent::new(1, testing::subagent(EventType::ToolStarted, 5, "p", "t")),
            StreamEvent::new(2, testing::subagent(EventType::ToolStarted, 2, "p", "t")),
        ];
        thread.sort_events();
        let order: Vec<usize> = thread.events.iter().map(|e| e.source_index).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }
}
