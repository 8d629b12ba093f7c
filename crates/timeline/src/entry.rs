use agentline_core::Event;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::thread::SubagentThread;

/// An event tagged with the raw index it originated from. Merged runs keep
/// the index of their first member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    pub source_index: usize,
    pub event: Event,
}

impl StreamEvent {
    pub fn new(source_index: usize, event: Event) -> Self {
        Self {
            source_index,
            event,
        }
    }
}

/// One clearify round-trip: the opening completion and everything captured
/// after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearifyGroup {
    pub clearify: StreamEvent,
    pub events: Vec<StreamEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubagentGroup {
    pub group_key: String,
    pub threads: Vec<SubagentThread>,
    pub ts: Option<DateTime<Utc>>,
    pub anchor_event_id: Option<String>,
}

/// Render-ready timeline row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayEntry {
    Event(StreamEvent),
    ClearifyTimeline {
        groups: Vec<ClearifyGroup>,
        ts: Option<DateTime<Utc>>,
    },
    SubagentGroup(SubagentGroup),
}

impl DisplayEntry {
    /// Raw index the entry is positioned by. Sub-agent groups have none.
    pub fn source_index(&self) -> Option<usize> {
        match self {
            Self::Event(item) => Some(item.source_index),
            Self::ClearifyTimeline { groups, .. } => {
                groups.first().map(|group| group.clearify.source_index)
            }
            Self::SubagentGroup(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Event(item) => item.event.timestamp,
            Self::ClearifyTimeline { ts, .. } => *ts,
            Self::SubagentGroup(group) => group.ts,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(item) => Some(&item.event),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::ClearifyTimeline { .. } => "clearify_timeline",
            Self::SubagentGroup(_) => "subagent_group",
        }
    }
}
