use agentline_core::Event;
use agentline_core::classify::{is_delegation_call, is_subagent_like};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::keys::{call_anchor_id, task_anchor_id};

/// Position of an anchor in the raw event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorEntry {
    pub timestamp: Option<i64>,
    pub event_index: usize,
}

/// Anchor id to its first occurrence. Entries are never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnchorMap {
    entries: BTreeMap<String, AnchorEntry>,
}

impl AnchorMap {
    pub fn get(&self, anchor_id: &str) -> Option<&AnchorEntry> {
        self.entries.get(anchor_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register(&mut self, anchor_id: String, event: &Event, event_index: usize) {
        self.entries.entry(anchor_id).or_insert(AnchorEntry {
            timestamp: event.timestamp_millis(),
            event_index,
        });
    }
}

/// Single scan registering `call:<call_id>` for each delegation tool call and
/// `task:<parent>:<task>` for the first sub-agent event of each task.
pub fn build_anchor_map(events: &[Event], delegation_tool: &str) -> AnchorMap {
    let mut anchors = AnchorMap::default();
    for (index, event) in events.iter().enumerate() {
        if is_delegation_call(event, delegation_tool) {
            if let Some(call_id) = &event.call_id {
                anchors.register(call_anchor_id(call_id), event, index);
            }
            continue;
        }
        if is_subagent_like(event) {
            if let (Some(parent), Some(task)) = (&event.parent_task_id, &event.task_id) {
                anchors.register(task_anchor_id(parent, task), event, index);
            }
        }
    }
    anchors
}
