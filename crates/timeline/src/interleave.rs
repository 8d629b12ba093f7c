use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::anchor::AnchorMap;
use crate::entry::{DisplayEntry, SubagentGroup};
use crate::thread::SubagentThread;

/// Sibling threads plus the placement data of the group as a whole.
struct PendingGroup {
    group_key: String,
    threads: Vec<SubagentThread>,
    anchor_index: Option<usize>,
    anchor_event_id: Option<String>,
    first_seen_at: Option<DateTime<Utc>>,
    inserted: bool,
}

impl PendingGroup {
    fn new(group_key: String) -> Self {
        Self {
            group_key,
            threads: Vec::new(),
            anchor_index: None,
            anchor_event_id: None,
            first_seen_at: None,
            inserted: false,
        }
    }

    fn add(&mut self, thread: &SubagentThread, anchors: &AnchorMap) {
        if let Some(anchor_id) = &thread.anchor_event_id {
            if let Some(anchor) = anchors.get(anchor_id) {
                if self.anchor_index.is_none_or(|current| anchor.event_index < current) {
                    self.anchor_index = Some(anchor.event_index);
                    self.anchor_event_id = Some(anchor_id.clone());
                }
            }
        }
        if let Some(seen) = thread.first_seen_at {
            self.first_seen_at = Some(self.first_seen_at.map_or(seen, |cur| cur.min(seen)));
        }
        self.threads.push(thread.clone());
    }

    fn order_key(&self) -> (usize, u64) {
        (
            self.anchor_index.unwrap_or(usize::MAX),
            self.threads
                .first()
                .and_then(|thread| thread.subtask_index)
                .unwrap_or(u64::MAX),
        )
    }

    /// Whether the group belongs before `entry`.
    fn precedes(&self, entry: &DisplayEntry) -> bool {
        match self.anchor_index {
            Some(anchor) => entry.source_index().is_some_and(|index| anchor < index),
            None => match (self.first_seen_at, entry.timestamp()) {
                (Some(seen), Some(ts)) => seen.timestamp_millis() < ts.timestamp_millis(),
                _ => false,
            },
        }
    }

    fn take_entry(&mut self) -> DisplayEntry {
        self.inserted = true;
        DisplayEntry::SubagentGroup(SubagentGroup {
            group_key: self.group_key.clone(),
            threads: std::mem::take(&mut self.threads),
            ts: self.first_seen_at,
            anchor_event_id: self.anchor_event_id.clone(),
        })
    }
}

fn group_threads(threads: &[SubagentThread], anchors: &AnchorMap) -> Vec<PendingGroup> {
    let mut groups: Vec<PendingGroup> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for thread in threads {
        let key = if thread.group_key.is_empty() {
            thread.key.as_str()
        } else {
            thread.group_key.as_str()
        };
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(PendingGroup::new(key.to_string()));
            groups.len() - 1
        });
        groups[slot].add(thread, anchors);
    }
    groups
}

/// Insert each sub-agent group into the base entries exactly once.
///
/// Anchored groups go right before the first entry that originated after
/// their anchor. Unanchored groups go before the first entry strictly newer
/// than their earliest event. Groups eligible at the same spot are ordered by
/// anchor index, then by the subtask index of their first thread. Anything
/// still pending after the walk is appended in that same order.
pub fn build_interleaved_entries(
    base: Vec<DisplayEntry>,
    threads: &[SubagentThread],
    anchors: &AnchorMap,
) -> Vec<DisplayEntry> {
    let mut groups = group_threads(threads, anchors);
    if groups.is_empty() {
        return base;
    }

    let mut out = Vec::with_capacity(base.len() + groups.len());
    for entry in base {
        flush_groups(&mut groups, &mut out, |group| group.precedes(&entry));
        out.push(entry);
    }
    flush_groups(&mut groups, &mut out, |_| true);
    out
}

fn flush_groups(
    groups: &mut [PendingGroup],
    out: &mut Vec<DisplayEntry>,
    eligible: impl Fn(&PendingGroup) -> bool,
) {
    let mut ready: Vec<usize> = groups
        .iter()
        .enumerate()
        .filter(|(_, group)| !group.inserted && eligible(group))
        .map(|(slot, _)| slot)
        .collect();
    ready.sort_by_key(|&slot| groups[slot].order_key());
    for slot in ready {
        out.push(groups[slot].take_entry());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::build_anchor_map;
    use crate::entry::StreamEvent;
    use agentline_core::testing;
    use agentline_core::{Event, EventType};

    fn base(indices: &[(usize, i64)]) -> Vec<DisplayEntry> {
        indices
            .iter()
            .map(|&(index, second)| {
                DisplayEntry::Event(StreamEvent::new(
                    index,
                    testing::core(EventType::ToolCompleted, second, "root"),
                ))
            })
            .collect()
    }

    fn thread(key: &str, group: &str, anchor: Option<&str>, seen: Option<i64>) -> SubagentThread {
        let mut thread = SubagentThread::new(key.into(), group.into(), 0);
        thread.anchor_event_id = anchor.map(String::from);
        thread.first_seen_at =
            seen.and_then(|second| testing::event(EventType::ToolStarted, second).timestamp);
        thread
    }

    fn layout(entries: &[DisplayEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match entry {
                DisplayEntry::SubagentGroup(group) => format!("g:{}", group.group_key),
                other => format!("e:{}", other.source_index().unwrap_or(usize::MAX)),
            })
            .collect()
    }

    fn anchors_at(calls: &[(usize, &str)]) -> AnchorMap {
        let len = calls.iter().map(|(index, _)| index + 1).max().unwrap_or(0);
        let mut events: Vec<Event> = (0..len)
            .map(|i| testing::core(EventType::InputReceived, i as i64, "root"))
            .collect();
        for &(index, call) in calls {
            events[index] = testing::tool_started(index as i64, "root", call, "subagent");
        }
        build_anchor_map(&events, "subagent")
    }

    #[test]
    fn anchored_group_follows_its_anchor_entry() {
        let anchors = anchors_at(&[(1, "c1")]);
        let entries = build_interleaved_entries(
            base(&[(0, 0), (2, 2), (4, 4)]),
            &[thread("task:root:a", "parent:root", Some("call:c1"), Some(3))],
            &anchors,
        );
        assert_eq!(layout(&entries), vec!["e:0", "g:parent:root", "e:2", "e:4"]);
    }

    #[test]
    fn group_is_never_placed_before_the_entry_at_its_anchor() {
        let anchors = anchors_at(&[(2, "c1")]);
        let entries = build_interleaved_entries(
            base(&[(0, 0), (2, 2), (3, 3)]),
            &[thread("task:root:a", "parent:root", Some("call:c1"), None)],
            &anchors,
        );
        assert_eq!(layout(&entries), vec!["e:0", "e:2", "g:parent:root", "e:3"]);
    }

    #[test]
    fn siblings_share_one_group_at_earliest_anchor() {
        let anchors = anchors_at(&[(1, "c1"), (3, "c2")]);
        let entries = build_interleaved_entries(
            base(&[(0, 0), (2, 2), (4, 4)]),
            &[
                thread("task:root:a", "parent:root", Some("call:c1"), None),
                thread("task:root:b", "parent:root", Some("call:c2"), None),
            ],
            &anchors,
        );
        assert_eq!(layout(&entries), vec!["e:0", "g:parent:root", "e:2", "e:4"]);
        match &entries[1] {
            DisplayEntry::SubagentGroup(group) => {
                assert_eq!(group.threads.len(), 2);
                assert_eq!(group.anchor_event_id.as_deref(), Some("call:c1"));
            }
            other => panic!("expected group, got {}", other.kind()),
        }
    }

    #[test]
    fn unanchored_group_falls_back_to_timestamps() {
        let entries = build_interleaved_entries(
            base(&[(0, 0), (1, 10), (2, 20)]),
            &[thread("subtask:0", "subtask:0", None, Some(5))],
            &AnchorMap::default(),
        );
        assert_eq!(layout(&entries), vec!["e:0", "g:subtask:0", "e:1", "e:2"]);
    }

    #[test]
    fn unresolvable_groups_are_appended_in_order() {
        let mut first = thread("subtask:0", "subtask:0", None, None);
        first.subtask_index = Some(0);
        let mut second = thread("subtask:1", "subtask:1", None, None);
        second.subtask_index = Some(1);
        let late_anchor = thread("task:root:z", "parent:root", Some("call:c9"), None);
        let anchors = anchors_at(&[(9, "c9")]);

        let entries = build_interleaved_entries(
            base(&[(0, 0), (1, 1)]),
            &[second, late_anchor, first],
            &anchors,
        );
        assert_eq!(
            layout(&entries),
            vec!["e:0", "e:1", "g:parent:root", "g:subtask:0", "g:subtask:1"]
        );
    }

    #[test]
    fn no_threads_returns_base_unchanged() {
        let input = base(&[(0, 0), (1, 1)]);
        let entries = build_interleaved_entries(input.clone(), &[], &AnchorMap::default());
        assert_eq!(entries, input);
    }
}
