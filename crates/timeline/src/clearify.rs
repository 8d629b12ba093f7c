use agentline_core::classify::{is_clearify_completion, is_terminal};

use crate::entry::{ClearifyGroup, DisplayEntry, StreamEvent};
use crate::options::TimelineOptions;

/// Collapse clearify round-trips into nested timelines.
///
/// A clearify completion opens a group (and timeline mode if not already
/// open). While open, every non-terminal event lands in the current group. A
/// terminal event closes the whole timeline: one `ClearifyTimeline` entry with
/// every group, then the terminal event as a plain entry. A timeline still
/// open at the end of input is flushed as-is.
pub fn build_display_entries_with_clearify_timeline(
    items: Vec<StreamEvent>,
    options: &TimelineOptions,
) -> Vec<DisplayEntry> {
    let mut out = Vec::with_capacity(items.len());
    let mut groups: Vec<ClearifyGroup> = Vec::new();

    for item in items {
        if is_clearify_completion(&item.event, &options.clearify_tool, &options.retry_markers) {
            groups.push(ClearifyGroup {
                clearify: item,
                events: Vec::new(),
            });
            continue;
        }

        let Some(current) = groups.last_mut() else {
            out.push(DisplayEntry::Event(item));
            continue;
        };

        if is_terminal(&item.event) {
            out.push(close_timeline(std::mem::take(&mut groups)));
            out.push(DisplayEntry::Event(item));
        } else {
            current.events.push(item);
        }
    }

    if !groups.is_empty() {
        out.push(close_timeline(groups));
    }
    out
}

fn close_timeline(groups: Vec<ClearifyGroup>) -> DisplayEntry {
    let ts = groups.first().and_then(|group| group.clearify.event.timestamp);
    DisplayEntry::ClearifyTimeline { groups, ts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentline_core::testing;
    use agentline_core::{Event, EventType};

    fn items(events: Vec<Event>) -> Vec<StreamEvent> {
        events
            .into_iter()
            .enumerate()
            .map(|(i, e)| StreamEvent::new(i, e))
            .collect()
    }

    fn clearify(second: i64, call: &str) -> Event {
        testing::tool_completed(second, "t", call, "clearify", "task declared")
    }

    #[test]
    fn terminal_closes_all_groups() {
        let input = items(vec![
            clearify(0, "a"),
            testing::tool_completed(1, "t", "x1", "shell", "1"),
            testing::tool_completed(2, "t", "x2", "shell", "2"),
            clearify(3, "b"),
            testing::tool_completed(4, "t", "x3", "shell", "3"),
            testing::final_answer(5, "t", "done"),
        ]);
        let entries =
            build_display_entries_with_clearify_timeline(input, &TimelineOptions::default());

        assert_eq!(entries.len(), 2);
        match &entries[0] {
            DisplayEntry::ClearifyTimeline { groups, ts } => {
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[0].clearify.source_index, 0);
                let first: Vec<usize> = groups[0].events.iter().map(|e| e.source_index).collect();
                assert_eq!(first, vec![1, 2]);
                let second: Vec<usize> = groups[1].events.iter().map(|e| e.source_index).collect();
                assert_eq!(second, vec![4]);
                assert_eq!(*ts, groups[0].clearify.event.timestamp);
            }
            other => panic!("expected clearify timeline, got {}", other.kind()),
        }
        assert_eq!(entries[1].source_index(), Some(5));
        assert_eq!(
            entries[1].as_event().map(|e| e.event_type.clone()),
            Some(EventType::ResultFinal)
        );
    }

    #[test]
    fn events_before_first_clearify_stay_top_level() {
        let input = items(vec![
            testing::core(EventType::InputReceived, 0, "t"),
            clearify(1, "a"),
            testing::tool_completed(2, "t", "x1", "shell", "1"),
        ]);
        let entries =
            build_display_entries_with_clearify_timeline(input, &TimelineOptions::default());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind(), "event");
        assert_eq!(entries[1].kind(), "clearify_timeline");
        assert_eq!(entries[1].source_index(), Some(1));
    }

    #[test]
    fn retry_sentinel_does_not_open_a_group() {
        let retry = testing::tool_completed(0, "t", "a", "clearify", "[orchestrator-retry] again");
        let entries = build_display_entries_with_clearify_timeline(
            items(vec![retry, testing::final_answer(1, "t", "x")]),
            &TimelineOptions::default(),
        );
        assert!(entries.iter().all(|entry| entry.kind() == "event"));
    }

    #[test]
    fn timeline_reopens_after_terminal() {
        let input = items(vec![
            clearify(0, "a"),
            testing::final_answer(1, "t", "one"),
            clearify(2, "b"),
            testing::core(EventType::ResultCancelled, 3, "t"),
        ]);
        let kinds: Vec<&str> =
            build_display_entries_with_clearify_timeline(input, &TimelineOptions::default())
                .iter()
                .map(DisplayEntry::kind)
                .collect();
        assert_eq!(
            kinds,
            vec!["clearify_timeline", "event", "clearify_timeline", "event"]
        );
    }
}
