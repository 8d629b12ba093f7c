use agentline_core::Event;
use agentline_core::classify::{is_tool_completion, is_tool_start};
use std::collections::{HashMap, HashSet};

type CallKey = (String, String);

fn call_key(event: &Event) -> Option<CallKey> {
    let call_id = event.call_id.as_ref()?;
    Some((
        event.session_id.clone().unwrap_or_default(),
        call_id.clone(),
    ))
}

/// Pairs tool completions with their start events by `(session_id, call_id)`.
#[derive(Debug, Clone, Default)]
pub struct ToolCallIndex {
    starts: HashMap<CallKey, Event>,
    completed: HashSet<CallKey>,
}

impl ToolCallIndex {
    pub fn build(events: &[Event]) -> Self {
        let mut index = Self::default();
        for event in events {
            let Some(key) = call_key(event) else {
                continue;
            };
            if is_tool_start(event) {
                index.starts.entry(key).or_insert_with(|| event.clone());
            } else if is_tool_completion(event) {
                index.completed.insert(key);
            }
        }
        index
    }

    /// Start event for a completion, if one was seen.
    pub fn resolve_start(&self, completion: &Event) -> Option<&Event> {
        self.starts.get(&call_key(completion)?)
    }

    /// Whether a completion exists for this start event's call.
    pub fn has_completion(&self, start: &Event) -> bool {
        call_key(start).is_some_and(|key| self.completed.contains(&key))
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentline_core::testing;

    #[test]
    fn resolves_by_session_and_call() {
        let start = testing::tool_started(0, "t", "c1", "shell");
        let done = testing::tool_completed(1, "t", "c1", "shell", "ok");
        let mut other_session = testing::tool_completed(2, "t", "c1", "shell", "ok");
        other_session.session_id = Some("s2".into());

        let index = ToolCallIndex::build(&[start.clone(), done.clone()]);
        assert_eq!(index.resolve_start(&done), Some(&start));
        assert_eq!(index.resolve_start(&other_session), None);
        assert!(index.has_completion(&start));
    }

    #[test]
    fn first_start_wins_and_missing_call_id_is_ignored() {
        let first = testing::tool_started(0, "t", "c1", "shell");
        let second = testing::tool_started(1, "t", "c1", "web");
        let mut anonymous = testing::tool_started(2, "t", "c1", "shell");
        anonymous.call_id = None;

        let index = ToolCallIndex::build(&[first.clone(), second, anonymous.clone()]);
        assert_eq!(index.len(), 1);
        let done = testing::tool_completed(3, "t", "c1", "shell", "");
        assert_eq!(index.resolve_start(&done).and_then(Event::tool_name), Some("shell"));
        assert!(!index.has_completion(&first));
        assert!(!index.has_completion(&anonymous));
    }
}
