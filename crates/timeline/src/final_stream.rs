//! Streaming `workflow.result.final` handling.
//!
//! While an answer streams, each envelope carries only the new suffix in
//! `final_answer` with `is_streaming` set; the last one sets
//! `stream_finished`. A non-streaming final carries the whole answer.

use agentline_core::classify::normalize_text;
use agentline_core::{Event, EventType};
use std::collections::{HashMap, HashSet};

use crate::entry::StreamEvent;
use crate::keys::thread_key;

/// Assembled final answers per thread key, normalized for comparison.
///
/// A thread can answer more than once; summaries are checked against every
/// answer it gave, not only the last.
#[derive(Debug, Clone, Default)]
pub struct FinalAnswers {
    raw: HashMap<String, (String, bool)>,
    replaced: HashMap<String, HashSet<String>>,
}

impl FinalAnswers {
    /// Pre-pass over every final answer in the stream.
    pub fn collect(events: &[Event]) -> Self {
        let mut answers = Self::default();
        for event in events {
            if event.event_type != EventType::ResultFinal {
                continue;
            }
            let key = thread_key(event);
            let chunk = event.final_answer().unwrap_or_default();
            let open = event.is_streaming() && !event.stream_finished();
            let slot = answers
                .raw
                .entry(key.clone())
                .or_insert_with(|| (String::new(), false));
            // Continue an open stream; anything else starts a fresh answer.
            if slot.1 {
                slot.0.push_str(chunk);
            } else {
                let previous = normalize_text(&std::mem::replace(&mut slot.0, chunk.to_string()));
                if !previous.is_empty() {
                    answers.replaced.entry(key).or_default().insert(previous);
                }
            }
            slot.1 = open;
        }
        answers
    }

    /// Latest answer of the thread.
    pub fn normalized(&self, key: &str) -> Option<String> {
        self.raw
            .get(key)
            .map(|(text, _)| normalize_text(text))
            .filter(|text| !text.is_empty())
    }

    /// True when `summary` is a `node.output.summary` whose content echoes a
    /// final answer of its own thread.
    pub fn is_duplicate_summary(&self, summary: &Event) -> bool {
        if summary.event_type != EventType::NodeOutputSummary {
            return false;
        }
        let content = normalize_text(summary.summary_content().unwrap_or_default());
        if content.is_empty() {
            return false;
        }
        let key = thread_key(summary);
        self.normalized(&key).is_some_and(|answer| answer == content)
            || self
                .replaced
                .get(&key)
                .is_some_and(|earlier| earlier.contains(&content))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalDisposition {
    /// Folded into the still-streaming final before it.
    Merged,
    /// Same answer as a final already emitted for this thread.
    Duplicate,
    Push,
}

/// Main-stream handling of one `workflow.result.final`.
///
/// `emitted` tracks the normalized answer last shown per thread key and is
/// updated for `Merged` and `Push`.
pub fn collapse_final(
    buffer: &mut [StreamEvent],
    incoming: &Event,
    emitted: &mut HashMap<String, String>,
) -> FinalDisposition {
    let key = thread_key(incoming);

    if let Some(last) = buffer.last_mut() {
        let open_stream = last.event.event_type == EventType::ResultFinal
            && last.event.is_streaming()
            && !last.event.stream_finished()
            && thread_key(&last.event) == key;
        if open_stream {
            let mut answer = last.event.final_answer().unwrap_or_default().to_string();
            answer.push_str(incoming.final_answer().unwrap_or_default());
            emitted.insert(key, normalize_text(&answer));
            last.event = last
                .event
                .overlaid_with(incoming)
                .with_payload_field("final_answer", answer);
            return FinalDisposition::Merged;
        }
    }

    let answer = normalize_text(incoming.final_answer().unwrap_or_default());
    if !incoming.is_streaming()
        && !answer.is_empty()
        && emitted.get(&key).is_some_and(|shown| *shown == answer)
    {
        return FinalDisposition::Duplicate;
    }
    emitted.insert(key, answer);
    FinalDisposition::Push
}
