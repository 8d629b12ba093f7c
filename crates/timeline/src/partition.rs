use agentline_core::classify::{is_delegation_call, is_delta, is_subagent_like};
use agentline_core::{AgentLevel, Event, EventType};
use serde::Serialize;
use std::collections::HashMap;

use crate::anchor::{AnchorMap, build_anchor_map};
use crate::delta::maybe_merge_delta;
use crate::entry::StreamEvent;
use crate::final_stream::{FinalAnswers, FinalDisposition, collapse_final};
use crate::keys::{subagent_anchor_candidates, subagent_group_key, subagent_key};
use crate::options::TimelineOptions;
use crate::pairing::ToolCallIndex;
use crate::thread::{SubagentThread, shows_in_subagent_card};

/// Why an event produced no row of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Delegation tool call; only anchors sub-agent groups.
    Delegation,
    /// Sub-agent event that only updates its thread's context.
    ContextOnly,
    /// Summary echoing its thread's final answer.
    DuplicateSummary,
    /// Final answer already shown for its thread.
    DuplicateFinal,
    /// Delta hidden by `include_deltas` / `active_task_id`.
    DeltaFiltered,
    /// Internal lifecycle noise.
    Noise,
}

/// Where one raw event ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Disposition {
    /// Main stream, as its own entry or folded into the previous one.
    Main,
    /// Displayed inside the sub-agent thread with this key.
    Thread(String),
    Dropped(DropReason),
}

#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Main stream, delta-merged and filtered.
    pub main: Vec<StreamEvent>,
    /// Sorted sub-agent threads.
    pub threads: Vec<SubagentThread>,
    pub anchors: AnchorMap,
    /// One disposition per input event, by index.
    pub dispositions: Vec<Disposition>,
}

/// Single forward pass splitting the raw list into the main stream and
/// sub-agent threads.
pub fn partition_events(
    events: &[Event],
    tools: &ToolCallIndex,
    options: &TimelineOptions,
) -> Partition {
    let finals = FinalAnswers::collect(events);
    let anchors = build_anchor_map(events, &options.delegation_tool);

    let mut main: Vec<StreamEvent> = Vec::new();
    let mut threads: Vec<SubagentThread> = Vec::new();
    let mut thread_slots: HashMap<String, usize> = HashMap::new();
    let mut emitted_finals: HashMap<String, String> = HashMap::new();
    let mut dispositions = Vec::with_capacity(events.len());

    for (index, event) in events.iter().enumerate() {
        if is_delegation_call(event, &options.delegation_tool) {
            dispositions.push(Disposition::Dropped(DropReason::Delegation));
            continue;
        }

        if is_subagent_like(event) {
            let key = subagent_key(event);
            let slot = *thread_slots.entry(key.clone()).or_insert_with(|| {
                threads.push(SubagentThread::new(
                    key.clone(),
                    subagent_group_key(event),
                    index,
                ));
                threads.len() - 1
            });
            let thread = &mut threads[slot];
            thread.observe(event);

            if thread.anchor_event_id.is_none() {
                let resolved = subagent_anchor_candidates(event)
                    .into_iter()
                    .find_map(|id| anchors.get(&id).map(|anchor| (id, anchor.timestamp)));
                if let Some((anchor_id, timestamp)) = resolved {
                    thread.anchor_timestamp = timestamp;
                    thread.anchor_event_id = Some(anchor_id);
                }
            }

            if !shows_in_subagent_card(event) {
                dispositions.push(Disposition::Dropped(DropReason::ContextOnly));
            } else if finals.is_duplicate_summary(event) {
                dispositions.push(Disposition::Dropped(DropReason::DuplicateSummary));
            } else {
                thread.events.push(StreamEvent::new(index, event.clone()));
                dispositions.push(Disposition::Thread(key));
            }
            continue;
        }

        if finals.is_duplicate_summary(event) {
            dispositions.push(Disposition::Dropped(DropReason::DuplicateSummary));
            continue;
        }

        if is_delta(event) {
            if !delta_visible(event, options) {
                dispositions.push(Disposition::Dropped(DropReason::DeltaFiltered));
                continue;
            }
            if !maybe_merge_delta(&mut main, event, options.max_delta_chars) {
                main.push(StreamEvent::new(index, event.clone()));
            }
            dispositions.push(Disposition::Main);
            continue;
        }

        if event.event_type == EventType::ResultFinal {
            match collapse_final(&mut main, event, &mut emitted_finals) {
                FinalDisposition::Merged => dispositions.push(Disposition::Main),
                FinalDisposition::Duplicate => {
                    dispositions.push(Disposition::Dropped(DropReason::DuplicateFinal));
                }
                FinalDisposition::Push => {
                    main.push(StreamEvent::new(index, event.clone()));
                    dispositions.push(Disposition::Main);
                }
            }
            continue;
        }

        if should_skip(event, tools) {
            dispositions.push(Disposition::Dropped(DropReason::Noise));
            continue;
        }

        main.push(StreamEvent::new(index, event.clone()));
        dispositions.push(Disposition::Main);
    }

    for thread in &mut threads {
        thread.sort_events();
    }
    threads.sort_by_key(|thread| {
        (
            thread
                .anchor_event_id
                .as_deref()
                .and_then(|id| anchors.get(id))
                .map_or(usize::MAX, |anchor| anchor.event_index),
            thread.subtask_index.unwrap_or(u64::MAX),
        )
    });

    Partition {
        main,
        threads,
        anchors,
        dispositions,
    }
}

fn delta_visible(event: &Event, options: &TimelineOptions) -> bool {
    if !options.include_deltas || is_subagent_like(event) {
        return false;
    }
    match &options.active_task_id {
        Some(active) => event.task_id.as_deref() == Some(active.as_str()),
        None => true,
    }
}

/// Internal lifecycle noise that never renders in the main stream.
fn should_skip(event: &Event, tools: &ToolCallIndex) -> bool {
    match &event.event_type {
        EventType::InputReceived => event.agent_level != AgentLevel::Core,
        EventType::ResultFinal
        | EventType::ResultCancelled
        | EventType::NodeFailed
        | EventType::NodeOutputSummary
        | EventType::ToolCompleted => false,
        EventType::NodeStarted | EventType::NodeCompleted | EventType::LifecycleUpdated => true,
        EventType::ToolStarted => tools.has_completion(event),
        EventType::Diagnostic(_) => true,
        _ => false,
    }
}
