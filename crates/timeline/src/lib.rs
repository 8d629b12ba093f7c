pub mod anchor;
pub mod clearify;
pub mod delta;
pub mod entry;
pub mod final_stream;
pub mod interleave;
pub mod keys;
pub mod options;
pub mod pairing;
pub mod partition;
pub mod thread;

pub use anchor::{AnchorEntry, AnchorMap, build_anchor_map};
pub use clearify::build_display_entries_with_clearify_timeline;
pub use delta::maybe_merge_delta;
pub use entry::{ClearifyGroup, DisplayEntry, StreamEvent, SubagentGroup};
pub use interleave::build_interleaved_entries;
pub use options::{DEFAULT_MAX_DELTA_CHARS, TimelineOptions};
pub use pairing::ToolCallIndex;
pub use partition::{Disposition, DropReason, Partition, partition_events};
pub use thread::{SubagentContext, SubagentThread, ThreadStatus, Tone};

use agentline_core::Event;
use tracing::debug;

/// Render-ready result of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub entries: Vec<DisplayEntry>,
    /// Sorted threads, also embedded in the group entries.
    pub threads: Vec<SubagentThread>,
    pub anchors: AnchorMap,
    /// Pairs tool completions in `entries` with their start events.
    pub tools: ToolCallIndex,
    /// Where each input event went, by index.
    pub dispositions: Vec<Disposition>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start event of a tool completion shown in this timeline.
    pub fn resolve_tool_start(&self, completion: &Event) -> Option<&Event> {
        self.tools.resolve_start(completion)
    }
}

/// Partition, segment clearify runs, then interleave sub-agent groups.
///
/// Pure over its inputs: the same events and options always produce the same
/// timeline.
pub fn build_timeline(events: &[Event], options: &TimelineOptions) -> Timeline {
    let tools = ToolCallIndex::build(events);
    let Partition {
        main,
        threads,
        anchors,
        dispositions,
    } = partition_events(events, &tools, options);

    let main_len = main.len();
    let segmented = build_display_entries_with_clearify_timeline(main, options);
    let entries = build_interleaved_entries(segmented, &threads, &anchors);

    debug!(
        "Built timeline: {} events -> {} main, {} threads, {} entries",
        events.len(),
        main_len,
        threads.len(),
        entries.len()
    );

    Timeline {
        entries,
        threads,
        anchors,
        tools,
        dispositions,
    }
}
