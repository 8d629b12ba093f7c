use agentline_core::classify::{
    DEFAULT_CLEARIFY_TOOL, DEFAULT_DELEGATION_TOOL, DEFAULT_RETRY_MARKERS,
};
use agentline_runtime_config::TimelineSettings;

pub const DEFAULT_MAX_DELTA_CHARS: usize = 10_000;

/// Knobs for one timeline build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineOptions {
    /// Whether streaming deltas are shown at all. Usually true only while a
    /// task is running.
    pub include_deltas: bool,
    /// Restrict displayed deltas to this top-level task.
    pub active_task_id: Option<String>,
    pub max_delta_chars: usize,
    pub delegation_tool: String,
    pub clearify_tool: String,
    pub retry_markers: Vec<String>,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            include_deltas: false,
            active_task_id: None,
            max_delta_chars: DEFAULT_MAX_DELTA_CHARS,
            delegation_tool: DEFAULT_DELEGATION_TOOL.to_string(),
            clearify_tool: DEFAULT_CLEARIFY_TOOL.to_string(),
            retry_markers: DEFAULT_RETRY_MARKERS
                .iter()
                .map(|marker| (*marker).to_string())
                .collect(),
        }
    }
}

impl TimelineOptions {
    pub fn from_settings(settings: &TimelineSettings, is_running: bool) -> Self {
        Self {
            include_deltas: settings.include_deltas.resolve(is_running),
            active_task_id: None,
            max_delta_chars: settings.max_delta_chars,
            delegation_tool: settings.delegation_tool.clone(),
            clearify_tool: settings.clearify_tool.clone(),
            retry_markers: settings.retry_markers.clone(),
        }
    }

    pub fn with_deltas(mut self, include: bool) -> Self {
        self.include_deltas = include;
        self
    }

    pub fn with_active_task(mut self, task_id: impl Into<String>) -> Self {
        self.active_task_id = Some(task_id.into());
        self
    }
}
