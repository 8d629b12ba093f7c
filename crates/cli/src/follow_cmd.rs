use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use agentline_core::Event;
use agentline_core::stream::parse_lines;
use agentline_runtime_config::ConsoleConfig;
use agentline_timeline::{DisplayEntry, Timeline, TimelineOptions, ToolCallIndex, build_timeline};
use agentline_viewport::EventListView;
use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use crate::output::{OutputFormat, render_entries};
use crate::render_cmd::timeline_options;
use crate::tail::FileTailer;

#[derive(Debug, Clone, Args)]
pub struct FollowArgs {
    /// Event file that is still being written
    pub file: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Only show deltas of this top-level task
    #[arg(long)]
    pub active_task: Option<String>,

    /// Skip undecodable lines instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    pub interval_ms: u64,
}

/// Incremental state of a followed file.
struct FollowSession {
    tailer: FileTailer,
    options: TimelineOptions,
    lenient: bool,
    events: Vec<Event>,
    lines_read: usize,
    shown: Vec<DisplayEntry>,
    view: EventListView,
}

/// Entries to print after one poll.
struct FollowUpdate {
    entries: Vec<DisplayEntry>,
    tools: ToolCallIndex,
    announcement: Option<String>,
}

impl FollowSession {
    fn new(args: &FollowArgs, config: &ConsoleConfig) -> Self {
        Self {
            tailer: FileTailer::new(&args.file),
            options: timeline_options(&config.timeline, true, args.active_task.clone()),
            lenient: args.lenient,
            events: Vec::new(),
            lines_read: 0,
            shown: Vec::new(),
            view: EventListView::new(&config.viewport),
        }
    }

    fn poll(&mut self, now: Instant) -> Result<Option<FollowUpdate>> {
        let batch = self.tailer.read_new_lines()?;
        if batch.truncated {
            info!("Event file was rewritten; rebuilding timeline");
            self.events.clear();
            self.lines_read = 0;
            self.shown.clear();
            self.view.on_items_replaced(0, now);
        }
        if batch.lines.is_empty() {
            return Ok(None);
        }

        let first_line = self.lines_read + 1;
        self.lines_read += batch.lines.len();
        let parsed = parse_lines(&batch.lines, first_line, self.lenient).with_context(|| {
            format!("Failed to decode {}", self.tailer.path().display())
        })?;
        if parsed.is_empty() {
            return Ok(None);
        }
        self.events.extend(parsed);

        let Timeline { entries, tools, .. } = build_timeline(&self.events, &self.options);
        let command = self.view.on_items_changed(entries.len(), now);
        if let Some(command) = command {
            debug!("Follow scroll: {:?}", command);
            self.view.finish_auto_scroll();
        }

        // Earlier rows can still change (a delta run grows, a clearify group
        // fills up), so reprint from the first row that differs.
        let start = first_difference(&self.shown, &entries);
        let grew = entries.len() > self.shown.len();
        let changed = entries[start..].to_vec();
        self.shown = entries;

        let announcement = if grew {
            self.view.announcement(now).map(String::from)
        } else {
            None
        };
        Ok(Some(FollowUpdate {
            entries: changed,
            tools,
            announcement,
        }))
    }
}

fn first_difference(previous: &[DisplayEntry], current: &[DisplayEntry]) -> usize {
    previous
        .iter()
        .zip(current)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| previous.len().min(current.len()))
}

pub async fn run(args: FollowArgs, config: &ConsoleConfig) -> Result<()> {
    let mut session = FollowSession::new(&args, config);
    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(10)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(update) = session.poll(Instant::now())? else {
                    continue;
                };
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                render_entries(&update.entries, &update.tools, args.format, &mut out)?;
                out.flush()?;
                if let Some(message) = update.announcement {
                    eprintln!("-- {message}");
                }
            }
            _ = &mut shutdown => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }
    Ok(())
}
