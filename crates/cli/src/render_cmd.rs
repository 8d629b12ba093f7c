use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use agentline_core::Event;
use agentline_core::stream::{read_events, read_events_lenient};
use agentline_runtime_config::TimelineSettings;
use agentline_timeline::{TimelineOptions, build_timeline};
use anyhow::{Context, Result};
use clap::Args;

use crate::output::{OutputFormat, render_entries};

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Recorded event stream (JSONL or captured SSE)
    pub file: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Treat the task as still running (shows streaming deltas in auto mode)
    #[arg(long)]
    pub running: bool,

    /// Only show deltas of this top-level task
    #[arg(long)]
    pub active_task: Option<String>,

    /// Skip undecodable lines instead of failing
    #[arg(long)]
    pub lenient: bool,
}

pub fn run(args: RenderArgs, settings: &TimelineSettings) -> Result<()> {
    let events = load_events(&args.file, args.lenient)?;
    let options = timeline_options(settings, args.running, args.active_task);
    let timeline = build_timeline(&events, &options);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render_entries(&timeline.entries, &timeline.tools, args.format, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn timeline_options(
    settings: &TimelineSettings,
    running: bool,
    active_task: Option<String>,
) -> TimelineOptions {
    let options = TimelineOptions::from_settings(settings, running);
    match active_task {
        Some(task) => options.with_active_task(task),
        None => options,
    }
}

pub fn load_events(path: &Path, lenient: bool) -> Result<Vec<Event>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let reader = BufReader::new(file);
    let events = if lenient {
        read_events_lenient(reader)
    } else {
        read_events(reader)
    };
    events.with_context(|| format!("Failed to read events from {}", path.display()))
}
