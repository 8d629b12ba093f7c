use std::io::Write;

use agentline_core::{Event, EventType};
use agentline_timeline::{DisplayEntry, StreamEvent, SubagentThread, ToolCallIndex};
use anyhow::Result;
use chrono::{DateTime, Utc};

const DETAIL_CHARS: usize = 96;

/// Output format for rendered timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    /// NDJSON stream: each line is an independent JSON envelope
    Stream,
}

/// Structured output envelope (Terraform/ripgrep pattern).
#[derive(Debug, serde::Serialize)]
pub struct OutputEnvelope {
    pub version: &'static str,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(rename = "@message")]
    pub message: String,
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub data: serde_json::Value,
}

impl OutputEnvelope {
    pub fn new(data_type: &str, message: &str, data: serde_json::Value) -> Self {
        Self {
            version: "0.1",
            data_type: data_type.to_string(),
            message: message.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            data,
        }
    }
}

/// Render display entries in the specified format.
pub fn render_entries(
    entries: &[DisplayEntry],
    tools: &ToolCallIndex,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for entry in entries {
                write_entry_text(entry, tools, writer)?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(entries)?;
            writeln!(writer, "{json}")?;
        }
        OutputFormat::Stream => {
            for entry in entries {
                let envelope = OutputEnvelope::new(
                    "display_entry",
                    &entry_headline(entry, tools),
                    serde_json::to_value(entry)?,
                );
                writeln!(writer, "{}", serde_json::to_string(&envelope)?)?;
            }
        }
    }
    Ok(())
}

/// One line per entry; nested events are indented under their group.
pub fn write_entry_text(
    entry: &DisplayEntry,
    tools: &ToolCallIndex,
    writer: &mut dyn Write,
) -> Result<()> {
    writeln!(writer, "{}", entry_headline(entry, tools))?;
    match entry {
        DisplayEntry::Event(_) => {}
        DisplayEntry::ClearifyTimeline { groups, .. } => {
            for (step, group) in groups.iter().enumerate() {
                writeln!(
                    writer,
                    "  {}. {}",
                    step + 1,
                    clip(group.clearify.event.result_text().unwrap_or_default())
                )?;
                for item in &group.events {
                    writeln!(writer, "     {}", event_line(item, tools))?;
                }
            }
        }
        DisplayEntry::SubagentGroup(group) => {
            for thread in &group.threads {
                writeln!(writer, "  {}", thread_line(thread))?;
                for item in &thread.events {
                    writeln!(writer, "     {}", event_line(item, tools))?;
                }
            }
        }
    }
    Ok(())
}

fn entry_headline(entry: &DisplayEntry, tools: &ToolCallIndex) -> String {
    match entry {
        DisplayEntry::Event(item) => event_line(item, tools),
        DisplayEntry::ClearifyTimeline { groups, ts } => {
            let steps = groups.len();
            format!(
                "{} clearify      {} step{}",
                clock(*ts),
                steps,
                if steps == 1 { "" } else { "s" }
            )
        }
        DisplayEntry::SubagentGroup(group) => {
            let count = group.threads.len();
            format!(
                "{} subagents     {} ({} thread{})",
                clock(group.ts),
                group.group_key,
                count,
                if count == 1 { "" } else { "s" }
            )
        }
    }
}

fn thread_line(thread: &SubagentThread) -> String {
    let mut line = format!("[{}] {}", thread.context.status.as_str(), thread.key);
    if let Some(preview) = &thread.context.preview {
        line.push_str(" - ");
        line.push_str(&clip(preview));
    }
    if let (Some(done), Some(total)) = (thread.context.completed, thread.context.total) {
        line.push_str(&format!(" ({done}/{total})"));
    }
    if let Some(error) = &thread.context.last_error {
        line.push_str(" ! ");
        line.push_str(&clip(error));
    }
    line
}

fn event_line(item: &StreamEvent, tools: &ToolCallIndex) -> String {
    let event = &item.event;
    let detail = event_detail(event, tools);
    let line = format!(
        "{} #{:<4} {}",
        clock(event.timestamp),
        item.source_index,
        event.event_type
    );
    if detail.is_empty() {
        line
    } else {
        format!("{line}  {detail}")
    }
}

fn event_detail(event: &Event, tools: &ToolCallIndex) -> String {
    match &event.event_type {
        EventType::NodeOutputDelta => clip(event.delta().unwrap_or_default()),
        EventType::ResultFinal => clip(event.final_answer().unwrap_or_default()),
        EventType::NodeOutputSummary => clip(event.summary_content().unwrap_or_default()),
        EventType::ToolStarted => event.tool_name().unwrap_or_default().to_string(),
        EventType::ToolCompleted => {
            let tool = event
                .tool_name()
                .or_else(|| tools.resolve_start(event).and_then(Event::tool_name))
                .unwrap_or("tool");
            match event.error_text() {
                Some(error) => format!("{tool} ! {}", clip(error)),
                None => format!("{tool} -> {}", clip(event.result_text().unwrap_or_default())),
            }
        }
        EventType::NodeFailed => clip(event.error_text().unwrap_or_default()),
        _ => String::new(),
    }
}

fn clock(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "--:--:--".to_string(),
        |ts| ts.format("%H:%M:%S").to_string(),
    )
}

/// First line of `text`, shortened to `DETAIL_CHARS` characters.
fn clip(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or_default();
    if line.chars().count() <= DETAIL_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(DETAIL_CHARS - 3).collect();
    out.push_str("...");
    out
}
