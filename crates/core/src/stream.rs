//! Event stream decoding: JSONL and captured SSE text.
//!
//! ```text
//! {"event_type":"workflow.input.received","timestamp":"...","payload":{...}}
//! data: {"event_type":"workflow.tool.started","timestamp":"...","payload":{...}}
//! ```
//!
//! A JSONL line is one event. In SSE framing only `data:` lines carry events;
//! `event:`, `id:`, `retry:` and `:` comment lines are ignored, as are blank lines.

use crate::trace::Event;
use std::io::{self, BufRead};

/// Error types for stream decoding
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error at line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Expected a JSON object at line {0}")]
    NotAnObject(usize),
}

/// Decode one line. Returns `Ok(None)` for lines that carry no event.
pub fn parse_line(raw: &str, line: usize) -> Result<Option<Event>, StreamError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return Ok(None);
    }

    let body = if let Some(data) = trimmed.strip_prefix("data:") {
        data.trim_start()
    } else if is_sse_field(trimmed) {
        return Ok(None);
    } else {
        trimmed
    };
    if body.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|source| StreamError::Json { line, source })?;
    if !value.is_object() {
        return Err(StreamError::NotAnObject(line));
    }
    let event = serde_json::from_value(value).map_err(|source| StreamError::Json { line, source })?;
    Ok(Some(event))
}

fn is_sse_field(line: &str) -> bool {
    ["event:", "id:", "retry:"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Read every event, failing on the first malformed line.
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<Event>, StreamError> {
    let mut events = Vec::new();
    for (i, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if let Some(event) = parse_line(&line, i + 1)? {
            events.push(event);
        }
    }
    Ok(events)
}

/// Read every event, skipping malformed lines with a warning.
pub fn read_events_lenient<R: BufRead>(reader: R) -> Result<Vec<Event>, StreamError> {
    let mut events = Vec::new();
    for (i, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        match parse_line(&line, i + 1) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping undecodable event line: {}", e),
        }
    }
    Ok(events)
}

/// Decode a batch of already-split lines, e.g. from a file tailer.
/// `first_line` is the 1-based line number of `lines[0]`.
pub fn parse_lines<S: AsRef<str>>(
    lines: &[S],
    first_line: usize,
    lenient: bool,
) -> Result<Vec<Event>, StreamError> {
    let mut events = Vec::with_capacity(lines.len());
    for (offset, line) in lines.iter().enumerate() {
        match parse_line(line.as_ref(), first_line + offset) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) if lenient => tracing::warn!("Skipping undecodable event line: {}", e),
            Err(e) => return Err(e),
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::EventType;
    use std::io::Cursor;

    #[test]
    fn reads_jsonl_and_sse_mixed() {
        let input = concat!(
            "{\"event_type\":\"workflow.input.received\",\"payload\":{\"task\":\"hi\"}}\n",
            "\n",
            ": keep-alive\n",
            "event: message\n",
            "id: 42\n",
            "data: {\"event_type\":\"workflow.result.final\",\"payload\":{\"final_answer\":\"ok\"}}\n",
        );
        let events = read_events(Cursor::new(input)).expect("read");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::InputReceived);
        assert_eq!(events[1].final_answer(), Some("ok"));
    }

    #[test]
    fn strict_reader_reports_line_numbers() {
        let input = "{\"event_type\":\"workflow.node.started\"}\nnot json\n";
        let err = read_events(Cursor::new(input)).expect_err("should fail");
        match err {
            StreamError::Json { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_object_lines_are_rejected() {
        let err = parse_line("[1,2,3]", 5).expect_err("array is not an event");
        assert!(matches!(err, StreamError::NotAnObject(5)));
    }

    #[test]
    fn lenient_reader_skips_bad_lines() {
        let input = "garbage\n{\"event_type\":\"workflow.node.failed\"}\n42\n";
        let events = read_events_lenient(Cursor::new(input)).expect("read");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::NodeFailed);
    }

    #[test]
    fn parse_lines_respects_strictness() {
        let lines = vec!["{\"event_type\":\"x\"}".to_string(), "oops".to_string()];
        assert!(parse_lines(&lines, 10, false).is_err());
        assert_eq!(parse_lines(&lines, 10, true).expect("lenient").len(), 1);
    }
}
