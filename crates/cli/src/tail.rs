use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Lines appended since the previous poll.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TailBatch {
    /// Every complete physical line, blank ones included, so callers can
    /// number lines. Invalid UTF-8 is replaced rather than stalling the tail.
    pub lines: Vec<String>,
    /// The file shrank since the last poll and was re-read from the start.
    pub truncated: bool,
}

/// Byte-offset reader for one growing event file.
pub struct FileTailer {
    path: PathBuf,
    offset: u64,
}

impl FileTailer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read complete lines written since the last call. A trailing line
    /// without its newline is left for the next poll.
    pub fn read_new_lines(&mut self) -> Result<TailBatch> {
        let path = self.path.as_path();
        let file_size = std::fs::metadata(path)
            .with_context(|| format!("Cannot stat {}", path.display()))?
            .len();

        let mut truncated = false;
        if file_size < self.offset {
            tracing::info!(
                "File truncated ({}B < {}B offset), resetting: {}",
                file_size,
                self.offset,
                path.display()
            );
            self.offset = 0;
            truncated = true;
        }

        if file_size == self.offset {
            return Ok(TailBatch {
                lines: Vec::new(),
                truncated,
            });
        }

        let mut file =
            std::fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
        file.seek(SeekFrom::Start(self.offset))
            .with_context(|| format!("Cannot seek in {}", path.display()))?;

        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = match reader.read_until(b'\n', &mut buf) {
                Ok(read) => read,
                Err(e) => {
                    tracing::warn!("Error reading line from {}: {}", path.display(), e);
                    break;
                }
            };
            if read == 0 || buf.last() != Some(&b'\n') {
                break;
            }
            self.offset += read as u64;
            let line = String::from_utf8_lossy(&buf);
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }

        Ok(TailBatch { lines, truncated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_incremental_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, "{\"a\":1}\n").unwrap();

        let mut tailer = FileTailer::new(&path);
        assert_eq!(tailer.read_new_lines().unwrap().lines, vec!["{\"a\":1}"]);

        append(&path, "{\"b\":2}\n\n{\"c\":3}\n");
        assert_eq!(
            tailer.read_new_lines().unwrap().lines,
            vec!["{\"b\":2}", "", "{\"c\":3}"]
        );
        assert!(tailer.read_new_lines().unwrap().lines.is_empty());
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, "{\"a\":1}\n{\"b\"").unwrap();

        let mut tailer = FileTailer::new(&path);
        assert_eq!(tailer.read_new_lines().unwrap().lines, vec!["{\"a\":1}"]);
        assert_eq!(tailer.offset(), 8);

        append(&path, ":2}\n");
        assert_eq!(tailer.read_new_lines().unwrap().lines, vec!["{\"b\":2}"]);
    }

    #[test]
    fn test_invalid_utf8_line_does_not_stall() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, b"{\"a\":1}\n\xff\xfe bad\n{\"b\":2}\n").unwrap();

        let mut tailer = FileTailer::new(&path);
        let lines = tailer.read_new_lines().unwrap().lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "{\"a\":1}");
        assert!(lines[1].ends_with(" bad"));
        assert_eq!(lines[2], "{\"b\":2}");
        assert_eq!(tailer.offset(), 23);
        assert!(tailer.read_new_lines().unwrap().lines.is_empty());
    }

    #[test]
    fn test_truncation_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, "{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n").unwrap();
        let mut tailer = FileTailer::new(&path);
        let _ = tailer.read_new_lines().unwrap();

        std::fs::write(&path, "{\"x\":1}\n").unwrap();
        let batch = tailer.read_new_lines().unwrap();
        assert!(batch.truncated);
        assert_eq!(batch.lines, vec!["{\"x\":1}"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut tailer = FileTailer::new(dir.path().join("absent.jsonl"));
        assert!(tailer.read_new_lines().is_err());
    }
}
