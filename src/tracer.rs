//! Decision tracer.
//!
//! Every decision gets the next sequence number and is appended to the trace
//! log as one JSON object per line. Entries are also emitted as `tracing`
//! events under the `moat::trace` target.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub id: u64,
    pub step: String,
    pub decision: String,
    pub rationale: String,
}

pub struct Tracer {
    trace_id: u64,
    path: PathBuf,
    file: File,
}

impl Tracer {
    /// Open `path` for appending, creating it and its parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open trace log {}", path.display()))?;
        Ok(Self {
            trace_id: 0,
            path,
            file,
        })
    }

    /// Record a decision and return the entry that was written.
    pub fn log_decision(
        &mut self,
        step: &str,
        decision: &str,
        rationale: &str,
    ) -> Result<TraceEntry> {
        self.trace_id += 1;
        let entry = TraceEntry {
            id: self.trace_id,
            step: step.to_string(),
            decision: decision.to_string(),
            rationale: rationale.to_string(),
        };

        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        self.file.flush()?;

        tracing::info!(target: "moat::trace", id = entry.id, step = %entry.step, "decision traced");
        Ok(entry)
    }

    /// Number of decisions traced by this tracer so far.
    pub fn last_id(&self) -> u64 {
        self.trace_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The last `limit` trace entries in a log.
///
/// A line may carry a logger prefix such as `INFO:root:` before the JSON
/// object. Lines without a trace object are skipped.
pub fn read_traces(path: impl AsRef<Path>, limit: usize) -> Result<Vec<TraceEntry>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file =
        File::open(path).with_context(|| format!("failed to open trace log {}", path.display()))?;

    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        match parse_trace_line(&line) {
            Some(entry) => entries.push(entry),
            None => tracing::debug!(line = %line, "skipping non-trace line"),
        }
    }

    let skip = entries.len().saturating_sub(limit);
    Ok(entries.split_off(skip))
}

fn parse_trace_line(line: &str) -> Option<TraceEntry> {
    let start = line.find('{')?;
    serde_json::from_str(line[start..].trim_end()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ids_increment_and_lines_append() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("traces.log");
        let mut tracer = Tracer::open(&path).unwrap();

        let a = tracer.log_decision("Iter 0", "go north", "short").unwrap();
        let b = tracer.log_decision("Iter 1", "go south", "shorter").unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(tracer.last_id(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let first: TraceEntry = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first, a);
    }

    #[test]
    fn reopening_appends_and_restarts_counter() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("traces.log");
        Tracer::open(&path).unwrap().log_decision("s", "d", "r").unwrap();
        let again = Tracer::open(&path).unwrap().log_decision("s", "d", "r").unwrap();
        assert_eq!(again.id, 1);
        assert_eq!(read_traces(&path, 10).unwrap().len(), 2);
    }

    #[test]
    fn read_traces_keeps_the_tail_and_skips_noise() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("traces.log");
        let mut tracer = Tracer::open(&path).unwrap();
        for i in 0..5 {
            tracer.log_decision(&format!("Iter {i}"), "d", "r").unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(f, "INFO:root:not json").unwrap();
        }

        let tail = read_traces(&path, 2).unwrap();
        let ids: Vec<u64> = tail.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn read_traces_accepts_logger_prefixed_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("traces.log");
        std::fs::write(
            &path,
            "INFO:root:{\"id\": 1, \"step\": \"Iter 0\", \"decision\": \"Take I-5\", \"rationale\": \"Used context: {}...\"}\n\
             WARNING:root:no json here\n\
             {\"id\":2,\"step\":\"Iter 1\",\"decision\":\"d\",\"rationale\":\"r\"}\n",
        )
        .unwrap();

        let entries = read_traces(&path, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].decision, "Take I-5");
        assert_eq!(entries[0].rationale, "Used context: {}...");
        assert_eq!(entries[1].id, 2);
    }

    #[test]
    fn read_missing_log_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_traces(tmp.path().join("none.log"), 5).unwrap().is_empty());
    }
}
