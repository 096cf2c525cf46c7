//! Note journal: a flat list of [`MemoryRecord`]s persisted as a JSON array.
//!
//! The journal lives in memory for the duration of a session and is only
//! written back on [`Journal::save`]. Ids increase monotonically: a new note
//! gets one more than the largest id present, so deleting and re-adding never
//! reuses an id still in the list.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use serde_json::Map;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use crate::error::MoatError;
use crate::memory::types::{Category, Importance, MemoryRecord};

/// Selection applied by [`Journal::filter`].
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Exact category name; `None` means all.
    pub category: Option<String>,
    /// Allowed importance levels; empty means all.
    pub importance: HashSet<Importance>,
    /// Case-insensitive substring over content, category and tags.
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    records: Vec<MemoryRecord>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<MemoryRecord>) -> Self {
        Self { records }
    }

    /// Read a journal file. A missing file is an empty journal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no journal file, starting empty");
            return Ok(Self::new());
        }
        let records = read_records(path)?;
        tracing::info!(path = %path.display(), count = records.len(), "journal loaded");
        Ok(Self { records })
    }

    /// Write the journal as pretty JSON. Uses a temp file + rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let json = self.to_json()?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)
                .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
            file.write_all(json.as_bytes())
                .context("error writing journal")?;
            file.flush()?;
        }
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        tracing::info!(path = %path.display(), count = self.records.len(), "journal saved");
        Ok(())
    }

    /// Serialize all records as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Append a note. Returns a copy of the stored record.
    pub fn add(
        &mut self,
        content: &str,
        category: Category,
        tags: Vec<String>,
    ) -> Result<MemoryRecord, MoatError> {
        if content.trim().is_empty() {
            return Err(MoatError::InvalidInput("content must not be empty".into()));
        }

        let tags = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let record = MemoryRecord {
            id: self.next_id(),
            content: content.to_string(),
            category: category.to_string(),
            tags,
            timestamp: iso_timestamp(&Local::now()),
            importance: Some(Importance::Medium.into()),
            extra: Map::new(),
        };
        tracing::debug!(id = record.id, category = %record.category, "note added");
        self.records.push(record.clone());
        Ok(record)
    }

    fn next_id(&self) -> u64 {
        self.records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Notes matching `query` in content, category or any tag. Empty query matches all.
    pub fn search(&self, query: &str) -> Vec<&MemoryRecord> {
        search_records(self.records.iter(), query)
    }

    pub fn filter(&self, filter: &Filter) -> Vec<&MemoryRecord> {
        let selected = self.records.iter().filter(|r| {
            filter
                .category
                .as_deref()
                .map_or(true, |c| r.category == c)
                && (filter.importance.is_empty()
                    || r.importance().map_or(false, |i| filter.importance.contains(&i)))
        });
        match filter.query.as_deref() {
            Some(q) => search_records(selected, q),
            None => selected.collect(),
        }
    }

    /// [`Journal::filter`] results, most recently added first.
    pub fn listing(&self, filter: &Filter) -> Vec<&MemoryRecord> {
        let mut hits = self.filter(filter);
        hits.reverse();
        hits
    }

    pub fn get(&self, id: u64) -> Option<&MemoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Remove the note with `id`. Returns `true` if one was removed.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Append imported records as-is.
    pub fn extend(&mut self, records: impl IntoIterator<Item = MemoryRecord>) {
        self.records.extend(records);
    }

    /// Append every record from a JSON export. Returns how many were imported.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let records = read_records(path.as_ref())?;
        let n = records.len();
        self.extend(records);
        Ok(n)
    }

    /// Per-category counts, in order of first appearance.
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for r in &self.records {
            match counts.iter_mut().find(|(c, _)| *c == r.category) {
                Some((_, n)) => *n += 1,
                None => counts.push((r.category.clone(), 1)),
            }
        }
        counts
    }

    /// Distinct categories present, in order of first appearance.
    pub fn categories(&self) -> Vec<String> {
        self.category_counts().into_iter().map(|(c, _)| c).collect()
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Split a comma-separated tag list, trimming and dropping empties.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// `memories_export_YYYYmmdd_HHMMSS.json`
pub fn export_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("memories_export_{}.json", now.format("%Y%m%d_%H%M%S"))
}

fn iso_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn search_records<'a>(
    records: impl Iterator<Item = &'a MemoryRecord>,
    query: &str,
) -> Vec<&'a MemoryRecord> {
    if query.is_empty() {
        return records.collect();
    }
    let q = query.to_lowercase();
    records
        .filter(|r| {
            r.content.to_lowercase().contains(&q)
                || r.category.to_lowercase().contains(&q)
                || r.tags.iter().any(|t| t.to_lowercase().contains(&q))
        })
        .collect()
}

fn read_records(path: &Path) -> Result<Vec<MemoryRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read journal file: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse journal JSON: {}", path.display()))
}
