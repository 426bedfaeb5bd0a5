use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::io::lock::FileLock;
use crate::io::store::atomic_write;
use crate::model::{JournalConfig, ParseWarning};

/// Size above which old entries are trimmed while appending (1 MB)
const MAX_JOURNAL_SIZE: u64 = 1_048_576;

pub const JOURNAL_FILE: &str = ".journal.log";

/// Written at the top of a new journal
const FILE_HEADER: &str = "\
<!-- td journal: append-only record of data td removed or could not save
     Deleted tasks, settled weeks, failed writes and parser warnings land here.
     View with: td journal
     Prune old entries: td journal prune
     Safe to delete if empty or stale. -->

---
";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalCategory {
    /// Lenient-parse warnings
    Parser,
    /// A document that could not be saved; the body holds the lost content
    Write,
    /// Lines removed by `rm`
    Delete,
    /// Lines archived by a settlement
    Settle,
}

impl fmt::Display for JournalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalCategory::Parser => write!(f, "parser"),
            JournalCategory::Write => write!(f, "write"),
            JournalCategory::Delete => write!(f, "delete"),
            JournalCategory::Settle => write!(f, "settle"),
        }
    }
}

impl JournalCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "parser" => Some(JournalCategory::Parser),
            "write" => Some(JournalCategory::Write),
            "delete" => Some(JournalCategory::Delete),
            "settle" => Some(JournalCategory::Settle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub category: JournalCategory,
    pub description: String,
    pub fields: IndexMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalSummary {
    pub entry_count: usize,
    pub oldest: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Entry construction
// ---------------------------------------------------------------------------

impl JournalEntry {
    pub fn new(category: JournalCategory, description: impl Into<String>) -> Self {
        JournalEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: IndexMap::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Lines removed from `doc` starting at `line_index`
    pub fn deletion(doc: &Path, line_index: usize, removed: &[String]) -> Self {
        JournalEntry::new(
            JournalCategory::Delete,
            format!("{} line(s) deleted", removed.len()),
        )
        .field("Document", doc.display())
        .field("Line", line_index)
        .body(removed.join("\n"))
    }

    /// Archived lines per category written into `week`
    pub fn settlement(
        doc: &Path,
        week: &str,
        settled: usize,
        archived: &IndexMap<String, Vec<String>>,
    ) -> Self {
        let mut body = String::new();
        for (name, lines) in archived {
            let label = if name.is_empty() { "(no category)" } else { name };
            body.push_str(&format!("[{}]\n", label));
            for line in lines {
                body.push_str(line);
                body.push('\n');
            }
        }
        JournalEntry::new(
            JournalCategory::Settle,
            format!("{} task(s) settled into {}", settled, week),
        )
        .field("Document", doc.display())
        .field("Week", week)
        .body(body)
    }

    /// Content that could not be written to `doc`
    pub fn failed_write(doc: &Path, error: &io::Error, content: &str) -> Self {
        JournalEntry::new(JournalCategory::Write, "document write failed")
            .field("Document", doc.display())
            .field("Error", error)
            .body(content)
    }

    pub fn parse_warnings(doc: &Path, warnings: &[ParseWarning]) -> Self {
        let body: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
        JournalEntry::new(
            JournalCategory::Parser,
            format!("{} structure warning(s)", warnings.len()),
        )
        .field("Document", doc.display())
        .body(body.join("\n"))
    }

    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} — {}: {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }

    /// Raw markdown form, as stored
    pub fn to_display_markdown(&self) -> String {
        self.to_markdown()
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// The append-only journal beside the documents
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
    enabled: bool,
    prune_days: i64,
}

impl Journal {
    pub fn new(data_dir: &Path, config: &JournalConfig) -> Self {
        Journal {
            path: data_dir.join(JOURNAL_FILE),
            enabled: config.enabled,
            prune_days: config.prune_days,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry. Failures are printed as warnings and never returned.
    pub fn append(&self, entry: JournalEntry) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.append_inner(&entry) {
            eprintln!("warning: could not write to journal: {}", e);
        }
    }

    fn append_inner(&self, entry: &JournalEntry) -> io::Result<()> {
        if let Ok(meta) = std::fs::metadata(&self.path)
            && meta.len() > MAX_JOURNAL_SIZE
        {
            self.try_inline_trim();
        }

        let needs_header = std::fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if needs_header {
            file.write_all(FILE_HEADER.as_bytes())?;
        }
        file.write_all(entry.to_markdown().as_bytes())?;
        Ok(())
    }

    /// Drop entries past the prune age, but only if nobody else holds the
    /// journal right now
    fn try_inline_trim(&self) {
        let Ok(_lock) = FileLock::acquire(&self.path, Duration::ZERO) else {
            return;
        };
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return;
        };
        let cutoff = Utc::now() - chrono::Duration::days(self.prune_days);
        let trimmed = prune_entries_before(&content, &cutoff);
        if trimmed.len() < content.len() {
            let _ = atomic_write(&self.path, trimmed.as_bytes());
        }
    }

    /// Entries newest first, optionally only the last `limit` and only those
    /// at or after `since`
    pub fn entries(&self, limit: Option<usize>, since: Option<DateTime<Utc>>) -> Vec<JournalEntry> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let mut entries = parse_entries(&content);
        if let Some(since) = since {
            entries.retain(|e| e.timestamp >= since);
        }
        if let Some(n) = limit {
            let skip = entries.len().saturating_sub(n);
            entries.drain(..skip);
        }
        entries.reverse();
        entries
    }

    pub fn summary(&self) -> Option<JournalSummary> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let entries = parse_entries(&content);
        if entries.is_empty() {
            return None;
        }
        Some(JournalSummary {
            entry_count: entries.len(),
            oldest: entries.first().map(|e| e.timestamp),
        })
    }

    /// Remove entries older than `before` (default: the configured prune
    /// age), or every entry with `all`. Returns the number removed.
    pub fn prune(&self, before: Option<DateTime<Utc>>, all: bool) -> io::Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let _lock = FileLock::acquire(&self.path, Duration::from_secs(1)).map_err(|_| {
            io::Error::new(
                io::ErrorKind::WouldBlock,
                "journal is in use, try again later",
            )
        })?;

        let content = std::fs::read_to_string(&self.path)?;
        let original = parse_entries(&content).len();
        if all {
            atomic_write(&self.path, FILE_HEADER.as_bytes())?;
            return Ok(original);
        }

        let cutoff =
            before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(self.prune_days));
        let trimmed = prune_entries_before(&content, &cutoff);
        let remaining = parse_entries(&trimmed).len();
        atomic_write(&self.path, trimmed.as_bytes())?;
        Ok(original - remaining)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_entries(content: &str) -> Vec<JournalEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some(header) = line.strip_prefix("## ") else {
            continue;
        };
        let Some((timestamp, category, description)) = parse_entry_header(header) else {
            continue;
        };

        let mut fields = IndexMap::new();
        let mut body = String::new();
        let mut in_body = false;
        for line in lines.by_ref() {
            if in_body {
                if line == "```" {
                    in_body = false;
                } else {
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(line);
                }
                continue;
            }
            if line == "---" || line.starts_with("## ") {
                break;
            }
            if line.starts_with("```") {
                in_body = true;
                continue;
            }
            if let Some((key, value)) = line.trim().split_once(": ") {
                fields.insert(key.to_string(), value.to_string());
            }
        }

        entries.push(JournalEntry {
            timestamp,
            category,
            description,
            fields,
            body,
        });
    }
    entries
}

/// `<timestamp> — <category>: <description>`
fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, JournalCategory, String)> {
    let (stamp, rest) = header.split_once(" — ")?;
    let timestamp = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
    let (category, description) = rest.split_once(": ")?;
    let category = JournalCategory::parse_category(category)?;
    Some((timestamp, category, description.to_string()))
}

/// Raw content without the entries stamped before `cutoff`. The file header
/// is kept. Only a `## ` line outside a fenced body that parses as an entry
/// header starts a new entry; stored documents have `## ` lines of their own.
fn prune_entries_before(content: &str, cutoff: &DateTime<Utc>) -> String {
    let mut result = String::new();
    let mut current = String::new();
    let mut current_stamp: Option<DateTime<Utc>> = None;
    let mut in_header = true;
    let mut in_body = false;

    for line in content.lines() {
        if in_header {
            result.push_str(line);
            result.push('\n');
            if line == "---" {
                in_header = false;
            }
            continue;
        }
        if in_body {
            if line == "```" {
                in_body = false;
            }
        } else if line.starts_with("```") {
            in_body = true;
        } else if let Some(stripped) = line.strip_prefix("## ")
            && let Some((ts, _, _)) = parse_entry_header(stripped)
        {
            if current_stamp.is_some_and(|ts| ts >= *cutoff) {
                result.push_str(&current);
            }
            current.clear();
            current_stamp = Some(ts);
        }
        current.push_str(line);
        current.push('\n');
    }
    if current_stamp.is_some_and(|ts| ts >= *cutoff) {
        result.push_str(&current);
    }
    result
}
