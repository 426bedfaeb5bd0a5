use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{ParseWarning, WeekHeader, WeekRange};
use crate::ops::error::DocError;
use crate::parse::document_parser::parse_week_headers;
use crate::parse::line;
use crate::parse::tree_builder::{find_separator, week_body_end};
use crate::parse::week_title::{format_week_title, is_bare_week_title, resolve_range};

/// The week block that settlement writes into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekTarget {
    pub title: String,
    /// Header line in the lines returned alongside this target
    pub header_line: usize,
    /// Titles of blocks synthesised to reach today, newest first
    pub created: Vec<String>,
}

/// Result of `resolve_week`
#[derive(Debug, Clone)]
pub struct ResolvedWeek {
    pub lines: Vec<String>,
    pub target: WeekTarget,
    pub warnings: Vec<ParseWarning>,
}

/// A week header as listed by `list_weeks`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekListing {
    #[serde(flatten)]
    pub header: WeekHeader,
    pub is_current: bool,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Find the week block containing `today`, creating blocks if needed.
///
/// - No dated blocks: one block `[today, today+6]` is created.
/// - A block contains today: it is the target, nothing is inserted.
/// - Today is past the latest block: consecutive seven-day blocks are created
///   from the day after the latest end until one contains today.
/// - Otherwise (today falls in a gap or before every block): one block
///   `[today, today+6]` is created.
///
/// New blocks go right after the first separator, newest first. Headers with
/// impossible dates take no part and are reported as warnings.
pub fn resolve_week(lines: &[String], today: NaiveDate) -> Result<ResolvedWeek, DocError> {
    let mut warnings = Vec::new();
    let headers = parse_week_headers(lines, today, &mut warnings);
    let dated: Vec<(&WeekHeader, WeekRange)> = headers
        .iter()
        .filter_map(|h| h.range.map(|r| (h, r)))
        .collect();

    if let Some((header, _)) = dated.iter().find(|(_, r)| r.contains(today)) {
        return Ok(ResolvedWeek {
            lines: lines.to_vec(),
            target: WeekTarget {
                title: header.title.clone(),
                header_line: header.line_index,
                created: Vec::new(),
            },
            warnings,
        });
    }

    let mut ranges = Vec::new();
    match dated.iter().map(|(_, r)| r.end).max() {
        Some(latest_end) if latest_end < today => {
            let mut start = latest_end + Duration::days(1);
            while start <= today {
                ranges.push(WeekRange::starting(start));
                start += Duration::days(7);
            }
        }
        _ => ranges.push(WeekRange::starting(today)),
    }

    let created: Vec<String> = ranges.iter().rev().map(format_week_title).collect();
    let out = insert_week_blocks(lines, &created, !headers.is_empty());
    let title = created[0].clone();
    let header_line = out
        .iter()
        .position(|l| line::week_header_title(l) == Some(title.as_str()))
        .ok_or_else(|| DocError::NotFound(format!("week '{}'", title)))?;

    Ok(ResolvedWeek {
        lines: out,
        target: WeekTarget {
            title,
            header_line,
            created,
        },
        warnings,
    })
}

/// Insert empty week blocks (titles newest first) after the first separator.
/// With other blocks already present each new one is closed by its own
/// separator. Without any separator, one is appended first.
fn insert_week_blocks(lines: &[String], titles: &[String], has_blocks: bool) -> Vec<String> {
    let (at, mut block) = match find_separator(lines, 0) {
        Some(sep) => (sep + 1, Vec::new()),
        None => (
            lines.len(),
            vec![String::new(), line::SEPARATOR.to_string()],
        ),
    };
    let separated = has_blocks && at < lines.len();
    for title in titles {
        block.push(String::new());
        block.push(format!("{}{}", line::WEEK_PREFIX, title));
        block.push(String::new());
        if separated {
            block.push(line::SEPARATOR.to_string());
        }
    }
    if block.last().is_some_and(|l| l.is_empty()) && lines.get(at).is_some_and(|l| line::is_blank(l))
    {
        block.pop();
    }

    let mut out = lines.to_vec();
    out.splice(at..at, block);
    out
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

struct Entry {
    name: String,
    /// One past the entry's last non-blank line
    end: usize,
}

/// Top-level `- [x] name` entries of the block body `start..end`
fn scan_entries(lines: &[String], start: usize, end: usize) -> Vec<Entry> {
    let mut entries = Vec::new();
    for i in start..end {
        let Some(name) = entry_name(&lines[i]) else {
            continue;
        };
        let mut last = i;
        for (j, text) in lines.iter().enumerate().take(end).skip(i + 1) {
            if entry_name(text).is_some() {
                break;
            }
            if line::is_blank(text) {
                continue;
            }
            if line::leading_width(text) == 0 {
                break;
            }
            last = j;
        }
        entries.push(Entry {
            name: name.to_string(),
            end: last + 1,
        });
    }
    entries
}

fn entry_name(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(line::COMPLETED_MARKER)?.strip_prefix(' ')?;
    let name = rest.trim_end();
    (!name.is_empty()).then_some(name)
}

/// Shift lines so the shallowest one starts at `base` spaces, keeping the
/// relative indentation of the others
pub fn reindent_group(group: &[String], base: usize) -> Vec<String> {
    let min = group
        .iter()
        .filter(|l| !line::is_blank(l))
        .map(|l| line::leading_width(l))
        .min()
        .unwrap_or(0);
    group
        .iter()
        .map(|l| line::reindent(l, base + line::leading_width(l).saturating_sub(min)))
        .collect()
}

/// Write archived lines into the week block at `header`.
///
/// Each group is keyed by category name. A group whose name already has a
/// top-level `- [x] name` entry in the block is added to the end of that
/// entry, one level deep. The rest are appended after the block's last line
/// in order, each under a new `- [x] name` entry. The `""` group has no entry
/// line and is appended at top level.
pub fn merge_into_week(
    lines: &[String],
    header: usize,
    groups: &IndexMap<String, Vec<String>>,
) -> Vec<String> {
    let mut out = lines.to_vec();
    let end = week_body_end(&out, header);
    let mut entries = scan_entries(&out, header + 1, end);
    let mut deferred = Vec::new();

    for (name, group) in groups {
        if group.is_empty() {
            continue;
        }
        let existing = if name.is_empty() {
            None
        } else {
            entries.iter().find(|e| e.name == *name).map(|e| e.end)
        };
        match existing {
            Some(at) => {
                let added = reindent_group(group, line::INDENT_WIDTH);
                let count = added.len();
                out.splice(at..at, added);
                for entry in entries.iter_mut() {
                    if entry.end >= at {
                        entry.end += count;
                    }
                }
            }
            None => deferred.push((name, group)),
        }
    }

    if deferred.is_empty() {
        return out;
    }

    let mut appended = vec![String::new()];
    for (name, group) in deferred {
        if name.is_empty() {
            appended.extend(reindent_group(group, 0));
        } else {
            appended.push(format!("{} {}", line::COMPLETED_MARKER, name));
            appended.extend(reindent_group(group, line::INDENT_WIDTH));
        }
    }

    let end = week_body_end(&out, header);
    let at = (header + 1..end)
        .rev()
        .find(|&i| !line::is_blank(&out[i]))
        .map_or(header + 1, |i| i + 1);
    if out.get(at).is_none_or(|l| !line::is_blank(l)) {
        appended.push(String::new());
    }
    out.splice(at..at, appended);
    out
}

// ---------------------------------------------------------------------------
// Week management
// ---------------------------------------------------------------------------

/// Insert an empty block titled `title` as the newest week. The title must be
/// exactly one `M月D日 - M月D日` range of real dates in `today`'s year.
pub fn add_week(lines: &[String], title: &str, today: NaiveDate) -> Result<Vec<String>, DocError> {
    let title = title.trim();
    if !is_bare_week_title(title) || resolve_range(title, today).is_none() {
        return Err(DocError::InvalidLineKind {
            target: format!("'{}'", title),
            expected: "week title (M月D日 - M月D日)",
        });
    }
    if lines
        .iter()
        .any(|l| line::week_header_title(l) == Some(title))
    {
        return Err(DocError::AlreadyExists(format!("week '{}'", title)));
    }
    let has_blocks = lines.iter().any(|l| line::is_week_header(l));
    Ok(insert_week_blocks(lines, &[title.to_string()], has_blocks))
}

/// Every week header in file order
pub fn list_weeks(lines: &[String], today: NaiveDate) -> Vec<WeekListing> {
    let mut ignored = Vec::new();
    parse_week_headers(lines, today, &mut ignored)
        .into_iter()
        .map(|header| WeekListing {
            is_current: header.range.is_some_and(|r| r.contains(today)),
            header,
        })
        .collect()
}
