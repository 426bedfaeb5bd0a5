//! Structural predicates over single lines.
//!
//! Every function here is total: any string is accepted and classified, and
//! nothing depends on surrounding lines.

use crate::parse::week_title;

/// Closes the pool and separates week blocks
pub const SEPARATOR: &str = "---";
/// `### name` opens a category inside the pool
pub const PROJECT_PREFIX: &str = "### ";
/// Shared by the pool header and week headers
pub const WEEK_PREFIX: &str = "## ";
pub const POOL_HEADER: &str = "## 待办池";
/// Marks a category that intentionally has no pending tasks
pub const PLACEHOLDER: &str = "（暂无未完成任务）";
pub const PENDING_MARKER: &str = "- [ ]";
pub const COMPLETED_MARKER: &str = "- [x]";
/// Spaces per nesting level
pub const INDENT_WIDTH: usize = 4;

/// What a line means to the document structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Separator,
    PoolHeader,
    ProjectHeader,
    WeekHeader,
    Task { completed: bool },
    Placeholder,
    Blank,
    Other,
}

pub fn classify(line: &str) -> LineKind {
    if line.trim().is_empty() {
        LineKind::Blank
    } else if is_separator(line) {
        LineKind::Separator
    } else if is_pool_header(line) {
        LineKind::PoolHeader
    } else if is_project_header(line) {
        LineKind::ProjectHeader
    } else if is_week_header(line) {
        LineKind::WeekHeader
    } else if let Some(completed) = checkbox_state(line) {
        LineKind::Task { completed }
    } else if is_placeholder(line) {
        LineKind::Placeholder
    } else {
        LineKind::Other
    }
}

pub fn is_separator(line: &str) -> bool {
    line.trim() == SEPARATOR
}

pub fn is_pool_header(line: &str) -> bool {
    line.trim() == POOL_HEADER
}

pub fn is_project_header(line: &str) -> bool {
    line.starts_with(PROJECT_PREFIX)
}

/// `## ` followed by a `M月D日 - M月D日` range. The pool header shares the
/// prefix but not the date pattern.
pub fn is_week_header(line: &str) -> bool {
    line.strip_prefix(WEEK_PREFIX)
        .is_some_and(week_title::is_week_title)
}

pub fn is_task_line(line: &str) -> bool {
    checkbox_state(line).is_some()
}

pub fn is_completed_task(line: &str) -> bool {
    checkbox_state(line) == Some(true)
}

pub fn is_pending_task(line: &str) -> bool {
    checkbox_state(line) == Some(false)
}

pub fn is_placeholder(line: &str) -> bool {
    line.trim() == PLACEHOLDER
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Separator or category header. Week headers are not boundaries here: they
/// live after the pool and bound a different zone.
pub fn is_block_boundary(line: &str) -> bool {
    is_separator(line) || is_project_header(line)
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// Checkbox state of a task line, `None` for anything else
pub fn checkbox_state(line: &str) -> Option<bool> {
    let rest = line.trim_start();
    if rest.starts_with(PENDING_MARKER) {
        Some(false)
    } else if rest.starts_with(COMPLETED_MARKER) {
        Some(true)
    } else {
        None
    }
}

/// Number of leading whitespace characters
pub fn leading_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Nesting depth of a line (leading whitespace / 4)
pub fn indent_level(line: &str) -> usize {
    leading_width(line) / INDENT_WIDTH
}

/// Task text after the checkbox, trimmed
pub fn task_content(line: &str) -> Option<&str> {
    checkbox_state(line)?;
    let rest = line.trim_start();
    Some(rest[PENDING_MARKER.len()..].trim())
}

/// The `indent + - [ ] ` prefix of a task line, including the single space
/// after the checkbox. `None` if the line has no such prefix.
pub fn task_prefix(line: &str) -> Option<&str> {
    checkbox_state(line)?;
    let indent_len = line.len() - line.trim_start().len();
    let marker_end = indent_len + PENDING_MARKER.len();
    if line[marker_end..].starts_with(' ') {
        Some(&line[..marker_end + 1])
    } else {
        None
    }
}

/// The same task line with its checkbox set to `completed`.
/// Indentation and text are kept as they are.
pub fn with_checkbox(line: &str, completed: bool) -> Option<String> {
    checkbox_state(line)?;
    let rest = line.trim_start();
    let indent = &line[..line.len() - rest.len()];
    let marker = if completed { COMPLETED_MARKER } else { PENDING_MARKER };
    Some(format!("{}{}{}", indent, marker, &rest[PENDING_MARKER.len()..]))
}

/// Category name from a `### name` line
pub fn project_name(line: &str) -> Option<&str> {
    line.strip_prefix(PROJECT_PREFIX).map(str::trim)
}

/// Title text from a week header line
pub fn week_header_title(line: &str) -> Option<&str> {
    if is_week_header(line) {
        Some(line[WEEK_PREFIX.len()..].trim())
    } else {
        None
    }
}

/// Re-indent `line` so it starts with exactly `width` spaces
pub fn reindent(line: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width), line.trim_start())
}
