use chrono::NaiveDate;
use serde::Serialize;

use super::task::TaskNode;

/// One year's TODO file as a flat array of lines.
///
/// Text is split on `\n` only, so a trailing newline shows up as a final empty
/// line and `to_text` reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub lines: Vec<String>,
}

impl Document {
    pub fn from_text(text: &str) -> Self {
        Document {
            lines: text.split('\n').map(|l| l.to_string()).collect(),
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Document { lines }
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Content of a freshly created document for `year`
    pub fn template(year: i32) -> String {
        format!("# {} TODO\n\n## 待办池\n\n---\n", year)
    }
}

/// An inclusive calendar range parsed from a week title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    /// The seven-day range beginning on `start`
    pub fn starting(start: NaiveDate) -> Self {
        WeekRange {
            start,
            end: start + chrono::Duration::days(6),
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// A `## M月D日 - M月D日` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekHeader {
    pub title: String,
    pub line_index: usize,
    /// None when the digits don't form real dates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<WeekRange>,
}

/// A `### name` category in the pool and its root tasks
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGroup {
    /// Empty for tasks that appear before the first category header
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_line: Option<usize>,
    /// True if the category holds only the placeholder line
    pub is_empty: bool,
    pub tasks: Vec<TaskNode>,
}

/// A dated week block and its root tasks
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBlock {
    #[serde(flatten)]
    pub header: WeekHeader,
    /// Whether the block's range contains the reference date
    pub is_current: bool,
    pub tasks: Vec<TaskNode>,
}

/// Something the lenient parser skipped or merged instead of failing on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseWarning {
    /// A second `### name` header with a name seen before; tasks are merged
    DuplicateProject { name: String, line_index: usize },
    /// A week header whose dates are not valid calendar dates
    UnparseableWeek { title: String, line_index: usize },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::DuplicateProject { name, line_index } => {
                write!(f, "line {}: duplicate category '{}' merged", line_index, name)
            }
            ParseWarning::UnparseableWeek { title, line_index } => {
                write!(f, "line {}: week '{}' has no valid dates", line_index, title)
            }
        }
    }
}

/// Read-only view of a whole document
#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub pool: Vec<ProjectGroup>,
    /// In file order (newest first by convention)
    pub weeks: Vec<WeekBlock>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseWarning>,
}
