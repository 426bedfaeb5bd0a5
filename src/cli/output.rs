use serde::Serialize;

use crate::model::{ParsedDocument, ProjectGroup, TaskNode, WeekBlock};
use crate::ops::ErrorKind;
use crate::ops::week_ops::WeekListing;
use crate::parse::line;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

/// Reply of every write command
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteJson {
    pub success: bool,
    pub new_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_weeks: Vec<String>,
}

impl WriteJson {
    pub fn new(lines: &[String]) -> Self {
        WriteJson {
            success: true,
            new_content: lines.join("\n"),
            settled_count: None,
            week_title: None,
            created_weeks: Vec::new(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorJson<'a> {
    pub success: bool,
    pub kind: ErrorKind,
    pub error: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentJson<'a> {
    pub year: i32,
    pub path: String,
    #[serde(flatten)]
    pub document: &'a ParsedDocument,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneJson {
    pub removed: usize,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Width of the line-index gutter
const GUTTER: usize = 4;

fn gutter(line_index: usize) -> String {
    format!("{:>width$}  ", line_index, width = GUTTER)
}

fn blank_gutter() -> String {
    " ".repeat(GUTTER + 2)
}

/// `  12  [x] text`, indented by depth below the gutter
pub fn format_task_line(node: &TaskNode, depth: usize) -> String {
    let check = if node.completed { 'x' } else { ' ' };
    format!(
        "{}{}[{}] {}",
        gutter(node.line_index),
        " ".repeat(depth * line::INDENT_WIDTH),
        check,
        node.content
    )
}

/// A task and all its descendants, one output line each
pub fn format_task_tree(node: &TaskNode, depth: usize) -> Vec<String> {
    let mut out = vec![format_task_line(node, depth)];
    for child in &node.children {
        out.extend(format_task_tree(child, depth + 1));
    }
    out
}

fn format_group(group: &ProjectGroup) -> Vec<String> {
    let mut out = Vec::new();
    if !group.name.is_empty() {
        let heading = format!("### {}", group.name);
        match group.header_line {
            Some(idx) => out.push(format!("{}{}", gutter(idx), heading)),
            None => out.push(format!("{}{}", blank_gutter(), heading)),
        }
    }
    if group.tasks.is_empty() {
        out.push(format!("{}(empty)", blank_gutter()));
    }
    for task in &group.tasks {
        out.extend(format_task_tree(task, 0));
    }
    out
}

fn format_week(week: &WeekBlock) -> Vec<String> {
    let marker = if week.is_current { "  *this week*" } else { "" };
    let mut out = vec![format!(
        "{}## {}{}",
        gutter(week.header.line_index),
        week.header.title,
        marker
    )];
    for task in &week.tasks {
        out.extend(format_task_tree(task, 0));
    }
    out
}

/// Tree view used by `td show`
pub fn format_document(doc: &ParsedDocument) -> Vec<String> {
    let mut out = vec![format!("{}{}", blank_gutter(), line::POOL_HEADER)];
    if doc.pool.is_empty() {
        out.push(format!("{}(no pool)", blank_gutter()));
    }
    for group in &doc.pool {
        out.extend(format_group(group));
    }
    for week in &doc.weeks {
        out.push(String::new());
        out.extend(format_week(week));
    }
    out
}

/// One line per week header for `td weeks`
pub fn format_week_listing(week: &WeekListing) -> String {
    let range = match week.header.range {
        Some(r) => format!("{} .. {}", r.start, r.end),
        None => "(invalid dates)".to_string(),
    };
    let marker = if week.is_current { "  *this week*" } else { "" };
    format!(
        "{}{}  [{}]{}",
        gutter(week.header.line_index),
        week.header.title,
        range,
        marker
    )
}
