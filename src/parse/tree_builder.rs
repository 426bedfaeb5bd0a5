use std::ops::Range;

use indexmap::IndexMap;

use crate::model::TaskNode;
use crate::parse::line;

/// Root tasks per bucket (category name, week title, or `""`), in the order
/// buckets first appear
pub type TaskForest = IndexMap<String, Vec<TaskNode>>;

/// Build a node for a task line, or `None` if the line is not one
pub fn parse_task_node(line_index: usize, text: &str) -> Option<TaskNode> {
    let completed = line::checkbox_state(text)?;
    let content = line::task_content(text)?;
    Some(TaskNode::new(
        line_index,
        text.to_string(),
        content.to_string(),
        completed,
        line::indent_level(text),
    ))
}

/// Build task trees from `lines[window]` with a single forward scan.
///
/// Open nodes sit on a stack. A task line pops every node at the same or a
/// deeper level, attaching each popped node to the node below it (or to the
/// current bucket if the stack empties), then pushes itself. Blank lines,
/// placeholders and prose are skipped without touching the stack.
///
/// With `detect_projects` set, a `### name` line closes every open node and
/// switches to the bucket `name` (reusing it if the name was seen before), and
/// a separator ends the scan. Tasks seen before any header go to
/// `default_bucket`.
pub fn build_forest(
    lines: &[String],
    window: Range<usize>,
    detect_projects: bool,
    default_bucket: &str,
) -> TaskForest {
    let mut forest = TaskForest::new();
    let mut bucket = default_bucket.to_string();
    let mut stack: Vec<TaskNode> = Vec::new();

    let end = window.end.min(lines.len());
    for idx in window.start..end {
        let text = &lines[idx];

        if detect_projects {
            if line::is_separator(text) {
                break;
            }
            if let Some(name) = line::project_name(text) {
                close_all(&mut stack, &mut forest, &bucket);
                bucket = name.to_string();
                forest.entry(bucket.clone()).or_default();
                continue;
            }
        }

        let Some(node) = parse_task_node(idx, text) else {
            continue;
        };
        while stack
            .last()
            .is_some_and(|top| top.indent_level >= node.indent_level)
        {
            pop_one(&mut stack, &mut forest, &bucket);
        }
        stack.push(node);
    }

    close_all(&mut stack, &mut forest, &bucket);
    forest
}

fn pop_one(stack: &mut Vec<TaskNode>, forest: &mut TaskForest, bucket: &str) {
    let Some(node) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => forest.entry(bucket.to_string()).or_default().push(node),
    }
}

fn close_all(stack: &mut Vec<TaskNode>, forest: &mut TaskForest, bucket: &str) {
    while !stack.is_empty() {
        pop_one(stack, forest, bucket);
    }
}

// ---------------------------------------------------------------------------
// Region lookup
// ---------------------------------------------------------------------------

/// Index of the `## 待办池` line
pub fn find_pool_header(lines: &[String]) -> Option<usize> {
    lines.iter().position(|l| line::is_pool_header(l))
}

/// Index of the first separator at or after `from`
pub fn find_separator(lines: &[String], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&i| line::is_separator(&lines[i]))
}

/// Lines after the pool header up to (not including) the pool separator, or
/// to the end of the document if the separator is missing
pub fn pool_window(lines: &[String]) -> Option<Range<usize>> {
    let header = find_pool_header(lines)?;
    let end = find_separator(lines, header + 1).unwrap_or(lines.len());
    Some(header + 1..end)
}

/// One past the last line of the week block whose header is at `header`:
/// the next separator or week header, else the end of the document
pub fn week_body_end(lines: &[String], header: usize) -> usize {
    (header + 1..lines.len())
        .find(|&i| line::is_separator(&lines[i]) || line::is_week_header(&lines[i]))
        .unwrap_or(lines.len())
}

/// Root tasks of the week block at `header`
pub fn week_tasks(lines: &[String], header: usize) -> Vec<TaskNode> {
    let end = week_body_end(lines, header);
    build_forest(lines, header + 1..end, false, "")
        .into_values()
        .flatten()
        .collect()
}
