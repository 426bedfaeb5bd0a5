use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::{ParseWarning, ParsedDocument, ProjectGroup, WeekBlock, WeekHeader};
use crate::parse::line;
use crate::parse::tree_builder::{build_forest, pool_window, week_tasks};
use crate::parse::week_title::resolve_range;

/// Parse a whole document into its pool categories and week blocks.
///
/// Never fails. Malformed structure is tolerated: duplicate category headers
/// are merged and week headers with impossible dates are listed without a
/// range. Both produce a `ParseWarning`.
pub fn parse_document(lines: &[String], today: NaiveDate) -> ParsedDocument {
    let mut warnings = Vec::new();
    let pool = parse_pool(lines, &mut warnings);
    let weeks = parse_week_headers(lines, today, &mut warnings)
        .into_iter()
        .map(|header| {
            let is_current = header.range.is_some_and(|r| r.contains(today));
            let tasks = week_tasks(lines, header.line_index);
            WeekBlock {
                header,
                is_current,
                tasks,
            }
        })
        .collect();

    ParsedDocument {
        pool,
        weeks,
        warnings,
    }
}

fn parse_pool(lines: &[String], warnings: &mut Vec<ParseWarning>) -> Vec<ProjectGroup> {
    let Some(window) = pool_window(lines) else {
        return Vec::new();
    };

    // Header positions and placeholder presence, first occurrence wins
    let mut header_lines: Vec<(String, usize)> = Vec::new();
    let mut seen = HashSet::new();
    let mut with_placeholder = HashSet::new();
    let mut current = String::new();
    for idx in window.clone() {
        let text = &lines[idx];
        if let Some(name) = line::project_name(text) {
            current = name.to_string();
            if seen.insert(current.clone()) {
                header_lines.push((current.clone(), idx));
            } else {
                warnings.push(ParseWarning::DuplicateProject {
                    name: current.clone(),
                    line_index: idx,
                });
            }
        } else if line::is_placeholder(text) {
            with_placeholder.insert(current.clone());
        }
    }

    build_forest(lines, window, true, "")
        .into_iter()
        .map(|(name, tasks)| {
            let header_line = header_lines
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, idx)| *idx);
            let is_empty = tasks.is_empty() && with_placeholder.contains(&name);
            ProjectGroup {
                name,
                header_line,
                is_empty,
                tasks,
            }
        })
        .collect()
}

/// Every week header in file order, with its range resolved against `today`
pub fn parse_week_headers(
    lines: &[String],
    today: NaiveDate,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<WeekHeader> {
    let mut headers = Vec::new();
    for (idx, text) in lines.iter().enumerate() {
        let Some(title) = line::week_header_title(text) else {
            continue;
        };
        let range = resolve_range(title, today);
        if range.is_none() {
            warnings.push(ParseWarning::UnparseableWeek {
                title: title.to_string(),
                line_index: idx,
            });
        }
        headers.push(WeekHeader {
            title: title.to_string(),
            line_index: idx,
            range,
        });
    }
    headers
}
