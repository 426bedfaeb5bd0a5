//! Weekly settlement.
//!
//! Completed work leaves the pool and is archived into the week block that
//! contains today. Pending work stays in the pool. A task that is completed
//! but still has pending descendants stays too (reset to pending) and is also
//! archived, so the finished part of it shows up in the week.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::model::{ParseWarning, TaskNode};
use crate::ops::error::DocError;
use crate::ops::week_ops::{merge_into_week, resolve_week};
use crate::parse::line;
use crate::parse::serializer::render_project;
use crate::parse::tree_builder::{TaskForest, build_forest, pool_window};

/// Everything a settlement produced
#[derive(Debug, Clone)]
pub struct SettleOutcome {
    pub lines: Vec<String>,
    /// Root tasks that were archived
    pub settled_count: usize,
    pub week_title: String,
    /// Titles of week blocks created on the way, newest first
    pub created_weeks: Vec<String>,
    /// Archived lines per category, as written into the week
    pub archived: IndexMap<String, Vec<String>>,
    pub warnings: Vec<ParseWarning>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Fill in `node.status` for the whole subtree, children first
pub fn mark_status(node: &mut TaskNode) {
    let mut completed_below = false;
    let mut pending_below = false;
    for child in node.children.iter_mut() {
        mark_status(child);
        completed_below |= child.completed || child.status.has_completed_descendants;
        pending_below |= !child.completed || child.status.has_incomplete_descendants;
    }

    let status = &mut node.status;
    status.has_completed_descendants = node.completed || completed_below;
    status.has_incomplete_descendants = pending_below;
    status.should_archive = status.has_completed_descendants;
    status.should_delete = node.completed && !pending_below;
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Lines this subtree contributes to the week block, `base` levels deep.
/// Every emitted line is marked completed; purely pending branches are left
/// out.
pub fn render_archive(node: &TaskNode, base: usize) -> Vec<String> {
    let mut out = Vec::new();
    push_archive(node, base, &mut out);
    out
}

fn push_archive(node: &TaskNode, base: usize, out: &mut Vec<String>) {
    if !node.status.should_archive {
        return;
    }
    let trimmed = node.source_line.trim();
    let text = line::with_checkbox(trimmed, true).unwrap_or_else(|| trimmed.to_string());
    out.push(line::reindent(&text, base * line::INDENT_WIDTH));
    for child in &node.children {
        if child.completed || child.status.has_completed_descendants {
            push_archive(child, base + 1, out);
        }
    }
}

/// Lines this subtree keeps in the pool, in their original indentation and
/// all marked pending. Fully completed branches are dropped.
pub fn render_retain(node: &TaskNode) -> Vec<String> {
    let mut out = Vec::new();
    push_retain(node, &mut out);
    out
}

fn push_retain(node: &TaskNode, out: &mut Vec<String>) {
    if node.status.should_delete {
        return;
    }
    let text = line::with_checkbox(&node.source_line, false)
        .unwrap_or_else(|| node.source_line.clone());
    out.push(text);
    for child in &node.children {
        push_retain(child, out);
    }
}

/// A fresh pool section from classified trees: header, uncategorised tasks,
/// then every category with its retained tasks or the placeholder
pub fn rebuild_pool(forest: &TaskForest) -> Vec<String> {
    let mut out = vec![line::POOL_HEADER.to_string(), String::new()];
    for (name, roots) in forest {
        let retained: Vec<String> = roots.iter().flat_map(render_retain).collect();
        if name.is_empty() {
            if !retained.is_empty() {
                out.extend(retained);
                out.push(String::new());
            }
        } else {
            out.extend(render_project(name, &retained));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Archive completed pool work into the week containing `today`.
///
/// The pool is rewritten first, then the target week is found or created,
/// then the archived lines are merged into it. Fails with `EmptyOperation`
/// (and changes nothing) when there is nothing to archive.
pub fn settle_week(lines: &[String], today: NaiveDate) -> Result<SettleOutcome, DocError> {
    let window = pool_window(lines).ok_or_else(|| DocError::NotFound("pool".to_string()))?;
    let pool_header = window.start - 1;
    let pool_end = window.end;

    let mut forest = build_forest(lines, window, true, "");
    if forest.is_empty() {
        return Err(DocError::EmptyOperation("the pool is empty".to_string()));
    }

    let mut settled_count = 0;
    for roots in forest.values_mut() {
        for root in roots.iter_mut() {
            mark_status(root);
            if root.status.should_archive {
                settled_count += 1;
            }
        }
    }
    if settled_count == 0 {
        return Err(DocError::EmptyOperation(
            "no completed tasks to settle".to_string(),
        ));
    }

    let mut archived = IndexMap::new();
    for (name, roots) in &forest {
        let group: Vec<String> = roots.iter().flat_map(|r| render_archive(r, 0)).collect();
        if !group.is_empty() {
            archived.insert(name.clone(), group);
        }
    }

    let mut rewritten = lines[..pool_header].to_vec();
    rewritten.extend(rebuild_pool(&forest));
    rewritten.extend_from_slice(&lines[pool_end..]);

    let resolved = resolve_week(&rewritten, today)?;
    let merged = merge_into_week(&resolved.lines, resolved.target.header_line, &archived);

    Ok(SettleOutcome {
        lines: merged,
        settled_count,
        week_title: resolved.target.title,
        created_weeks: resolved.target.created,
        archived,
        warnings: resolved.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(String::from).collect()
    }

    fn text(lines: &[String]) -> String {
        lines.join("\n")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn classified(doc: &str) -> TaskForest {
        let doc = lines(doc);
        let mut forest = build_forest(&doc, pool_window(&doc).unwrap(), true, "");
        for root in forest.values_mut().flatten() {
            mark_status(root);
        }
        forest
    }

    #[test]
    fn test_mark_status_rules() {
        let forest = classified("## 待办池\n### P\n- [ ] a\n    - [x] a1\n- [x] b\n    - [ ] b1\n- [x] c\n    - [x] c1\n- [ ] d\n---");
        let p = &forest["P"];

        // Pending parent with a finished child: archived, kept
        assert!(p[0].status.should_archive);
        assert!(!p[0].status.should_delete);
        // Finished parent with a pending child: archived, kept
        assert!(p[1].status.should_archive);
        assert!(!p[1].status.should_delete);
        assert!(p[1].status.has_incomplete_descendants);
        // Fully finished: archived and removed
        assert!(p[2].status.should_archive);
        assert!(p[2].status.should_delete);
        // Untouched
        assert!(!p[3].status.should_archive);
        assert!(!p[3].status.should_delete);

        for root in p {
            root.walk(&mut |n| {
                if n.status.should_delete {
                    assert!(n.status.should_archive);
                }
            });
        }
    }

    #[test]
    fn test_render_archive_marks_everything_done() {
        let forest = classified("## 待办池\n### P\n- [ ] a\n    - [ ] pending\n    - [ ] mid\n        - [x] leaf\n---");
        assert_eq!(
            render_archive(&forest["P"][0], 0),
            vec!["- [x] a", "    - [x] mid", "        - [x] leaf"]
        );
        assert_eq!(
            render_archive(&forest["P"][0].children[1], 1),
            vec!["    - [x] mid", "        - [x] leaf"]
        );
    }

    #[test]
    fn test_render_retain_resets_to_pending() {
        let forest = classified("## 待办池\n### P\n- [x] a\n    - [ ] b\n    - [x] done\n---");
        assert_eq!(render_retain(&forest["P"][0]), vec!["- [ ] a", "    - [ ] b"]);
    }

    #[test]
    fn test_settle_example_scenario() {
        let doc = lines(
            "# 2026 TODO\n\n## 待办池\n\n### Work\n\n- [ ] A\n- [x] B\n    - [x] B1\n\n---\n",
        );
        let outcome = settle_week(&doc, today()).unwrap();

        assert_eq!(outcome.settled_count, 1);
        assert_eq!(outcome.week_title, "10月16日 - 10月22日");
        assert_eq!(
            text(&outcome.lines),
            "# 2026 TODO\n\n## 待办池\n\n### Work\n\n- [ ] A\n\n---\n\n## 10月16日 - 10月22日\n\n- [x] Work\n    - [x] B\n        - [x] B1\n"
        );
    }

    #[test]
    fn test_settle_merges_into_current_week() {
        let doc = lines(
            "## 待办池\n\n### Work\n\n- [x] B\n\n### Home\n\n- [x] H\n\n---\n\n## 10月12日 - 10月18日\n\n- [x] Work\n    - [x] Old\n\n---\n\n## 10月5日 - 10月11日\n",
        );
        let outcome = settle_week(&doc, today()).unwrap();
        assert_eq!(outcome.settled_count, 2);
        assert!(outcome.created_weeks.is_empty());
        assert_eq!(
            text(&outcome.lines),
            "## 待办池\n\n### Work\n\n（暂无未完成任务）\n\n### Home\n\n（暂无未完成任务）\n\n---\n\n## 10月12日 - 10月18日\n\n- [x] Work\n    - [x] Old\n    - [x] B\n\n- [x] Home\n    - [x] H\n\n---\n\n## 10月5日 - 10月11日\n"
        );
    }

    #[test]
    fn test_settle_uncategorised_tasks() {
        let doc = lines("## 待办池\n\n- [x] loose\n- [ ] keep\n\n---\n");
        let outcome = settle_week(&doc, today()).unwrap();
        assert_eq!(
            text(&outcome.lines),
            "## 待办池\n\n- [ ] keep\n\n---\n\n## 10月16日 - 10月22日\n\n- [x] loose\n"
        );
    }

    #[test]
    fn test_settle_with_nothing_completed_is_soft_noop() {
        let doc = lines("## 待办池\n\n### Work\n\n- [ ] A\n    - [ ] A1\n\n---\n");
        let err = settle_week(&doc, today()).unwrap_err();
        assert!(err.is_soft());
        assert_eq!(
            err,
            DocError::EmptyOperation("no completed tasks to settle".into())
        );

        let err = settle_week(&lines("## 待办池\n\n---\n"), today()).unwrap_err();
        assert!(err.is_soft());

        assert_eq!(
            settle_week(&lines("# no pool"), today()).unwrap_err(),
            DocError::NotFound("pool".into())
        );
    }

    #[test]
    fn test_settle_conserves_every_task() {
        let doc = lines(
            "## 待办池\n\n### P\n\n- [ ] a\n    - [x] a1\n    - [ ] a2\n- [x] b\n    - [ ] b1\n        - [x] b1x\n- [x] c\n    - [x] c1\n- [ ] d\n\n### Q\n\n- [x] q\n\n---\n",
        );
        let before: Vec<String> = doc
            .iter()
            .filter_map(|l| line::task_content(l).map(String::from))
            .collect();

        let outcome = settle_week(&doc, today()).unwrap();
        let pool_end = outcome.lines.iter().position(|l| l == "---").unwrap();
        let kept: HashSet<String> = outcome.lines[..pool_end]
            .iter()
            .filter_map(|l| line::task_content(l).map(String::from))
            .collect();
        let archived: HashSet<String> = outcome
            .archived
            .values()
            .flatten()
            .filter_map(|l| line::task_content(l).map(String::from))
            .collect();

        for task in &before {
            assert!(
                kept.contains(task) || archived.contains(task),
                "task {} vanished",
                task
            );
        }
        // Pool only holds pending lines after settlement
        assert!(outcome.lines[..pool_end].iter().all(|l| !line::is_completed_task(l)));
        // Fully finished subtrees are gone from the pool
        for gone in ["a1", "b1x", "c", "c1", "q"] {
            assert!(!kept.contains(gone), "{} should have left the pool", gone);
        }
        // Mixed ancestors appear on both sides
        for both in ["a", "b", "b1"] {
            assert!(kept.contains(both) && archived.contains(both));
        }
        assert_eq!(outcome.settled_count, 4);
    }

    #[test]
    fn test_settle_fills_week_gap() {
        let doc = lines("## 待办池\n\n### P\n\n- [x] done\n\n---\n\n## 9月28日 - 10月4日\n\n- [x] Old\n");
        let outcome = settle_week(&doc, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()).unwrap();
        assert_eq!(outcome.created_weeks.len(), 3);
        assert_eq!(outcome.week_title, "10月19日 - 10月25日");
        let header = outcome
            .lines
            .iter()
            .position(|l| l == "## 10月19日 - 10月25日")
            .unwrap();
        assert_eq!(&outcome.lines[header + 1..header + 5], &["", "- [x] P", "    - [x] done", ""]);
        assert_eq!(outcome.lines[header + 5], "---");
    }
}
