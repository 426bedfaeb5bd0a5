use std::ops::Range;

use crate::ops::error::{DocError, check_index};
use crate::parse::line;
use crate::parse::tree_builder::{pool_window, week_body_end};

/// Where `insert_task` puts a new root task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertAnchor {
    /// Under the pool category `### name`
    Project(String),
    /// At the end of the week block whose header is on this line
    Week(usize),
}

/// Where `move_subtree` puts the moved lines, relative to the destination task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovePosition {
    /// Just before the destination, at its indentation
    #[default]
    Before,
    /// Just after the destination's subtree, at its indentation
    After,
    /// As the destination's last child, one level deeper
    Inside,
}

// ---------------------------------------------------------------------------
// Subtree lookup
// ---------------------------------------------------------------------------

/// Lines making up the task at `index` and its descendants: the task line
/// plus every following line indented deeper, stopping at a blank line or
/// block boundary.
pub fn subtree_range(lines: &[String], index: usize) -> Result<Range<usize>, DocError> {
    check_index(lines, index)?;
    if !line::is_task_line(&lines[index]) {
        return Err(DocError::not_a_task(index));
    }
    let base = line::leading_width(&lines[index]);
    let mut end = index + 1;
    while end < lines.len() {
        let text = &lines[end];
        if line::is_blank(text) || line::is_block_boundary(text) || line::leading_width(text) <= base
        {
            break;
        }
        end += 1;
    }
    Ok(index..end)
}

// ---------------------------------------------------------------------------
// Single-line edits
// ---------------------------------------------------------------------------

/// Flip the checkbox of the task at `index`
pub fn toggle(lines: &[String], index: usize) -> Result<Vec<String>, DocError> {
    check_index(lines, index)?;
    let current = &lines[index];
    let completed = line::checkbox_state(current).ok_or_else(|| DocError::not_a_task(index))?;
    let flipped =
        line::with_checkbox(current, !completed).ok_or_else(|| DocError::not_a_task(index))?;

    let mut out = lines.to_vec();
    out[index] = flipped;
    Ok(out)
}

/// Replace the text of the task at `index`, keeping its indentation and
/// checkbox exactly as they are
pub fn edit_content(lines: &[String], index: usize, text: &str) -> Result<Vec<String>, DocError> {
    check_index(lines, index)?;
    let current = &lines[index];
    if !line::is_task_line(current) {
        return Err(DocError::not_a_task(index));
    }
    let prefix = line::task_prefix(current).ok_or(DocError::InvalidTaskFormat(index))?;
    let edited = format!("{}{}", prefix, single_line(text));

    let mut out = lines.to_vec();
    out[index] = edited;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Insertion
// ---------------------------------------------------------------------------

/// Task text as one line: each line break becomes a single space, so a task
/// never spills onto the lines after it
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn pending_line(indent: usize, text: &str) -> String {
    format!("{}{} {}", " ".repeat(indent), line::PENDING_MARKER, single_line(text))
}

/// Add a pending root task under a pool category or at the end of a week
/// block.
///
/// A category holding only the placeholder has it replaced by the task.
/// Otherwise the task goes after the last non-blank line of the section so
/// the blank line before the next header stays in place.
pub fn insert_task(
    lines: &[String],
    anchor: &InsertAnchor,
    text: &str,
) -> Result<Vec<String>, DocError> {
    let (header, end) = match anchor {
        InsertAnchor::Project(name) => {
            let header = find_project_header(lines, name)?;
            let end = (header + 1..lines.len())
                .find(|&i| line::is_block_boundary(&lines[i]))
                .unwrap_or(lines.len());
            (header, end)
        }
        InsertAnchor::Week(index) => {
            check_index(lines, *index)?;
            if !line::is_week_header(&lines[*index]) {
                return Err(DocError::InvalidLineKind {
                    target: format!("line {}", index),
                    expected: "week header",
                });
            }
            (*index, week_body_end(lines, *index))
        }
    };

    let new_line = pending_line(0, text);
    let mut out = lines.to_vec();

    if let Some(first) = (header + 1..end).find(|&i| !line::is_blank(&lines[i]))
        && line::is_placeholder(&lines[first])
    {
        out[first] = new_line;
        return Ok(out);
    }

    let at = body_insert_point(lines, header, end);
    if lines.get(at).is_none_or(|l| !line::is_blank(l)) {
        out.splice(at..at, [new_line, String::new()]);
    } else {
        out.insert(at, new_line);
    }
    Ok(out)
}

/// Index just past the last non-blank line of a section body, keeping one
/// blank line after the header
fn body_insert_point(lines: &[String], header: usize, end: usize) -> usize {
    let min = if lines.get(header + 1).is_some_and(|l| line::is_blank(l)) {
        header + 2
    } else {
        header + 1
    };
    let mut at = end;
    while at > min && line::is_blank(&lines[at - 1]) {
        at -= 1;
    }
    at.max(min.min(end))
}

/// Line of the `### name` header inside the pool
pub fn find_project_header(lines: &[String], name: &str) -> Result<usize, DocError> {
    let window = pool_window(lines).ok_or_else(|| DocError::NotFound("pool".to_string()))?;
    window
        .into_iter()
        .find(|&i| line::project_name(&lines[i]) == Some(name))
        .ok_or_else(|| DocError::NotFound(format!("category '{}'", name)))
}

/// Add a pending child task after the last existing child of `parent`.
///
/// Blank lines between children are skipped while looking for the last one;
/// the new line is placed right after it, never after a trailing blank.
pub fn insert_subtask(lines: &[String], parent: usize, text: &str) -> Result<Vec<String>, DocError> {
    check_index(lines, parent)?;
    let parent_line = &lines[parent];
    if !line::is_task_line(parent_line) {
        return Err(DocError::not_a_task(parent));
    }
    let parent_width = line::leading_width(parent_line);

    let mut at = parent + 1;
    for (i, text) in lines.iter().enumerate().skip(parent + 1) {
        if line::is_blank(text) {
            continue;
        }
        if line::is_block_boundary(text) || line::leading_width(text) <= parent_width {
            break;
        }
        at = i + 1;
    }

    let mut out = lines.to_vec();
    out.insert(at, pending_line(parent_width + line::INDENT_WIDTH, text));
    Ok(out)
}

// ---------------------------------------------------------------------------
// Removal and moves
// ---------------------------------------------------------------------------

/// Remove the task at `index` together with its descendants
pub fn delete_subtree(lines: &[String], index: usize) -> Result<Vec<String>, DocError> {
    let range = subtree_range(lines, index)?;
    let mut out = lines.to_vec();
    out.drain(range);
    Ok(out)
}

/// Move the task at `from` with its descendants next to the task at `to`.
///
/// The moved root takes the destination's indentation (one level deeper for
/// `Inside`); lines below it keep their indentation relative to the root.
/// A destination within the moved subtree is rejected.
pub fn move_subtree(
    lines: &[String],
    from: usize,
    to: usize,
    position: MovePosition,
) -> Result<Vec<String>, DocError> {
    let range = subtree_range(lines, from)?;
    check_index(lines, to)?;
    if range.contains(&to) {
        return Err(DocError::MoveIntoSubtree { from, to });
    }
    if !line::is_task_line(&lines[to]) {
        return Err(DocError::not_a_task(to));
    }

    let base = line::leading_width(&lines[from]);
    let moved: Vec<String> = lines[range.clone()].to_vec();

    let mut out = lines.to_vec();
    out.drain(range.clone());
    let dest = if to > from { to - range.len() } else { to };

    let dest_width = line::leading_width(&out[dest]);
    let (at, width) = match position {
        MovePosition::Before => (dest, dest_width),
        MovePosition::After => (subtree_range(&out, dest)?.end, dest_width),
        MovePosition::Inside => (
            subtree_range(&out, dest)?.end,
            dest_width + line::INDENT_WIDTH,
        ),
    };

    let reindented = moved.iter().map(|l| {
        let relative = line::leading_width(l).saturating_sub(base);
        line::reindent(l, width + relative)
    });
    out.splice(at..at, reindented);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(String::from).collect()
    }

    fn text(lines: &[String]) -> String {
        lines.join("\n")
    }

    const POOL: &str = "# 2026 TODO

## 待办池

### Work

- [ ] A
    - [ ] A1
- [x] B

### Home

（暂无未完成任务）

---
";

    // --- toggle ---

    #[test]
    fn test_toggle_flips_checkbox() {
        let doc = lines(POOL);
        let out = toggle(&doc, 6).unwrap();
        assert_eq!(out[6], "- [x] A");
        let out = toggle(&doc, 7).unwrap();
        assert_eq!(out[7], "    - [x] A1");
        let out = toggle(&doc, 8).unwrap();
        assert_eq!(out[8], "- [ ] B");
    }

    #[test]
    fn test_toggle_is_an_involution() {
        let doc = lines(POOL);
        for i in [6, 7, 8] {
            let twice = toggle(&toggle(&doc, i).unwrap(), i).unwrap();
            assert_eq!(twice, doc);
        }
    }

    #[test]
    fn test_toggle_rejects_bad_targets() {
        let doc = lines(POOL);
        assert_eq!(
            toggle(&doc, 4),
            Err(DocError::InvalidLineKind {
                target: "line 4".into(),
                expected: "task line"
            })
        );
        assert_eq!(
            toggle(&doc, 99),
            Err(DocError::IndexOutOfRange {
                index: 99,
                len: doc.len()
            })
        );
    }

    // --- edit ---

    #[test]
    fn test_edit_keeps_prefix() {
        let doc = lines(POOL);
        let out = edit_content(&doc, 7, "  rewritten  ").unwrap();
        assert_eq!(out[7], "    - [ ] rewritten");
        let out = edit_content(&doc, 8, "done thing").unwrap();
        assert_eq!(out[8], "- [x] done thing");
    }

    #[test]
    fn test_edit_with_line_breaks_stays_on_one_line() {
        let doc = lines(POOL);
        let out = edit_content(&doc, 8, "first\nsecond\r\n third").unwrap();
        assert_eq!(out.len(), doc.len());
        assert_eq!(out[8], "- [x] first second third");
        assert_eq!(&out[9..], &doc[9..]);
    }

    #[test]
    fn test_edit_without_space_after_checkbox_is_invalid_format() {
        let doc = lines("- [ ]");
        assert_eq!(edit_content(&doc, 0, "x"), Err(DocError::InvalidTaskFormat(0)));
        assert!(matches!(
            edit_content(&lines("prose"), 0, "x"),
            Err(DocError::InvalidLineKind { .. })
        ));
    }

    // --- insert ---

    #[test]
    fn test_insert_task_after_last_task() {
        let doc = lines(POOL);
        let out = insert_task(&doc, &InsertAnchor::Project("Work".into()), "C").unwrap();
        assert_eq!(&out[6..10], &["- [ ] A", "    - [ ] A1", "- [x] B", "- [ ] C"]);
        assert_eq!(out[10], "");
        assert_eq!(out[11], "### Home");
    }

    #[test]
    fn test_insert_task_replaces_placeholder() {
        let doc = lines(POOL);
        let out = insert_task(&doc, &InsertAnchor::Project("Home".into()), " 买菜 ").unwrap();
        assert_eq!(out.len(), doc.len());
        assert_eq!(out[12], "- [ ] 买菜");
        assert_eq!(out[13], "");
        assert_eq!(out[14], "---");
    }

    #[test]
    fn test_insert_task_into_empty_category_keeps_blank_before_separator() {
        let doc = lines("## 待办池\n\n### New\n---");
        let out = insert_task(&doc, &InsertAnchor::Project("New".into()), "x").unwrap();
        assert_eq!(text(&out), "## 待办池\n\n### New\n- [ ] x\n\n---");
    }

    #[test]
    fn test_insert_task_unknown_category() {
        let doc = lines(POOL);
        assert_eq!(
            insert_task(&doc, &InsertAnchor::Project("Nope".into()), "x"),
            Err(DocError::NotFound("category 'Nope'".into()))
        );
    }

    #[test]
    fn test_insert_task_into_week() {
        let doc = lines("## 待办池\n---\n\n## 10月12日 - 10月18日\n\n- [x] Work\n\n---\n\n## 10月5日 - 10月11日\n");
        let out = insert_task(&doc, &InsertAnchor::Week(3), "extra").unwrap();
        assert_eq!(&out[5..8], &["- [x] Work", "- [ ] extra", ""]);

        // Last block runs to end of file
        let out = insert_task(&doc, &InsertAnchor::Week(9), "old").unwrap();
        assert_eq!(&out[9..], &["## 10月5日 - 10月11日", "", "- [ ] old", ""]);

        assert!(matches!(
            insert_task(&doc, &InsertAnchor::Week(5), "x"),
            Err(DocError::InvalidLineKind { .. })
        ));
    }

    #[test]
    fn test_insert_subtask_without_children() {
        let doc = lines("- [ ] parent\n- [ ] sibling");
        let out = insert_subtask(&doc, 0, "child").unwrap();
        assert_eq!(out, lines("- [ ] parent\n    - [ ] child\n- [ ] sibling"));
    }

    #[test]
    fn test_insert_subtask_after_existing_child() {
        let doc = lines("- [ ] parent\n    - [ ] first\n        - [x] deep\n\n### Next");
        let out = insert_subtask(&doc, 0, "second").unwrap();
        assert_eq!(
            out,
            lines("- [ ] parent\n    - [ ] first\n        - [x] deep\n    - [ ] second\n\n### Next")
        );
    }

    #[test]
    fn test_inserted_text_with_line_breaks_stays_on_one_line() {
        let doc = lines(POOL);
        let out = insert_task(&doc, &InsertAnchor::Project("Work".into()), "C\n- [ ] D").unwrap();
        assert_eq!(out.len(), doc.len() + 1);
        assert_eq!(out[9], "- [ ] C - [ ] D");
        assert_eq!(out[11], "### Home");

        let out = insert_subtask(&lines("- [ ] parent"), 0, "a\n\nb").unwrap();
        assert_eq!(out, lines("- [ ] parent\n    - [ ] a b"));
    }

    #[test]
    fn test_insert_subtask_rejects_non_task() {
        assert!(matches!(
            insert_subtask(&lines("### Work"), 0, "x"),
            Err(DocError::InvalidLineKind { .. })
        ));
    }

    // --- delete ---

    #[test]
    fn test_subtree_range_stops_at_blank_and_boundary() {
        let doc = lines("- [ ] a\n    - [ ] a1\n\n    - [ ] orphan\n- [ ] b\n    - [ ] b1\n---");
        assert_eq!(subtree_range(&doc, 0).unwrap(), 0..2);
        assert_eq!(subtree_range(&doc, 4).unwrap(), 4..6);
        assert_eq!(subtree_range(&doc, 1).unwrap(), 1..2);
    }

    #[test]
    fn test_delete_subtree() {
        let doc = lines(POOL);
        let out = delete_subtree(&doc, 6).unwrap();
        assert_eq!(&out[4..8], &["### Work", "", "- [x] B", ""]);
        assert_eq!(out.len(), doc.len() - 2);
    }

    #[test]
    fn test_delete_last_task_leaves_no_placeholder() {
        let doc = lines("### Work\n\n- [ ] only\n\n---");
        let out = delete_subtree(&doc, 2).unwrap();
        assert_eq!(out, lines("### Work\n\n\n---"));
    }

    // --- move ---

    #[test]
    fn test_move_before_reindents_to_destination() {
        let doc = lines("- [ ] a\n    - [ ] a1\n        - [ ] a1x\n- [ ] b");
        let out = move_subtree(&doc, 1, 0, MovePosition::Before).unwrap();
        assert_eq!(out, lines("- [ ] a1\n    - [ ] a1x\n- [ ] a\n- [ ] b"));
    }

    #[test]
    fn test_move_after_skips_destination_subtree() {
        let doc = lines("- [ ] a\n- [ ] b\n    - [ ] b1\n- [ ] c");
        let out = move_subtree(&doc, 0, 1, MovePosition::After).unwrap();
        assert_eq!(out, lines("- [ ] b\n    - [ ] b1\n- [ ] a\n- [ ] c"));
    }

    #[test]
    fn test_move_inside_appends_last_child() {
        let doc = lines("- [ ] a\n    - [ ] a1\n- [ ] b\n    - [ ] b1");
        let out = move_subtree(&doc, 2, 0, MovePosition::Inside).unwrap();
        assert_eq!(
            out,
            lines("- [ ] a\n    - [ ] a1\n    - [ ] b\n        - [ ] b1")
        );
    }

    #[test]
    fn test_move_forward_accounts_for_removed_lines() {
        let doc = lines("- [ ] a\n    - [ ] a1\n- [ ] b\n- [ ] c");
        let out = move_subtree(&doc, 0, 3, MovePosition::Before).unwrap();
        assert_eq!(out, lines("- [ ] b\n- [ ] a\n    - [ ] a1\n- [ ] c"));
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let doc = lines("- [ ] a\n    - [ ] a1\n        - [ ] a1x\n- [ ] b");
        for to in [0, 1, 2] {
            assert_eq!(
                move_subtree(&doc, 0, to, MovePosition::Inside),
                Err(DocError::MoveIntoSubtree { from: 0, to })
            );
        }
        assert!(move_subtree(&doc, 1, 3, MovePosition::Inside).is_ok());
    }

    #[test]
    fn test_move_to_non_task_is_rejected() {
        let doc = lines("### Work\n- [ ] a\n- [ ] b");
        assert!(matches!(
            move_subtree(&doc, 1, 0, MovePosition::Before),
            Err(DocError::InvalidLineKind { .. })
        ));
    }
}
