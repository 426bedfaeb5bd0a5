use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use weekpool::model::{Document, TaskNode};
use weekpool::ops::edit_ops::toggle;
use weekpool::parse::line::is_task_line;
use weekpool::parse::{parse_document, render_tasks};

fn load_fixture(fixture_name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(fixture_name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Could not read fixture {}: {}", fixture_name, e))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

/// Helper: the text survives a split/join byte for byte, and every parsed
/// tree renders back to exactly the lines it was built from
fn assert_round_trip(fixture_name: &str) {
    let source = load_fixture(fixture_name);
    let doc = Document::from_text(&source);
    assert_eq!(
        doc.to_text(),
        source,
        "Round-trip failed for fixture: {}",
        fixture_name
    );

    let parsed = parse_document(&doc.lines, today());
    let trees = parsed
        .pool
        .iter()
        .map(|g| &g.tasks)
        .chain(parsed.weeks.iter().map(|w| &w.tasks));
    for roots in trees {
        let mut original = Vec::new();
        for root in roots {
            root.walk(&mut |n| original.push(doc.lines[n.line_index].clone()));
        }
        assert_eq!(
            render_tasks(roots),
            original,
            "Tree render differs for fixture: {}",
            fixture_name
        );
    }
}

fn assert_tree_shape(node: &TaskNode) {
    let mut expected = node.line_index + 1;
    for child in &node.children {
        assert_eq!(child.indent_level, node.indent_level + 1);
        assert_eq!(child.line_index, expected);
        expected += child.subtree_len();
        assert_tree_shape(child);
    }
}

// ============================================================================
// Round-trip tests
// ============================================================================

#[test]
fn round_trip_new_year() {
    assert_round_trip("new_year.md");
}

#[test]
fn round_trip_typical_year() {
    assert_round_trip("typical_year.md");
}

#[test]
fn round_trip_messy_document() {
    assert_round_trip("messy.md");
}

#[test]
fn round_trip_crlf_document() {
    assert_round_trip("crlf.md");
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn typical_year_structure() {
    let doc = Document::from_text(&load_fixture("typical_year.md"));
    let parsed = parse_document(&doc.lines, today());

    let names: Vec<&str> = parsed.pool.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Work", "Home"]);
    assert_eq!(parsed.pool[0].tasks.len(), 2);
    assert!(parsed.pool[1].is_empty);

    let titles: Vec<&str> = parsed.weeks.iter().map(|w| w.header.title.as_str()).collect();
    assert_eq!(titles, vec!["10月12日 - 10月18日", "10月5日 - 10月11日"]);
    assert!(parsed.weeks[0].is_current);
    assert!(!parsed.weeks[1].is_current);
    assert!(parsed.warnings.is_empty());

    for group in &parsed.pool {
        group.tasks.iter().for_each(assert_tree_shape);
    }
    for week in &parsed.weeks {
        week.tasks.iter().for_each(assert_tree_shape);
    }
}

#[test]
fn messy_document_is_parsed_leniently() {
    let doc = Document::from_text(&load_fixture("messy.md"));
    let parsed = parse_document(&doc.lines, today());

    let names: Vec<&str> = parsed.pool.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["", "Work"]);
    // The second "### Work" is merged into the first
    assert_eq!(parsed.pool[1].tasks.len(), 2);
    assert_eq!(parsed.weeks.len(), 2);
    assert!(parsed.weeks[0].header.range.is_none());
    assert_eq!(parsed.warnings.len(), 2);
}

// ============================================================================
// Toggle involution
// ============================================================================

#[test]
fn toggle_twice_is_identity_for_every_task_line() {
    for fixture in ["typical_year.md", "messy.md", "crlf.md"] {
        let doc = Document::from_text(&load_fixture(fixture));
        for (idx, text) in doc.lines.iter().enumerate() {
            if !is_task_line(text) {
                continue;
            }
            let once = toggle(&doc.lines, idx).unwrap();
            assert_ne!(once, doc.lines);
            let twice = toggle(&once, idx).unwrap();
            assert_eq!(twice, doc.lines, "{} line {}", fixture, idx);
        }
    }
}
