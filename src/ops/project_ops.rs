use crate::model::Document;
use crate::ops::error::DocError;
use crate::ops::settle::{mark_status, rebuild_pool};
use crate::parse::line;
use crate::parse::tree_builder::{build_forest, find_pool_header, find_separator, pool_window};

/// Add an empty `### name` category at the end of the pool
pub fn add_project(lines: &[String], name: &str) -> Result<Vec<String>, DocError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DocError::InvalidLineKind {
            target: "''".to_string(),
            expected: "category name",
        });
    }
    if lines.iter().any(|l| line::project_name(l) == Some(name)) {
        return Err(DocError::AlreadyExists(format!("category '{}'", name)));
    }

    let separator = find_pool_header(lines)
        .and_then(|header| find_separator(lines, header + 1))
        .ok_or_else(|| DocError::NotFound("pool".to_string()))?;

    let section = [
        format!("{}{}", line::PROJECT_PREFIX, name),
        String::new(),
        line::PLACEHOLDER.to_string(),
        String::new(),
    ];
    let mut out = lines.to_vec();
    out.splice(separator..separator, section);
    Ok(out)
}

/// Names of the pool categories in document order
pub fn list_projects(lines: &[String]) -> Vec<String> {
    let Some(window) = pool_window(lines) else {
        return Vec::new();
    };
    let mut names: Vec<String> = Vec::new();
    for i in window {
        if let Some(name) = line::project_name(&lines[i])
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }
    names
}

/// A new year's document carrying over the pool of `lines`.
///
/// Every category is kept. Pending tasks come along with their pending
/// descendants; finished subtrees stay behind in the old year, and completed
/// tasks that still have open work below them are reset to pending.
pub fn migrate_year(lines: &[String], year: i32) -> Result<Vec<String>, DocError> {
    let window = pool_window(lines).ok_or_else(|| DocError::NotFound("pool".to_string()))?;
    let mut forest = build_forest(lines, window, true, "");
    for root in forest.values_mut().flatten() {
        mark_status(root);
    }

    let mut out = vec![format!("# {} TODO", year), String::new()];
    out.extend(rebuild_pool(&forest));
    out.push(line::SEPARATOR.to_string());
    out.push(String::new());
    Ok(out)
}

/// True if `text` is exactly the document a new year starts with
pub fn is_untouched(text: &str, year: i32) -> bool {
    text == Document::template(year)
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

    #[test]
    fn test_add_project_before_pool_separator() {
        let doc = lines("# 2026 TODO\n\n## 待办池\n\n### Work\n\n- [ ] A\n\n---\n\n## 10月12日 - 10月18日\n");
        let out = add_project(&doc, " Home ").unwrap();
        assert_eq!(
            text(&out),
            "# 2026 TODO\n\n## 待办池\n\n### Work\n\n- [ ] A\n\n### Home\n\n（暂无未完成任务）\n\n---\n\n## 10月12日 - 10月18日\n"
        );
    }

    #[test]
    fn test_add_project_errors() {
        let doc = lines("## 待办池\n\n### Work\n\n---\n");
        assert_eq!(
            add_project(&doc, "Work"),
            Err(DocError::AlreadyExists("category 'Work'".into()))
        );
        assert_eq!(
            add_project(&lines("## 待办池\n- [ ] a"), "New"),
            Err(DocError::NotFound("pool".into()))
        );
        assert!(matches!(
            add_project(&doc, "  "),
            Err(DocError::InvalidLineKind { .. })
        ));
    }

    #[test]
    fn test_list_projects() {
        let doc = lines("## 待办池\n### A\n### B\n### A\n---\n### not pool");
        assert_eq!(list_projects(&doc), vec!["A", "B"]);
    }

    #[test]
    fn test_migrate_carries_pending_pool() {
        let doc = lines(
            "# 2026 TODO\n\n## 待办池\n\n### Work\n\n- [ ] A\n    - [x] A1\n- [x] B\n\n### Home\n\n- [x] H\n\n---\n\n## 12月21日 - 12月27日\n\n- [x] Work\n",
        );
        let out = migrate_year(&doc, 2027).unwrap();
        assert_eq!(
            text(&out),
            "# 2027 TODO\n\n## 待办池\n\n### Work\n\n- [ ] A\n\n### Home\n\n（暂无未完成任务）\n\n---\n"
        );
    }

    #[test]
    fn test_migrate_empty_pool_is_template() {
        let out = migrate_year(&lines(&Document::template(2026)), 2027).unwrap();
        assert!(is_untouched(&text(&out), 2027));
    }
}
