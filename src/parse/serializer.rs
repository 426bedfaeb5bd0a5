use crate::model::TaskNode;
use crate::parse::line;

/// Emit task nodes in pre-order using their original lines
pub fn render_tasks(nodes: &[TaskNode]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        node.walk(&mut |n| out.push(n.source_line.clone()));
    }
    out
}

/// Emit a category section: header, blank, tasks (or the placeholder), blank
pub fn render_project(name: &str, body: &[String]) -> Vec<String> {
    let mut out = vec![format!("{}{}", line::PROJECT_PREFIX, name), String::new()];
    if body.is_empty() {
        out.push(line::PLACEHOLDER.to_string());
    } else {
        out.extend(body.iter().cloned());
    }
    out.push(String::new());
    out
}
