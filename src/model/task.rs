use serde::Serialize;

/// Settlement classification of a node, filled in bottom-up by
/// `ops::settle::mark_status`. All false until then.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleStatus {
    /// The node is completed, or something below it is
    pub has_completed_descendants: bool,
    /// Some descendant (not the node itself) is still pending
    pub has_incomplete_descendants: bool,
    /// Goes into the week block
    pub should_archive: bool,
    /// Leaves the pool entirely
    pub should_delete: bool,
}

/// A checklist line and everything nested under it.
///
/// Nodes are rebuilt from the document on every read. `line_index` is the
/// node's only identity and is stale as soon as the line array changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNode {
    /// Position of the task line in the document (0-indexed)
    pub line_index: usize,
    /// Task text without the checkbox prefix
    pub content: String,
    /// `- [x]` vs `- [ ]`
    pub completed: bool,
    /// Leading whitespace / 4, rounded down
    #[serde(rename = "indent")]
    pub indent_level: usize,
    /// Direct children in line order
    pub children: Vec<TaskNode>,

    /// The original line, for verbatim re-emission
    #[serde(skip)]
    pub source_line: String,
    #[serde(skip)]
    pub status: SettleStatus,
}

impl TaskNode {
    pub fn new(
        line_index: usize,
        source_line: String,
        content: String,
        completed: bool,
        indent_level: usize,
    ) -> Self {
        TaskNode {
            line_index,
            content,
            completed,
            indent_level,
            children: Vec::new(),
            source_line,
            status: SettleStatus::default(),
        }
    }

    /// Number of task nodes in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(TaskNode::subtree_len).sum::<usize>()
    }

    /// Pre-order visit of this node and all descendants
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a TaskNode)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

impl PartialEq for TaskNode {
    fn eq(&self, other: &Self) -> bool {
        self.line_index == other.line_index
            && self.content == other.content
            && self.completed == other.completed
            && self.indent_level == other.indent_level
            && self.children == other.children
    }
}

impl Eq for TaskNode {}
