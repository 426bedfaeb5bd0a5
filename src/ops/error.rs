use serde::Serialize;

/// Error type for document operations.
///
/// Operations are pure: on error the input lines are untouched and no partial
/// result exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocError {
    #[error("line {index} is out of range (document has {len} lines)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("{target} is not a {expected}")]
    InvalidLineKind {
        target: String,
        expected: &'static str,
    },
    #[error("line {0} has no recognisable task prefix")]
    InvalidTaskFormat(usize),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("nothing to do: {0}")]
    EmptyOperation(String),
    #[error("cannot move line {from} into its own subtree (line {to})")]
    MoveIntoSubtree { from: usize, to: usize },
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IndexOutOfRange,
    InvalidLineKind,
    InvalidTaskFormat,
    NotFound,
    AlreadyExists,
    EmptyOperation,
    MoveIntoSubtree,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::IndexOutOfRange => "index_out_of_range",
            ErrorKind::InvalidLineKind => "invalid_line_kind",
            ErrorKind::InvalidTaskFormat => "invalid_task_format",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::EmptyOperation => "empty_operation",
            ErrorKind::MoveIntoSubtree => "move_into_subtree",
        }
    }
}

impl DocError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            DocError::InvalidLineKind { .. } => ErrorKind::InvalidLineKind,
            DocError::InvalidTaskFormat(_) => ErrorKind::InvalidTaskFormat,
            DocError::NotFound(_) => ErrorKind::NotFound,
            DocError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            DocError::EmptyOperation(_) => ErrorKind::EmptyOperation,
            DocError::MoveIntoSubtree { .. } => ErrorKind::MoveIntoSubtree,
        }
    }

    /// "Nothing to do" rather than a failure
    pub fn is_soft(&self) -> bool {
        matches!(self, DocError::EmptyOperation(_))
    }

    pub(crate) fn not_a_task(index: usize) -> Self {
        DocError::InvalidLineKind {
            target: format!("line {}", index),
            expected: "task line",
        }
    }
}

/// Bounds-check `index` against `lines`
pub fn check_index(lines: &[String], index: usize) -> Result<(), DocError> {
    if index >= lines.len() {
        return Err(DocError::IndexOutOfRange {
            index,
            len: lines.len(),
        });
    }
    Ok(())
}
