use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::io::journal::{Journal, JournalEntry};
use crate::io::lock::{FileLock, LockError};
use crate::model::{AppConfig, Document};
use crate::ops::DocError;

/// Error type for document storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not a td workspace: no todo.toml found (run `td init`)")]
    NotAWorkspace,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse todo.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Doc(#[from] DocError),
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Keep `[A-Za-z0-9._@-]`, replace everything else with `_`. Names that end
/// up empty or made only of dots are refused.
pub fn sanitize_user(name: &str) -> Result<String, DocError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(DocError::NotFound(format!("user '{}'", name)));
    }
    Ok(cleaned)
}

/// `2026-todo.md` → 2026
fn year_of(file_name: &str) -> Option<i32> {
    let digits = file_name.strip_suffix("-todo.md")?;
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Maps (user, year) to a Markdown file and moves whole documents in and out
/// of it.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    data_dir: PathBuf,
    demo_dir: PathBuf,
    lock_timeout: Duration,
    journal: Journal,
}

impl DocumentStore {
    pub fn new(root: &Path, config: &AppConfig) -> Self {
        let data_dir = root.join(&config.store.data_dir);
        DocumentStore {
            demo_dir: data_dir.join(&config.store.demo_dir),
            lock_timeout: Duration::from_millis(config.lock.timeout_ms),
            journal: Journal::new(&data_dir, &config.journal),
            data_dir,
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Directory holding one user's documents, or the demo documents
    pub fn document_dir(&self, user: Option<&str>) -> Result<PathBuf, StoreError> {
        match user {
            Some(name) => Ok(self.data_dir.join("users").join(sanitize_user(name)?)),
            None => Ok(self.demo_dir.clone()),
        }
    }

    pub fn document_path(&self, user: Option<&str>, year: i32) -> Result<PathBuf, StoreError> {
        Ok(self
            .document_dir(user)?
            .join(format!("{}-todo.md", year)))
    }

    /// Years with a document, newest first
    pub fn list_years(&self, user: Option<&str>) -> Result<Vec<i32>, StoreError> {
        let dir = self.document_dir(user)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::ReadError {
            path: dir.clone(),
            source: e,
        })?;
        let mut years = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(year) = entry.file_name().to_str().and_then(year_of) {
                years.push(year);
            }
        }
        years.sort_unstable_by(|a, b| b.cmp(a));
        Ok(years)
    }

    pub fn exists(&self, user: Option<&str>, year: i32) -> Result<bool, StoreError> {
        Ok(self.document_path(user, year)?.is_file())
    }

    /// Read a document, creating it from the template if it doesn't exist
    pub fn load(&self, user: Option<&str>, year: i32) -> Result<Document, StoreError> {
        let path = self.document_path(user, year)?;
        if !path.exists() {
            let text = Document::template(year);
            self.write_text(&path, &text)?;
            return Ok(Document::from_text(&text));
        }
        let text = fs::read_to_string(&path).map_err(|e| StoreError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        Ok(Document::from_text(&text))
    }

    /// Overwrite a document atomically. If that fails the unsaved content is
    /// journaled before the error is returned.
    pub fn save(&self, user: Option<&str>, year: i32, doc: &Document) -> Result<(), StoreError> {
        let path = self.document_path(user, year)?;
        self.write_text(&path, &doc.to_text())
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<(), StoreError> {
        let result = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| atomic_write(path, text.as_bytes()));
        if let Err(e) = result {
            self.journal
                .append(JournalEntry::failed_write(path, &e, text));
            return Err(StoreError::WriteError {
                path: path.to_path_buf(),
                source: e,
            });
        }
        Ok(())
    }

    /// Lock a document for writing
    pub fn lock(&self, user: Option<&str>, year: i32) -> Result<FileLock, StoreError> {
        let path = self.document_path(user, year)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(FileLock::acquire(&path, self.lock_timeout)?)
    }

    /// Run one transform on a document under its write lock.
    ///
    /// The transform gets the current lines and returns the new lines plus a
    /// value for the caller. The document is saved only if the lines changed.
    /// A transform error leaves the file untouched.
    pub fn with_document<T, F>(&self, user: Option<&str>, year: i32, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&[String]) -> Result<(Vec<String>, T), DocError>,
    {
        let _lock = self.lock(user, year)?;
        let doc = self.load(user, year)?;
        let (lines, value) = f(&doc.lines)?;
        if lines != doc.lines {
            self.save(user, year, &Document::from_lines(lines))?;
        }
        Ok(value)
    }

    /// Replace a whole document with `text`
    pub fn replace(&self, user: Option<&str>, year: i32, text: &str) -> Result<(), StoreError> {
        let _lock = self.lock(user, year)?;
        self.save(user, year, &Document::from_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> DocumentStore {
        DocumentStore::new(tmp.path(), &AppConfig::default())
    }

    #[test]
    fn test_sanitize_user() {
        assert_eq!(sanitize_user("alice@example.com").unwrap(), "alice@example.com");
        assert_eq!(sanitize_user("bob/../x").unwrap(), "bob_.._x");
        assert_eq!(sanitize_user("张三").unwrap(), "__");
        assert!(sanitize_user("..").is_err());
        assert!(sanitize_user("  ").is_err());
    }

    #[test]
    fn test_document_paths() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        assert_eq!(
            store.document_path(Some("alice"), 2026).unwrap(),
            tmp.path().join("data/users/alice/2026-todo.md")
        );
        assert_eq!(
            store.document_path(None, 2025).unwrap(),
            tmp.path().join("data/demo/2025-todo.md")
        );
        assert!(matches!(
            store.document_path(Some("."), 2026),
            Err(StoreError::Doc(DocError::NotFound(_)))
        ));
    }

    #[test]
    fn test_load_creates_template() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let doc = store.load(Some("alice"), 2026).unwrap();
        assert_eq!(doc.to_text(), "# 2026 TODO\n\n## 待办池\n\n---\n");

        let on_disk = fs::read_to_string(store.document_path(Some("alice"), 2026).unwrap()).unwrap();
        assert_eq!(on_disk, doc.to_text());
    }

    #[test]
    fn test_list_years_descending() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        for year in [2024, 2026, 2025] {
            store.load(Some("alice"), year).unwrap();
        }
        let dir = store.document_dir(Some("alice")).unwrap();
        fs::write(dir.join("notes.md"), "").unwrap();
        fs::write(dir.join("26-todo.md"), "").unwrap();

        assert_eq!(store.list_years(Some("alice")).unwrap(), vec![2026, 2025, 2024]);
        assert!(store.list_years(Some("nobody")).unwrap().is_empty());
    }

    #[test]
    fn test_with_document_saves_changes() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let count = store
            .with_document(None, 2026, |lines| {
                let mut out = lines.to_vec();
                out.insert(3, "- [ ] new".to_string());
                Ok((out, 1))
            })
            .unwrap();
        assert_eq!(count, 1);
        let doc = store.load(None, 2026).unwrap();
        assert_eq!(doc.lines[3], "- [ ] new");
    }

    #[test]
    fn test_with_document_error_leaves_file() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.load(None, 2026).unwrap();
        let err = store
            .with_document(None, 2026, |_| -> Result<(Vec<String>, ()), DocError> {
                Err(DocError::EmptyOperation("nothing".into()))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Doc(DocError::EmptyOperation(_))));
        assert_eq!(
            store.load(None, 2026).unwrap().to_text(),
            Document::template(2026)
        );
    }

    #[test]
    fn test_replace() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.replace(Some("bob"), 2026, "# custom\n").unwrap();
        assert_eq!(store.load(Some("bob"), 2026).unwrap().to_text(), "# custom\n");
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.md");
        atomic_write(&path, b"hello").unwrap();
        atomic_write(&path, b"bye").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "bye");
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of("2026-todo.md"), Some(2026));
        assert_eq!(year_of("2026-todo.md.bak"), None);
        assert_eq!(year_of("abcd-todo.md"), None);
    }
}
