use std::fs;
use std::path::{Path, PathBuf};

use crate::io::store::StoreError;
use crate::model::AppConfig;

pub const CONFIG_FILE: &str = "todo.toml";

/// Written by `td init`. Every key is optional.
pub const CONFIG_TEMPLATE: &str = r#"# td workspace configuration

[store]
# Where TODO documents live, relative to this file
data_dir = "data"
# Documents used when no --user is given, relative to data_dir
demo_dir = "demo"

[lock]
# How long a write waits for another td process to finish
timeout_ms = 5000

[journal]
# Record deleted, settled and unsaved content in <data_dir>/.journal.log
enabled = true
# Age in days after which `td journal prune` removes entries
prune_days = 30
"#;

/// Find the workspace root by walking up from `start`, looking for todo.toml
pub fn discover_root(start: &Path) -> Result<PathBuf, StoreError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(StoreError::NotAWorkspace);
        }
    }
}

pub fn read_config(root: &Path) -> Result<AppConfig, StoreError> {
    let path = root.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| StoreError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Write the commented template unless a config is already there.
/// Returns whether a file was written.
pub fn write_template(root: &Path) -> Result<bool, StoreError> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, CONFIG_TEMPLATE)?;
    Ok(true)
}
