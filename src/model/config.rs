use serde::{Deserialize, Serialize};

/// Configuration from todo.toml. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Relative to the directory holding todo.toml
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Relative to data_dir; holds the documents used without --user
    #[serde(default = "default_demo_dir")]
    pub demo_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_dir: default_data_dir(),
            demo_dir: default_demo_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_prune_days")]
    pub prune_days: i64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            enabled: true,
            prune_days: default_prune_days(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_demo_dir() -> String {
    "demo".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_prune_days() -> i64 {
    30
}
