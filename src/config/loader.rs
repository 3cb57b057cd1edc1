use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    collection::VariableEntry,
    executor::DEFAULT_REQUEST_TIMEOUT,
    script::{DEFAULT_MEMORY_LIMIT, DEFAULT_SCRIPT_TIMEOUT},
};

pub const CONFIG_FILE_NAME: &str = "pmrun.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(rename = "requestTimeoutMs")]
    pub request_timeout_ms: u64,
    #[serde(rename = "scriptTimeoutMs")]
    pub script_timeout_ms: u64,
    #[serde(rename = "scriptMemoryLimit")]
    pub script_memory_limit: usize,
    /// Lowest-priority variables, consulted after every collection scope.
    pub variables: HashMap<String, String>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            script_timeout_ms: DEFAULT_SCRIPT_TIMEOUT.as_millis() as u64,
            script_memory_limit: DEFAULT_MEMORY_LIMIT,
            variables: HashMap::new(),
            extras: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    /// Config variables as entries, sorted by key for a stable order.
    pub fn variable_entries(&self) -> Vec<VariableEntry> {
        let mut entries: Vec<VariableEntry> = self
            .variables
            .iter()
            .map(|(key, value)| VariableEntry::new(key.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub path: PathBuf,
    pub dir: PathBuf,
}

/// Loads `pmrun.json` from `target` (a directory or the file itself).
/// Returns `None` when there is no such file.
pub fn load_config(target: &Path) -> Result<Option<LoadedConfig>> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        std::env::current_dir()?.join(target)
    };

    let (file_path, dir) = if resolved.is_dir() {
        (resolved.join(CONFIG_FILE_NAME), resolved)
    } else {
        let dir = match resolved.parent() {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir()?,
        };
        (resolved.clone(), dir)
    };

    if !file_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&file_path)
        .with_context(|| format!("reading config {}", file_path.display()))?;

    let config: EngineConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", file_path.display()))?;

    Ok(Some(LoadedConfig {
        config,
        path: file_path,
        dir,
    }))
}
