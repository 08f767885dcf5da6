//! In-memory file store backing `EditFile` actions.

use loopwright_core::error::RuntimeFault;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Path → content map shared between runs.
///
/// Cloning is cheap and every clone sees the same files.
#[derive(Clone, Default)]
pub struct FileStore {
    files: Arc<RwLock<HashMap<String, String>>>,
    max_files: Option<usize>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses new paths once it holds `max_files` of them.
    /// Overwriting an existing path is always allowed.
    pub fn with_capacity_limit(max_files: usize) -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            max_files: Some(max_files),
        }
    }

    pub fn max_files(&self) -> Option<usize> {
        self.max_files
    }

    /// Record `content` under `path`, replacing any previous content.
    pub async fn write(&self, path: &str, content: &str) -> Result<(), RuntimeFault> {
        let mut files = self.files.write().await;
        if let Some(max) = self.max_files {
            if !files.contains_key(path) && files.len() >= max {
                return Err(RuntimeFault::ResourceExhausted(format!(
                    "File store is full ({max} files), cannot create {path}"
                )));
            }
        }
        files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    pub async fn read(&self, path: &str) -> Option<String> {
        self.files.read().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Stored paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}
