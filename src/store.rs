use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;
use tracing::{debug, warn};

use crate::error::ExplorerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub source: String,
    pub cached_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl CacheMetadata {
    pub fn unknown(source: &str) -> Self {
        Self {
            source: source.to_string(),
            cached_at: None,
            diagnostic: None,
        }
    }
}

// Writes land in a sibling temp file and are renamed over the target.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: Utf8PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path(&self, key: &str) -> Result<Utf8PathBuf, ExplorerError> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
        {
            return Err(ExplorerError::Filesystem(format!(
                "invalid cache key: {key}"
            )));
        }
        Ok(self.root.join(key))
    }

    pub fn ensure_root(&self) -> Result<(), ExplorerError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| ExplorerError::Filesystem(err.to_string()))
    }

    pub fn read(&self, key: &str) -> Result<Vec<u8>, ExplorerError> {
        let path = self.path(key)?;
        match fs::read(path.as_std_path()) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(ExplorerError::Filesystem(format!("read {path}: {err}"))),
        }
    }

    pub fn write(&self, key: &str, content: &[u8]) -> Result<(), ExplorerError> {
        let path = self.path(key)?;
        self.ensure_root()?;
        let mut temp = Builder::new()
            .prefix(&format!(".{key}"))
            .suffix(".tmp")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| ExplorerError::Filesystem(format!("replace {path}: {}", err.error)))?;
        debug!(%path, bytes = content.len(), "cache entry written");
        Ok(())
    }

    pub fn write_metadata(&self, key: &str, metadata: &CacheMetadata) -> Result<(), ExplorerError> {
        let persisted = CacheMetadata {
            diagnostic: None,
            ..metadata.clone()
        };
        let content = serde_json::to_vec_pretty(&persisted)
            .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
        self.write(key, &content)
    }

    pub fn read_metadata(&self, key: &str, default_source: &str) -> CacheMetadata {
        let content = match self.read(key) {
            Ok(content) if !content.is_empty() => content,
            Ok(_) => return CacheMetadata::unknown(default_source),
            Err(err) => {
                warn!(key, error = %err, "cache metadata unreadable");
                return CacheMetadata::unknown(default_source);
            }
        };
        match serde_json::from_slice::<CacheMetadata>(&content) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(key, error = %err, "cache metadata unparsable");
                CacheMetadata::unknown(default_source)
            }
        }
    }
}
