//! Filesystem-backed document store.
//!
//! Document names map to paths under a single root directory and may not
//! escape it.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use smol_str::SmolStr;
use tandem_editor_core::{DocumentStore, StoreError};
use tracing::{debug, info};

/// [`DocumentStore`] writing each document to a file under a root directory.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` below the root. Names may contain subdirectories but
    /// never escape the root.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.trim().is_empty() || escapes {
            return Err(StoreError::Other(smol_str::format_smolstr!(
                "invalid document name {name:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(name: &str, err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(SmolStr::new(name))
    } else {
        StoreError::Io {
            name: SmolStr::new(name),
            message: SmolStr::new(err.to_string()),
        }
    }
}

impl DocumentStore for FileDocumentStore {
    async fn save_document(&self, name: &str, payload: String) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(name, e))?;
        }
        tokio::fs::write(&path, payload.as_bytes())
            .await
            .map_err(|e| io_error(name, e))?;
        info!(target: "tandem::store", path = %path.display(), bytes = payload.len(), "wrote document");
        Ok(())
    }

    async fn load_document(&self, name: &str) -> Result<String, StoreError> {
        let path = self.path_for(name)?;
        let payload = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(name, e))?;
        debug!(target: "tandem::store", path = %path.display(), bytes = payload.len(), "read document");
        Ok(payload)
    }
}
