//! Filesystem blob storage.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

use super::BlobStore;

/// Writes blobs as files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
    base_url: Option<String>,
}

impl DirectoryBlobStore {
    /// Use `root` for storage, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            base_url: None,
        })
    }

    /// Return `{base_url}/{key}` references instead of file paths.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !clean {
            return Err(Error::Storage(format!("invalid blob key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for DirectoryBlobStore {
    fn put_image(&self, key: &str, data: &[u8], format: &str) -> Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        log::debug!("stored image/{} blob {} ({} bytes)", format, key, data.len());

        Ok(match &self.base_url {
            Some(base) => format!("{}/{}", base, key),
            None => path.to_string_lossy().into_owned(),
        })
    }
}
