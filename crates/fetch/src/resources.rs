//! Bundled image resources

use crate::error::FetchError;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Named image resources shipped with the application.
///
/// Resources are looked up in memory first, then under an optional root
/// directory.
#[derive(Debug, Clone, Default)]
pub struct ResourceBundle {
    entries: HashMap<String, Arc<[u8]>>,
    root: Option<PathBuf>,
}

impl ResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve resources as files under `root`
    pub fn from_dir<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            entries: HashMap::new(),
            root: Some(root.into()),
        }
    }

    pub fn insert<B: Into<Vec<u8>>>(&mut self, name: &str, bytes: B) {
        let bytes: Vec<u8> = bytes.into();
        self.entries.insert(name.to_string(), Arc::from(bytes));
    }

    pub fn with_resource<B: Into<Vec<u8>>>(mut self, name: &str, bytes: B) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name) || self.file_path(name).is_some_and(|path| path.is_file())
    }

    /// Load the encoded bytes of resource `name`.
    pub fn load(&self, name: &str) -> Result<Arc<[u8]>, FetchError> {
        if let Some(bytes) = self.entries.get(name) {
            return Ok(Arc::clone(bytes));
        }

        let path = self
            .file_path(name)
            .ok_or_else(|| FetchError::UnknownResource(name.to_string()))?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Arc::from(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(FetchError::UnknownResource(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Path of `name` under the root, refusing names that escape it
    fn file_path(&self, name: &str) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        let relative = Path::new(name);
        let contained = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        contained.then(|| root.join(relative))
    }
}
