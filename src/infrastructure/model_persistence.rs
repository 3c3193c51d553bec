//! JSON file persistence for the trained network.
//!
//! The whole document is rewritten on every save through a temp file and a
//! rename, so readers never observe a half-written model.

use crate::domain::errors::ModelStoreError;
use crate::domain::ml::ModelState;
use crate::domain::ports::ModelStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Stores the model as a single pretty-printed JSON document.
pub struct JsonModelStore {
    file_path: PathBuf,
}

impl JsonModelStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Sibling of the model file that receives the document before the rename
    fn temp_path(&self) -> PathBuf {
        let mut name = self.file_path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_error(&self, path: &Path, source: std::io::Error) -> ModelStoreError {
        ModelStoreError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ModelStore for JsonModelStore {
    fn load(&self) -> Option<ModelState> {
        if !self.file_path.exists() {
            debug!("No model file at {:?}, starting untrained", self.file_path);
            return None;
        }

        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read model file {:?}: {}", self.file_path, e);
                return None;
            }
        };

        match serde_json::from_str::<ModelState>(&content) {
            Ok(state) => {
                info!(
                    "Loaded model from {:?} (layers: {:?})",
                    self.file_path, state.sizes
                );
                Some(state)
            }
            Err(e) => {
                warn!("Ignoring malformed model file {:?}: {}", self.file_path, e);
                None
            }
        }
    }

    fn save(&self, state: &ModelState) -> Result<(), ModelStoreError> {
        let content = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| self.write_error(parent, e))?;
        }

        // Atomic write: write to temp file then rename
        let temp_path = self.temp_path();
        fs::write(&temp_path, content).map_err(|e| self.write_error(&temp_path, e))?;
        if let Err(e) = fs::rename(&temp_path, &self.file_path) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!("Failed to remove temp file {:?}: {}", temp_path, cleanup);
            }
            return Err(self.write_error(&self.file_path, e));
        }

        info!("Saved model to {:?}", self.file_path);
        Ok(())
    }
}
