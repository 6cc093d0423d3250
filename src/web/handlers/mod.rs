//! HTTP handlers for filedrop.

pub mod file;
pub mod index;

pub use file::*;
pub use index::*;

use crate::config::FilesConfig;
use crate::file::{DownloadPipeline, ServeRoot, UploadPipeline};
use crate::Result;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Directory everything is served from.
    pub root: ServeRoot,
    /// Upload pipeline.
    pub uploads: UploadPipeline,
    /// Download pipeline.
    pub downloads: DownloadPipeline,
}

impl AppState {
    /// Create the state for a serve root with the given folder marker.
    pub fn new(root: ServeRoot, folder_marker: &str) -> Self {
        Self {
            uploads: UploadPipeline::new(root.clone(), folder_marker),
            downloads: DownloadPipeline::new(root.clone()),
            root,
        }
    }

    /// Build the state from the files configuration.
    ///
    /// Creates the serve root if it doesn't exist.
    pub fn from_config(files: &FilesConfig) -> Result<Self> {
        let root = ServeRoot::new(&files.root)?;
        let mut state = Self::new(root, &files.folder_marker);
        if let Some(temp_dir) = files.temp_dir_path() {
            state.uploads = state.uploads.with_temp_dir(temp_dir);
        }
        Ok(state)
    }
}
