//! Upload pipeline.
//!
//! An upload is classified by the extension of its base name. Names ending
//! in the folder marker (case-insensitive) are zip archives to be unpacked
//! into a fresh folder; everything else, ordinary archives included, is
//! stored as-is under a collision-free name.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWriteExt};

use super::extract::extract_archive;
use super::naming::{unique_file_name, unique_folder_name};
use super::resolver::{basename, ServeRoot};
use crate::{FiledropError, Result};

/// How an upload will be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Write the stream to a file.
    DirectStore,
    /// Unpack the stream as a zip archive into a new folder.
    ExtractFolder,
}

/// Classify a base name against the folder marker extension.
pub fn classify(name: &str, folder_marker: &str) -> UploadKind {
    let is_marked = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(folder_marker));

    if is_marked {
        UploadKind::ExtractFolder
    } else {
        UploadKind::DirectStore
    }
}

/// Destination computed for a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Name of the created file or folder inside the serve root.
    pub final_name: String,
    /// Absolute path of the created file or folder.
    pub absolute_path: PathBuf,
    /// Whether the upload is unpacked into a folder.
    pub is_archive_extraction: bool,
}

/// Receives uploads into the serve root.
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    root: ServeRoot,
    folder_marker: String,
    temp_dir: Option<PathBuf>,
}

impl UploadPipeline {
    /// Create a pipeline storing into `root`.
    ///
    /// `folder_marker` is the extension, without dot, that marks folder
    /// uploads.
    pub fn new(root: ServeRoot, folder_marker: impl Into<String>) -> Self {
        Self {
            root,
            folder_marker: folder_marker.into(),
            temp_dir: None,
        }
    }

    /// Buffer folder uploads in `dir` instead of the OS temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// The serve root uploads land in.
    pub fn root(&self) -> &ServeRoot {
        &self.root
    }

    /// The folder marker extension, without dot.
    pub fn folder_marker(&self) -> &str {
        &self.folder_marker
    }

    /// Compute where an upload named `raw_filename` would go right now.
    ///
    /// Only the final segment of `raw_filename` is used.
    pub fn plan(&self, raw_filename: &str) -> Result<ResolvedTarget> {
        if raw_filename.trim().is_empty() {
            return Err(FiledropError::BadRequest("empty filename".to_string()));
        }
        let name = basename(raw_filename)
            .ok_or_else(|| FiledropError::PathEscape(raw_filename.to_string()))?;

        match classify(name, &self.folder_marker) {
            UploadKind::DirectStore => {
                let final_name = unique_file_name(self.root.path(), name);
                Ok(ResolvedTarget {
                    absolute_path: self.root.resolve_name(&final_name)?,
                    final_name,
                    is_archive_extraction: false,
                })
            }
            UploadKind::ExtractFolder => {
                let stem = Path::new(name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(name);
                let final_name = unique_folder_name(self.root.path(), stem);
                Ok(ResolvedTarget {
                    absolute_path: self.root.resolve_name(&final_name)?,
                    final_name,
                    is_archive_extraction: true,
                })
            }
        }
    }

    /// Receive an upload and store or extract it.
    pub async fn upload<R>(&self, raw_filename: &str, reader: R) -> Result<ResolvedTarget>
    where
        R: AsyncRead + Unpin,
    {
        tracing::info!(filename = raw_filename, "Receiving upload");
        let target = self.plan(raw_filename)?;
        tracing::info!(
            final_name = %target.final_name,
            extract = target.is_archive_extraction,
            "Resolved upload target"
        );

        if target.is_archive_extraction {
            self.extract_folder(&target, reader).await?;
        } else {
            store_file(&target.absolute_path, reader).await?;
        }

        tracing::info!(final_name = %target.final_name, "Upload completed");
        Ok(target)
    }

    async fn extract_folder<R>(&self, target: &ResolvedTarget, mut reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("filedrop-upload-").suffix(".zip");
            builder
        };
        // Removed when dropped, on every exit path.
        let temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        tracing::debug!(temp = %temp.path().display(), "Buffering folder upload");

        let mut buffer = tokio::fs::File::from_std(temp.reopen()?);
        tokio::io::copy(&mut reader, &mut buffer).await?;
        buffer.flush().await?;
        drop(buffer);

        let dest = target.absolute_path.clone();
        tracing::info!(dest = %dest.display(), "Extracting folder upload");
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let archive = BufReader::new(temp.reopen()?);
            let result = extract_archive(archive, &dest);
            drop(temp);
            result
        })
        .await
        .map_err(|e| FiledropError::Io(std::io::Error::other(e)))??;

        Ok(())
    }
}

/// Stream `reader` into a new file at `path`.
///
/// A partially written file is removed when the stream fails.
async fn store_file<R>(path: &Path, mut reader: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(path).await?;

    let copied = async {
        tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = copied {
        tracing::warn!(path = %path.display(), error = %e, "Upload stream failed");
        drop(file);
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::debug!(error = %remove_err, "Failed to remove partial upload");
        }
        return Err(e.into());
    }

    Ok(())
}
