//! Download pipeline.

use std::fs;
use std::io;
use std::path::PathBuf;

use tokio::io::DuplexStream;
use tokio_util::io::SyncIoBridge;

use super::archive::build_archive;
use super::resolver::{basename, ServeRoot};
use crate::{FiledropError, Result};

/// Buffer between the archive builder thread and the response body.
pub const ARCHIVE_PIPE_CAPACITY: usize = 64 * 1024;

/// What a download request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// A regular file, served as raw bytes.
    File {
        /// Absolute path of the file.
        path: PathBuf,
        /// Suggested download name (the basename).
        suggested_name: String,
        /// File size in bytes.
        size: u64,
    },
    /// A directory, served as a zip archive built on the fly.
    Directory {
        /// Absolute path of the directory.
        path: PathBuf,
        /// Suggested download name (`<name>.zip`).
        suggested_name: String,
    },
}

impl DownloadTarget {
    /// The name the client should save the download under.
    pub fn suggested_name(&self) -> &str {
        match self {
            DownloadTarget::File { suggested_name, .. }
            | DownloadTarget::Directory { suggested_name, .. } => suggested_name,
        }
    }
}

/// Serves files and directories from the serve root.
#[derive(Debug, Clone)]
pub struct DownloadPipeline {
    root: ServeRoot,
}

impl DownloadPipeline {
    /// Create a pipeline reading from `root`.
    pub fn new(root: ServeRoot) -> Self {
        Self { root }
    }

    /// Resolve a requested name to a file or directory inside the root.
    ///
    /// Only the final segment of `requested` is considered.
    pub fn resolve(&self, requested: &str) -> Result<DownloadTarget> {
        let path = self.root.resolve_name(requested)?;
        let name = basename(requested)
            .ok_or_else(|| FiledropError::PathEscape(requested.to_string()))?;

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FiledropError::NotFound(format!("Path: {name}")));
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            Ok(DownloadTarget::Directory {
                path,
                suggested_name: format!("{name}.zip"),
            })
        } else {
            Ok(DownloadTarget::File {
                path,
                suggested_name: name.to_string(),
                size: metadata.len(),
            })
        }
    }

    /// Open a resolved file for streaming.
    pub async fn open_file(&self, path: &std::path::Path) -> Result<tokio::fs::File> {
        match tokio::fs::File::open(path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FiledropError::NotFound(
                format!("Path: {}", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Start building a zip archive of `dir` and return its byte stream.
    ///
    /// The archive is written on a blocking thread into an in-memory pipe of
    /// [`ARCHIVE_PIPE_CAPACITY`] bytes. If the build fails or the reader goes
    /// away, the stream simply ends early. Must be called from within a Tokio
    /// runtime.
    pub fn stream_archive(&self, dir: PathBuf) -> DuplexStream {
        let (writer, reader) = tokio::io::duplex(ARCHIVE_PIPE_CAPACITY);
        let sink = SyncIoBridge::new(writer);

        tokio::task::spawn_blocking(move || {
            tracing::info!(dir = %dir.display(), "Streaming directory archive");
            match build_archive(&dir, sink) {
                Ok(stats) => tracing::info!(
                    dir = %dir.display(),
                    files = stats.files,
                    directories = stats.directories,
                    "Directory archive completed"
                ),
                Err(e) => tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Directory archive aborted"
                ),
            }
        });

        reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use zip::ZipArchive;

    fn setup_pipeline() -> (TempDir, DownloadPipeline) {
        let temp_dir = TempDir::new().unwrap();
        let root = ServeRoot::new(temp_dir.path().join("root")).unwrap();
        (temp_dir, DownloadPipeline::new(root))
    }

    #[test]
    fn test_resolve_file() {
        let (_temp_dir, pipeline) = setup_pipeline();
        let path = pipeline.root.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();

        let target = pipeline.resolve("notes.txt").unwrap();

        assert_eq!(
            target,
            DownloadTarget::File {
                path,
                suggested_name: "notes.txt".to_string(),
                size: 5,
            }
        );
    }

    #[test]
    fn test_resolve_directory() {
        let (_temp_dir, pipeline) = setup_pipeline();
        fs::create_dir(pipeline.root.path().join("project")).unwrap();

        let target = pipeline.resolve("project").unwrap();

        assert!(matches!(target, DownloadTarget::Directory { .. }));
        assert_eq!(target.suggested_name(), "project.zip");
    }

    #[test]
    fn test_resolve_missing() {
        let (_temp_dir, pipeline) = setup_pipeline();

        assert!(matches!(
            pipeline.resolve("missing.txt"),
            Err(FiledropError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_traversal_never_leaves_root() {
        let (temp_dir, pipeline) = setup_pipeline();
        // Sibling of the root that a traversal would reach.
        fs::write(temp_dir.path().join("secret.txt"), b"secret").unwrap();

        for requested in ["../secret.txt", "..\\secret.txt", "/etc/passwd", "a/../../secret.txt"] {
            let result = pipeline.resolve(requested);
            assert!(
                matches!(result, Err(FiledropError::NotFound(_))),
                "{requested} should not resolve"
            );
        }

        for requested in ["..", ".", "../"] {
            assert!(matches!(
                pipeline.resolve(requested),
                Err(FiledropError::PathEscape(_))
            ));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stream_archive() {
        let (_temp_dir, pipeline) = setup_pipeline();
        let dir = pipeline.root.path().join("project");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("a.txt"), b"x").unwrap();
        fs::write(dir.join("sub/b.txt"), b"y").unwrap();

        let mut reader = pipeline.stream_archive(dir);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await.unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("sub/b.txt").unwrap(), &mut content)
            .unwrap();
        assert_eq!(content, "y");
        assert!(archive.by_name("sub/").is_ok());
    }

    #[tokio::test]
    async fn test_open_file_missing() {
        let (_temp_dir, pipeline) = setup_pipeline();
        let result = pipeline
            .open_file(&pipeline.root.path().join("gone.txt"))
            .await;

        assert!(matches!(result, Err(FiledropError::NotFound(_))));
    }
}
