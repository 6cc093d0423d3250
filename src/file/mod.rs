//! File handling core for filedrop.
//!
//! This module turns untrusted client names and archive contents into
//! filesystem operations confined to the serve root:
//! - Safe path resolution against a root directory
//! - Collision-free naming for files and extracted folders
//! - Zip extraction with per-entry path validation
//! - Streaming zip creation for directory downloads
//! - Upload and download pipelines tying the pieces together

pub mod archive;
pub mod download;
pub mod extract;
pub mod listing;
pub mod naming;
pub mod resolver;
pub mod upload;

pub use archive::{build_archive, ArchiveStats};
pub use download::{DownloadPipeline, DownloadTarget};
pub use extract::extract_archive;
pub use listing::DirectoryListing;
pub use naming::{unique_file_name, unique_folder_name};
pub use resolver::{basename, resolve_within, ServeRoot};
pub use upload::{classify, ResolvedTarget, UploadKind, UploadPipeline};

/// Default folder-marker extension (without the dot).
pub const DEFAULT_FOLDER_MARKER: &str = "up";

/// Default maximum upload size (1GB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1024 * 1024 * 1024;
