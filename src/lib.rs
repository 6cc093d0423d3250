//! filedrop - a minimal HTTP file repository.
//!
//! Serves a directory listing, accepts uploads (plain files, or folders
//! packed as zip archives carrying a marker extension) and serves downloads
//! (files as-is, directories zipped on the fly). All filesystem access is
//! confined to a single serve root.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{FiledropError, Result};
pub use file::{
    DirectoryListing, DownloadPipeline, DownloadTarget, ResolvedTarget, ServeRoot, UploadKind,
    UploadPipeline,
};
pub use web::FileServer;
