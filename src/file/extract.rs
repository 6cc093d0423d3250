//! Archive extraction.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use super::resolver::resolve_within;
use crate::{FiledropError, Result};

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Extract a zip archive into `dest`.
///
/// `dest` is created if missing. Every entry name is resolved against
/// `dest` on its own; the first entry that would land outside it aborts
/// the extraction with [`FiledropError::ArchiveSecurity`]. Entries already
/// written stay on disk.
///
/// Returns the number of entries materialized.
pub fn extract_archive<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(reader)?;
    fs::create_dir_all(dest)?;

    tracing::info!(dest = %dest.display(), entries = archive.len(), "Starting extraction");

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        let target = resolve_within(dest, &name).map_err(|_| {
            tracing::warn!(entry = %name, "Illegal archive entry path");
            FiledropError::ArchiveSecurity(format!("illegal entry path: {name}"))
        })?;

        if entry.is_dir() {
            tracing::debug!(target = %target.display(), "Creating directory");
            create_dir(&target, entry.unix_mode().unwrap_or(DEFAULT_DIR_MODE))
                .map_err(|e| archive_io(&name, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| archive_io(&name, e))?;
        }

        tracing::debug!(entry = %name, target = %target.display(), "Extracting file");
        let mode = entry.unix_mode().unwrap_or(DEFAULT_FILE_MODE);
        let mut out = open_output(&target, mode).map_err(|e| archive_io(&name, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| archive_io(&name, e))?;
    }

    tracing::info!(dest = %dest.display(), "Extraction completed");
    Ok(archive.len())
}

fn archive_io(name: &str, e: io::Error) -> FiledropError {
    FiledropError::ArchiveIo(format!("{name}: {e}"))
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    // Owner keeps rwx so later entries can be written inside.
    fs::DirBuilder::new()
        .recursive(true)
        .mode((mode & 0o7777) | 0o700)
        .create(path)
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn open_output(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode & 0o7777)
        .open(path)
}

#[cfg(not(unix))]
fn open_output(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
