//! Streaming archive builder for directory downloads.
//!
//! The archive is written in streaming mode, so the sink only needs
//! [`Write`]: an HTTP response pipe works as well as a file.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::{FiledropError, Result};

/// Read buffer size used when copying file contents into the archive.
pub const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Summary of a finished archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Number of directory entries written.
    pub directories: usize,
    /// Number of file entries written.
    pub files: usize,
}

/// Walk `src` and stream every file and directory below it into `sink`.
///
/// Entry names are relative to `src` and use `/` as separator. Directories
/// are written as explicit entries ending in `/`, so empty directories
/// survive a round trip. Symlinks are skipped.
///
/// The walk is sorted by file name and therefore deterministic. Any
/// unreadable entry aborts the build; whatever was already written to
/// `sink` is left as-is.
pub fn build_archive<W: Write>(src: &Path, sink: W) -> Result<ArchiveStats> {
    let mut zip = ZipWriter::new_stream(sink);
    let base_options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut stats = ArchiveStats::default();

    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            tracing::debug!(path = %entry.path().display(), "Skipping symlink");
            continue;
        }

        let name = entry_name(src, entry.path())?;
        let metadata = entry.metadata()?;
        let options = with_permissions(base_options, &metadata);

        if file_type.is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
            stats.directories += 1;
            continue;
        }

        let file = File::open(entry.path())
            .map_err(|e| FiledropError::ArchiveIo(format!("{name}: {e}")))?;
        zip.start_file(name.as_str(), options.large_file(metadata.len() >= u32::MAX as u64))?;

        let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, file);
        io::copy(&mut reader, &mut zip)
            .map_err(|e| FiledropError::ArchiveIo(format!("{name}: {e}")))?;
        stats.files += 1;
    }

    zip.finish()?;
    Ok(stats)
}

/// Relative `/`-separated entry name for `path` below `src`.
fn entry_name(src: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(src)
        .map_err(|e| FiledropError::ArchiveIo(format!("{}: {e}", path.display())))?;

    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    Ok(segments.join("/"))
}

#[cfg(unix)]
fn with_permissions(options: SimpleFileOptions, metadata: &std::fs::Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;

    options.unix_permissions(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn with_permissions(options: SimpleFileOptions, _metadata: &std::fs::Metadata) -> SimpleFileOptions {
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::extract::extract_archive;
    use std::collections::BTreeSet;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn create_tree(root: &Path) {
        fs::create_dir_all(root.join("docs/deep")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("top.txt"), b"top").unwrap();
        fs::write(root.join("docs/readme.md"), b"# readme").unwrap();
        fs::write(root.join("docs/deep/data.bin"), vec![7u8; 100_000]).unwrap();
    }

    /// Relative file and directory sets of a tree.
    fn snapshot(root: &Path) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut dirs = BTreeSet::new();
        let mut files = BTreeSet::new();
        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry.unwrap();
            let name = entry_name(root, entry.path()).unwrap();
            if entry.file_type().is_dir() {
                dirs.insert(name);
            } else {
                files.insert(name);
            }
        }
        (dirs, files)
    }

    #[test]
    fn test_build_archive_entry_names() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(temp_dir.path());

        let mut out = Vec::new();
        let stats = build_archive(temp_dir.path(), &mut out).unwrap();

        assert_eq!(stats.directories, 3);
        assert_eq!(stats.files, 3);

        let archive = ZipArchive::new(Cursor::new(out)).unwrap();
        let names: BTreeSet<&str> = archive.file_names().collect();
        assert!(names.contains("docs/"));
        assert!(names.contains("docs/deep/"));
        assert!(names.contains("empty/"));
        assert!(names.contains("top.txt"));
        assert!(names.contains("docs/deep/data.bin"));
    }

    #[test]
    fn test_build_then_extract_round_trip() {
        let src = TempDir::new().unwrap();
        create_tree(src.path());

        let mut out = Vec::new();
        build_archive(src.path(), &mut out).unwrap();

        let dest = TempDir::new().unwrap();
        extract_archive(Cursor::new(out), dest.path()).unwrap();

        assert_eq!(snapshot(src.path()), snapshot(dest.path()));
        assert!(dest.path().join("empty").is_dir());
        for file in ["top.txt", "docs/readme.md", "docs/deep/data.bin"] {
            assert_eq!(
                fs::read(src.path().join(file)).unwrap(),
                fs::read(dest.path().join(file)).unwrap()
            );
        }
    }

    #[test]
    fn test_build_archive_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let mut out = Vec::new();
        let stats = build_archive(temp_dir.path(), &mut out).unwrap();

        assert_eq!(stats, ArchiveStats::default());
        assert_eq!(ZipArchive::new(Cursor::new(out)).unwrap().len(), 0);
    }

    #[test]
    fn test_build_archive_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = build_archive(&temp_dir.path().join("gone"), Vec::new());

        assert!(matches!(result, Err(FiledropError::ArchiveIo(_))));
    }

    #[test]
    fn test_build_archive_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(temp_dir.path());

        let mut first = Vec::new();
        build_archive(temp_dir.path(), &mut first).unwrap();
        let mut second = Vec::new();
        build_archive(temp_dir.path(), &mut second).unwrap();

        let first: Vec<String> = ZipArchive::new(Cursor::new(first))
            .unwrap()
            .file_names()
            .map(String::from)
            .collect();
        let second: Vec<String> = ZipArchive::new(Cursor::new(second))
            .unwrap()
            .file_names()
            .map(String::from)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_archive_failing_sink() {
        struct BrokenPipe;

        impl Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "client gone"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let temp_dir = TempDir::new().unwrap();
        create_tree(temp_dir.path());

        let result = build_archive(temp_dir.path(), BrokenPipe);
        assert!(matches!(result, Err(FiledropError::ArchiveIo(_))));
    }
}
