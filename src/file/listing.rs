//! Directory listing of the serve root.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::Result;

/// Snapshot of the entries directly inside a directory.
///
/// Read fresh on every call; a listing taken during an upload may show a
/// partially populated folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    /// Directory names, sorted.
    pub directories: Vec<String>,
    /// File names, sorted.
    pub files: Vec<String>,
}

impl DirectoryListing {
    /// Read the listing of `dir`.
    ///
    /// Entries that vanish between the directory read and their type lookup
    /// are skipped. Names that aren't valid UTF-8 are converted lossily.
    pub fn read(dir: &Path) -> Result<Self> {
        let mut listing = Self::default();

        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            // Symlinks are listed by what they point at.
            let is_dir = file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir());
            if is_dir {
                listing.directories.push(name);
            } else {
                listing.files.push(name);
            }
        }

        listing.directories.sort();
        listing.files.sort();
        Ok(listing)
    }

    /// Whether the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_empty() {
        let temp_dir = TempDir::new().unwrap();
        let listing = DirectoryListing::read(temp_dir.path()).unwrap();

        assert!(listing.is_empty());
    }

    #[test]
    fn test_read_splits_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), b"").unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"").unwrap();
        fs::create_dir(temp_dir.path().join("zeta")).unwrap();
        fs::create_dir(temp_dir.path().join("alpha")).unwrap();
        fs::write(temp_dir.path().join("alpha/nested.txt"), b"").unwrap();

        let listing = DirectoryListing::read(temp_dir.path()).unwrap();

        assert_eq!(listing.directories, vec!["alpha", "zeta"]);
        assert_eq!(listing.files, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_read_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["c", "a", "b"] {
            fs::write(temp_dir.path().join(name), b"").unwrap();
        }

        let first = DirectoryListing::read(temp_dir.path()).unwrap();
        let second = DirectoryListing::read(temp_dir.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_read_reflects_changes() {
        let temp_dir = TempDir::new().unwrap();
        let before = DirectoryListing::read(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("new.txt"), b"").unwrap();
        let after = DirectoryListing::read(temp_dir.path()).unwrap();

        assert!(before.files.is_empty());
        assert_eq!(after.files, vec!["new.txt"]);
    }

    #[test]
    fn test_read_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(DirectoryListing::read(&temp_dir.path().join("missing")).is_err());
    }
}
