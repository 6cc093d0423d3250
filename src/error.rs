//! Error types for filedrop.

use thiserror::Error;

/// Common error type for filedrop.
#[derive(Error, Debug)]
pub enum FiledropError {
    /// A client-supplied name tried to leave the directory it is bound to.
    #[error("path escapes its root: {0}")]
    PathEscape(String),

    /// An archive entry failed validation during extraction.
    ///
    /// Extraction stops at the first offending entry; entries written before
    /// it stay on disk.
    #[error("archive security error: {0}")]
    ArchiveSecurity(String),

    /// Read or write failure while extracting or building an archive.
    #[error("archive I/O error: {0}")]
    ArchiveIo(String),

    /// Requested path does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Malformed request (missing field, empty filename, bad multipart body).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Generic filesystem failure (directory creation, temp file, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<zip::result::ZipError> for FiledropError {
    fn from(e: zip::result::ZipError) -> Self {
        FiledropError::ArchiveIo(e.to_string())
    }
}

impl From<walkdir::Error> for FiledropError {
    fn from(e: walkdir::Error) -> Self {
        FiledropError::ArchiveIo(e.to_string())
    }
}

/// Result type alias for filedrop operations.
pub type Result<T> = std::result::Result<T, FiledropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_escape_display() {
        let err = FiledropError::PathEscape("../etc/passwd".to_string());
        assert_eq!(err.to_string(), "path escapes its root: ../etc/passwd");
    }

    #[test]
    fn test_not_found_display() {
        let err = FiledropError::NotFound("notes.txt".to_string());
        assert_eq!(err.to_string(), "notes.txt not found");
    }

    #[test]
    fn test_bad_request_display() {
        let err = FiledropError::BadRequest("empty filename".to_string());
        assert_eq!(err.to_string(), "bad request: empty filename");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: FiledropError = io_err.into();
        assert!(matches!(err, FiledropError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_zip_error_conversion() {
        let err: FiledropError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, FiledropError::ArchiveIo(_)));
    }
}
