//! Safe path resolution.
//!
//! Every path handed to the filesystem is built here. Names are resolved
//! lexically: separators are normalized, `.` and `..` segments are collapsed,
//! and the result must stay inside its base directory by path component, not
//! by string prefix.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::{FiledropError, Result};

/// The directory the whole service is confined to.
///
/// Fixed at startup and passed explicitly to every pipeline.
#[derive(Debug, Clone)]
pub struct ServeRoot {
    path: PathBuf,
}

impl ServeRoot {
    /// Create a ServeRoot at the given path.
    ///
    /// The directory (and its parents) is created if it doesn't exist. The
    /// stored path is absolute and lexically normalized.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;

        let absolute = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };

        Ok(Self {
            path: normalize(&absolute),
        })
    }

    /// Get the root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a top-level name (upload filename or download parameter).
    ///
    /// The name is first reduced to its final segment, so directory
    /// components sent by the client are never considered. Names that reduce
    /// to nothing, `.` or `..` are rejected.
    pub fn resolve_name(&self, raw: &str) -> Result<PathBuf> {
        let name = basename(raw).ok_or_else(|| FiledropError::PathEscape(raw.to_string()))?;
        resolve_within(&self.path, name)
    }

    /// Resolve a relative path (possibly multi-segment) inside the root.
    pub fn resolve_relative(&self, raw: &str) -> Result<PathBuf> {
        resolve_within(&self.path, raw)
    }
}

/// Reduce a client-supplied name to its last path segment.
///
/// Both `/` and `\` count as separators. Returns `None` when no usable
/// segment remains.
pub fn basename(raw: &str) -> Option<&str> {
    let name = raw
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");

    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Resolve `name` relative to `base`, rejecting any result outside `base`.
///
/// `base` is expected to be absolute. Absolute names, drive prefixes and
/// names whose `..` segments climb above `base` fail with
/// [`FiledropError::PathEscape`]. A name that collapses to nothing resolves
/// to `base` itself.
pub fn resolve_within(base: &Path, name: &str) -> Result<PathBuf> {
    let escape = || FiledropError::PathEscape(name.to_string());

    if name.contains('\0') {
        return Err(escape());
    }

    let unified = name.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(escape());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or_else(escape)?;
            }
            segment => segments.push(segment),
        }
    }

    let base = normalize(base);
    let mut resolved = base.clone();
    resolved.extend(segments);

    let resolved = normalize(&resolved);
    if resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        Err(escape())
    }
}

/// `C:` style prefixes.
fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Lexically collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
