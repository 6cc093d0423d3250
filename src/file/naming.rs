//! Collision-free name generation.
//!
//! The existence check and the later create are not atomic. Two writers
//! racing on the same name may both see it as free; the service assumes a
//! single writer per name.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Length of the hex suffix used for folder collisions.
pub const HASH_SUFFIX_LEN: usize = 6;

/// Return a file name that does not currently exist in `dir`.
///
/// `report.txt` is returned unchanged when free; otherwise `report_1.txt`,
/// `report_2.txt`, ... are tried in order until one is free.
pub fn unique_file_name(dir: &Path, desired: &str) -> String {
    if !dir.join(desired).exists() {
        return desired.to_string();
    }

    let (stem, ext) = split_extension(desired);
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if !dir.join(&candidate).exists() {
            tracing::debug!(desired, candidate = %candidate, "Resolved file name collision");
            return candidate;
        }
        counter += 1;
    }
}

/// Return a folder name that does not currently exist in `dir`.
///
/// A taken name gets `_` plus a 6-character hex suffix derived from the name
/// and the current time. The suffix is recomputed until the result is free.
pub fn unique_folder_name(dir: &Path, desired: &str) -> String {
    if !dir.join(desired).exists() {
        return desired.to_string();
    }

    let mut attempt: u64 = 0;
    loop {
        let candidate = format!("{desired}_{}", hash_suffix(desired, attempt));
        if !dir.join(&candidate).exists() {
            tracing::info!(desired, candidate = %candidate, "Folder exists, using hashed name");
            return candidate;
        }
        attempt += 1;
    }
}

/// Six lowercase hex characters fingerprinting `name`, the current time and
/// the attempt number.
pub fn hash_suffix(name: &str, attempt: u64) -> String {
    let now = chrono::Utc::now().format("%Y%m%d%H%M%S%.9f").to_string();

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(now.as_bytes());
    hasher.update(attempt.to_le_bytes());
    let digest = hasher.finalize();

    digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(HASH_SUFFIX_LEN)
        .collect()
}

/// Split `name` into stem and extension, keeping the dot on the extension.
///
/// A leading dot does not start an extension (`.bashrc` has none).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
