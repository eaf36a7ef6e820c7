//! Storage accounting helpers

use std::fs;
use std::io;
use std::path::Path;

/// Recursively sum the sizes of all files under `path`.
///
/// `path` may be a single file or a directory tree. Fails if any part
/// of the tree cannot be read, including when `path` no longer exists.
pub fn dir_size(path: &Path) -> io::Result<u64> {
    let meta = fs::metadata(path)?;
    if meta.is_file() {
        return Ok(meta.len());
    }
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}
