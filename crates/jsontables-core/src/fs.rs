//! Filesystem helpers for whole-file replacement.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Replace `path` with `data` so readers see either the old or the new
/// content, never a partial write.
///
/// The bytes go to a sibling temp file which is fsynced and then renamed over
/// the destination. Missing parent directories are created first.
///
/// # Errors
///
/// Returns an error if the parent cannot be created, the temp file cannot be
/// written, or the final rename fails.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let temp_path = temp_sibling(path, &parent)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = file.write_all(data).and_then(|_| file.sync_all());
    drop(file);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    rename_with_fallback(&temp_path, path)
}

fn temp_sibling(path: &Path, parent: &Path) -> io::Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid data file name: {}", path.display()),
            )
        })?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| io::Error::other(format!("System time error: {}", e)))?
        .as_nanos();
    Ok(parent.join(format!(".{}.{}.tmp", file_name, nanos)))
}

/// Rename `temp_path` onto `destination`, removing the destination and
/// retrying once where the platform refuses to overwrite.
///
/// The temp file is removed if the retry fails too.
pub fn rename_with_fallback(temp_path: &Path, destination: &Path) -> io::Result<()> {
    let Err(first) = fs::rename(temp_path, destination) else {
        return Ok(());
    };

    let _ = fs::remove_file(destination);
    fs::rename(temp_path, destination).map_err(|retry| {
        let _ = fs::remove_file(temp_path);
        io::Error::new(
            retry.kind(),
            format!("Rename into place failed (first: {}, retry: {})", first, retry),
        )
    })
}
