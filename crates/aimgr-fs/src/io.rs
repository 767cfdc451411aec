//! Atomic writes and the copy/link/remove helpers used to materialize resources

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    Ok(())
}

pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Create `dir` and all of its parents.
pub fn ensure_dir(dir: &NormalizedPath) -> Result<()> {
    let native = dir.to_native();
    fs::create_dir_all(&native).map_err(|e| Error::io(&native, e))
}

/// Copy a single file to `dest`, creating parent directories.
pub fn copy_file(src: &Path, dest: &NormalizedPath) -> Result<()> {
    let native_dest = dest.to_native();
    if let Some(parent) = native_dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::copy(src, &native_dest).map_err(|e| Error::io(src, e))?;
    Ok(())
}

/// Recursively copy the directory `src` to `dest`.
///
/// Symlinks inside `src` are followed, so the copy is self-contained.
pub fn copy_dir(src: &Path, dest: &NormalizedPath) -> Result<()> {
    if !src.is_dir() {
        return Err(Error::NotADirectory {
            path: src.to_path_buf(),
        });
    }

    ensure_dir(dest)?;

    let entries = fs::read_dir(src).map_err(|e| Error::io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(src, e))?;
        let entry_path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let target = dest.join(&name);

        if entry_path.is_dir() {
            copy_dir(&entry_path, &target)?;
        } else {
            copy_file(&entry_path, &target)?;
        }
    }

    Ok(())
}

/// Total size in bytes of the files below `dir`.
///
/// Symlinks count as their own size and are not followed; directories named
/// in `skip` are left out entirely.
pub fn disk_usage(dir: &Path, skip: &[&str]) -> Result<u64> {
    let mut total = 0;
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path).map_err(|e| Error::io(&path, e))?;
        if metadata.is_dir() {
            if !skip.contains(&entry.file_name().to_string_lossy().as_ref()) {
                total += disk_usage(&path, skip)?;
            }
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}

/// Create a symlink at `link` pointing to `target`.
pub fn symlink(target: &Path, link: &NormalizedPath) -> Result<()> {
    let native_link = link.to_native();
    if let Some(parent) = native_link.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, &native_link);

    #[cfg(windows)]
    let result = if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, &native_link)
    } else {
        std::os::windows::fs::symlink_file(target, &native_link)
    };

    result.map_err(|e| Error::io(&native_link, e))
}

/// Remove whatever occupies `path`: a file, a symlink (without touching its
/// target), or a directory tree.
///
/// Returns `Ok(false)` when nothing was there.
pub fn remove_entry(path: &NormalizedPath) -> Result<bool> {
    let native = path.to_native();
    let metadata = match fs::symlink_metadata(&native) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(&native, e)),
    };

    let file_type = metadata.file_type();
    let result = if file_type.is_dir() {
        fs::remove_dir_all(&native)
    } else {
        remove_file_or_link(&native)
    };
    result.map_err(|e| Error::io(&native, e))?;

    Ok(true)
}

#[cfg(windows)]
fn remove_file_or_link(path: &Path) -> std::io::Result<()> {
    // Directory symlinks on Windows are removed as directories
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_file_or_link(path: &Path) -> std::io::Result<()> {
    fs::remove_file(path)
}

/// Remove empty directories from `start` upwards, stopping at `stop`.
///
/// Used after deleting nested resources such as `commands/api/deploy.md`.
pub fn prune_empty_dirs(start: &NormalizedPath, stop: &NormalizedPath) {
    let mut current = Some(start.clone());
    while let Some(dir) = current {
        if dir == *stop || dir.relative_to(stop).is_none() {
            break;
        }
        let is_empty = fs::read_dir(dir.to_native())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty || fs::remove_dir(dir.to_native()).is_err() {
            break;
        }
        tracing::trace!(dir = %dir, "removed empty directory");
        current = dir.parent();
    }
}
