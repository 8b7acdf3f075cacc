//! Filesystem side of wheel extraction.
//!
//! Entry names are validated before anything is written for them, to guard
//! against zip-slip: absolute names and names with `..` components are
//! rejected.

use super::error::{ArchiveError, Result};
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Resolve `entry_name` under `dest_dir`.
///
/// # Errors
///
/// Returns [`ArchiveError::PathTraversal`] if the name is absolute or
/// contains a parent-directory or drive-prefix component.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use wheelwright_archive::extraction::target_path;
///
/// let target = target_path(Path::new("out"), "pkg/mod.py").expect("safe name");
/// assert_eq!(target, Path::new("out/pkg/mod.py"));
/// assert!(target_path(Path::new("out"), "../evil.py").is_err());
/// ```
pub fn target_path(dest_dir: &Path, entry_name: &str) -> Result<PathBuf> {
    let traversal = || ArchiveError::PathTraversal {
        path: entry_name.to_owned(),
    };
    let relative = Path::new(entry_name);
    if relative.is_absolute() || entry_name.starts_with(['/', '\\']) {
        return Err(traversal());
    }
    for component in relative.components() {
        if matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        ) {
            return Err(traversal());
        }
    }
    Ok(dest_dir.join(relative))
}

/// Require `dest_dir` to exist and be a directory.
///
/// # Errors
///
/// Returns [`ArchiveError::NotADirectory`] otherwise.
pub fn ensure_directory(dest_dir: &Path) -> Result<()> {
    if dest_dir.is_dir() {
        Ok(())
    } else {
        Err(ArchiveError::NotADirectory {
            path: dest_dir.to_path_buf(),
        })
    }
}

/// Write `source` to `target`, creating parent directories.
///
/// # Errors
///
/// Returns I/O errors, or a verification error raised by `source` at end
/// of stream.
pub fn write_file(target: &Path, source: &mut dyn Read) -> Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(target)?;
    Ok(io::copy(source, &mut file)?)
}

/// Copy the executable bits of `stored_mode` onto `target`.
///
/// # Errors
///
/// Returns I/O errors from reading or updating permissions.
#[cfg(unix)]
pub fn restore_executable_bits(target: &Path, stored_mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let Some(executable) = stored_mode.map(|mode| mode & 0o111).filter(|bits| *bits != 0) else {
        return Ok(());
    };
    let mut permissions = fs::metadata(target)?.permissions();
    permissions.set_mode(permissions.mode() | executable);
    fs::set_permissions(target, permissions)?;
    Ok(())
}

/// Executable bits are not modelled on this platform.
///
/// # Errors
///
/// Never fails.
#[cfg(not(unix))]
pub fn restore_executable_bits(_target: &Path, _stored_mode: Option<u32>) -> Result<()> {
    Ok(())
}
