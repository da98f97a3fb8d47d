//! Utility functions for isnapshot
//!
//! This module provides the small helpers shared by the snapshot engine:
//!
//! ### Path Manipulation
//! - Joining a source path underneath a snapshot root ([`join_path`])
//! - Recognising the `.`/`..` pseudo entries ([`is_ignorable_name`])
//! - Making paths absolute without resolving symlinks ([`absolute_path`])
//!
//! ### File Operations
//! - Permission bits read/write on Unix
//! - Symbolic link creation and reading
//! - The process file-creation mask
//!
//! ### Reporting
//! - Byte formatting (human-readable sizes)
//!
//! ## Example Usage
//!
//! ```rust
//! use isnapshot::utils::{join_path, format_bytes};
//! use std::path::{Path, PathBuf};
//!
//! let dest = join_path(Path::new("/backup/01-02-06-15-04-05"), Path::new("/home/user/notes.txt"));
//! assert_eq!(dest, PathBuf::from("/backup/01-02-06-15-04-05/home/user/notes.txt"));
//!
//! assert_eq!(format_bytes(1536), "1.50 KB");
//! ```

use crate::error::Result;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Permission and special bits of a Unix mode
pub const PERMISSION_BITS: u32 = 0o7777;

/// Owner read/write/execute
pub const OWNER_RWX: u32 = 0o700;

/// Set-user-ID and set-group-ID bits
pub const SETID_BITS: u32 = 0o6000;

/// Join a path underneath a base directory
///
/// Every component of `path` that could climb out of `base` is dropped:
/// root and prefix components (so absolute paths nest inside `base`),
/// `.` and `..`. The result therefore always lies within `base`.
///
/// # Example
///
/// ```rust
/// use isnapshot::utils::join_path;
/// use std::path::{Path, PathBuf};
///
/// let base = Path::new("/snapshots/latest");
/// assert_eq!(join_path(base, Path::new("///etc/hosts")), PathBuf::from("/snapshots/latest/etc/hosts"));
/// assert_eq!(join_path(base, Path::new("../a/./b")), PathBuf::from("/snapshots/latest/a/b"));
/// ```
pub fn join_path(base: &Path, path: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in path.components() {
        if let Component::Normal(segment) = component {
            joined.push(segment);
        }
    }
    joined
}

/// Whether a directory entry name is `.` or `..`
pub fn is_ignorable_name(name: &OsStr) -> bool {
    name == "." || name == ".."
}

/// Make a path absolute without touching the filesystem
///
/// Unlike `canonicalize`, symbolic links are not resolved and the path does
/// not have to exist.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// Format bytes in human-readable form
///
/// Uses binary (1024-based) units.
///
/// ```rust
/// use isnapshot::utils::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1_048_576), "1.00 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// The file-creation mask of this process
///
/// Reading the mask requires setting it, so it is read once and cached;
/// the process mask is left unchanged afterwards.
pub fn process_umask() -> u32 {
    static UMASK: OnceLock<u32> = OnceLock::new();
    *UMASK.get_or_init(|| {
        use nix::sys::stat::{umask, Mode};
        let previous = umask(Mode::empty());
        umask(previous);
        u32::from(previous.bits())
    })
}

/// Get Unix permission bits (including setuid/setgid/sticky) from metadata
pub fn get_permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & PERMISSION_BITS
}

/// Set Unix permissions
pub fn set_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & PERMISSION_BITS))
}

/// Create a symlink at `link` pointing to `target`
pub fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Read symlink target
pub fn read_symlink(path: &Path) -> std::io::Result<PathBuf> {
    fs::read_link(path)
}
