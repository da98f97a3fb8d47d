//! Recursive directory creation that reports what it creates

use crate::error::{Result, SnapshotError};
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

/// Create `path` and any missing ancestors, parent first
///
/// `on_create` is called once for every directory this call actually
/// creates; directories that already exist are not reported. A `path` that
/// already exists as a directory is not an error, which makes the call
/// idempotent.
///
/// New directories get `mode`, subject to the process creation mask.
///
/// # Errors
///
/// [`SnapshotError::Creation`] if an ancestor or `path` itself cannot be
/// created, including when it exists but is not a directory.
///
/// # Example
///
/// ```rust,no_run
/// use isnapshot::dirs::create_dir_all_reporting;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut created = Vec::new();
/// create_dir_all_reporting(Path::new("/backup/a/b"), 0o755, &mut |p: &Path| created.push(p.to_path_buf()))?;
/// # Ok(())
/// # }
/// ```
pub fn create_dir_all_reporting<F>(path: &Path, mode: u32, on_create: &mut F) -> Result<()>
where
    F: FnMut(&Path),
{
    if fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && fs::symlink_metadata(parent).is_err() {
            create_dir_all_reporting(parent, mode, on_create)?;
        }
    }

    match DirBuilder::new().mode(mode).create(path) {
        Ok(()) => {
            on_create(path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(SnapshotError::Creation {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
