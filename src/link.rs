//! Symbolic link creation
//!
//! Two flavours are needed:
//!
//! - [`mirror_link`] points a new snapshot entry at the previous snapshot's
//!   copy of an unchanged file. If that copy is itself a link (the file was
//!   unchanged for several runs) the link is resolved one level, so every
//!   mirror points straight at the snapshot holding the real content and
//!   chains never grow deeper than one hop.
//! - [`recreate_symlink`] reproduces a symlink found in the source tree with
//!   its literal, unresolved target.

use crate::error::{Result, SnapshotError};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Create `dest` as a symlink to `source`, or to `source`'s target if
/// `source` is itself a symlink
///
/// Returns the target the new link points at.
///
/// # Errors
///
/// - [`SnapshotError::Stat`] if `source` cannot be stat'ed
/// - [`SnapshotError::ReadLink`] if `source` is a link that cannot be read
/// - [`SnapshotError::Creation`] if the link cannot be created
pub fn mirror_link(source: &Path, dest: &Path) -> Result<PathBuf> {
    let metadata = fs::symlink_metadata(source).map_err(|err| SnapshotError::Stat {
        path: source.to_path_buf(),
        source: err,
    })?;

    let target = if metadata.file_type().is_symlink() {
        utils::read_symlink(source).map_err(|err| SnapshotError::ReadLink {
            path: source.to_path_buf(),
            source: err,
        })?
    } else {
        source.to_path_buf()
    };

    info!("mirror {} ...", target.display());

    utils::create_symlink(&target, dest).map_err(|err| SnapshotError::Creation {
        path: dest.to_path_buf(),
        source: err,
    })?;
    Ok(target)
}

/// Create `dest` as a symlink with the literal target `target`
pub fn recreate_symlink(target: &Path, dest: &Path) -> Result<()> {
    utils::create_symlink(target, dest).map_err(|err| SnapshotError::Creation {
        path: dest.to_path_buf(),
        source: err,
    })?;
    info!("symlink {} -> {}", dest.display(), target.display());
    Ok(())
}
