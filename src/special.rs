//! FIFO, device node and socket recreation

use crate::error::{Result, SnapshotError};
use crate::types::{EntryKind, FileStatus};
use nix::sys::stat::{mknod, Mode, SFlag};
use nix::unistd::mkfifo;
use std::io;
use std::path::Path;
use tracing::info;

fn mode_of(status: &FileStatus) -> Mode {
    Mode::from_bits_truncate((status.permissions & crate::utils::PERMISSION_BITS) as _)
}

/// Creates a FIFO at `dest` with the permission bits of `status`
pub fn create_fifo(dest: &Path, status: &FileStatus) -> Result<()> {
    mkfifo(dest, mode_of(status)).map_err(|errno| SnapshotError::Creation {
        path: dest.to_path_buf(),
        source: io::Error::from(errno),
    })?;
    info!("fifo {}", dest.display());
    Ok(())
}

/// Creates a block/character device or socket node at `dest` that mirrors `status`
pub fn create_node(dest: &Path, status: &FileStatus) -> Result<()> {
    let kind = match status.kind {
        EntryKind::BlockDevice => SFlag::S_IFBLK,
        EntryKind::CharDevice => SFlag::S_IFCHR,
        EntryKind::Socket => SFlag::S_IFSOCK,
        _ => {
            return Err(SnapshotError::Creation {
                path: dest.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "status does not describe a device or socket node",
                ),
            })
        }
    };

    mknod(dest, kind, mode_of(status), status.rdev as _).map_err(|errno| {
        SnapshotError::Creation {
            path: dest.to_path_buf(),
            source: io::Error::from(errno),
        }
    })?;
    info!("node {}", dest.display());
    Ok(())
}
