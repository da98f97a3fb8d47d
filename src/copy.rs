//! Content copier
//!
//! Streams a regular file into a new destination file through a fixed-size
//! buffer. A write that transfers fewer bytes than were read fails the copy;
//! nothing is retried and partial destination content is left in place.

use crate::error::{Result, SnapshotError};
use crate::types::FileStatus;
use crate::utils::PERMISSION_BITS;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::info;

/// Size of the copy buffer
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Copy the content of `source` into a newly created `dest`
///
/// The destination is created with the permission bits in `status`, subject
/// to the process creation mask. A symlink already at `dest` is never
/// followed, so another snapshot's file cannot be rewritten through it.
/// Returns the number of bytes copied.
///
/// # Errors
///
/// - [`SnapshotError::Open`] if either file cannot be opened
/// - [`SnapshotError::Copy`] on a read error or short write
pub fn copy_file(source: &Path, dest: &Path, status: &FileStatus) -> Result<u64> {
    info!("copy {} ...", dest.display());

    let mut input = File::open(source).map_err(|source_err| SnapshotError::Open {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let mut output = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(status.permissions & PERMISSION_BITS)
        .custom_flags(nix::libc::O_NOFOLLOW)
        .open(dest)
        .map_err(|source_err| SnapshotError::Open {
            path: dest.to_path_buf(),
            source: source_err,
        })?;

    stream(&mut input, &mut output).map_err(|source_err| SnapshotError::Copy {
        path: source.to_path_buf(),
        source: source_err,
    })
}

fn stream<R: Read, W: Write>(input: &mut R, output: &mut W) -> io::Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;

    loop {
        let bytes_read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let written = output.write(&buffer[..bytes_read])?;
        if written != bytes_read {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {written} of {bytes_read} bytes"),
            ));
        }
        copied += bytes_read as u64;
    }

    output.flush()?;
    Ok(copied)
}
