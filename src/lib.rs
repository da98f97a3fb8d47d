//! # isnapshot - Incremental directory snapshots
//!
//! Space-efficient incremental backups built from plain directories and
//! symbolic links.
//!
//! ## Overview
//!
//! Every run creates a timestamped snapshot directory under a destination
//! root. Files that are unchanged since the most recent snapshot become
//! symlinks into that snapshot; new or changed files are copied in full.
//! Each snapshot therefore looks like a complete copy of the source trees
//! while sharing storage for everything that did not change.
//!
//! ```text
//! /backup/
//! ├── 06-01-24-10-00-00/home/user/a/f1      (copy)
//! ├── 06-01-24-10-00-00/home/user/a/f2      (copy)
//! ├── 06-02-24-10-00-00/home/user/a/f1      (copy, changed)
//! └── 06-02-24-10-00-00/home/user/a/f2 ->   /backup/06-01-24-10-00-00/home/user/a/f2
//! ```
//!
//! Directories, symlinks, FIFOs, device nodes and sockets are recreated
//! with their metadata.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use isnapshot::SnapshotterBuilder;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshotter = SnapshotterBuilder::new()
//!     .build(vec![PathBuf::from("/home/user")], PathBuf::from("/backup"))?;
//!
//! let report = snapshotter.snapshot()?;
//! println!("Snapshot at {}", report.snapshot_path.display());
//! println!(
//!     "{} files copied, {} linked",
//!     report.stats.files_copied, report.stats.files_linked
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Snapshots
//!
//! A snapshot is a directory whose name is the run's start time rendered
//! with the configured date format. The same format decodes existing names
//! to find the previous snapshot, so it must round-trip. Names that do not
//! decode are ignored, which lets unrelated files live in the destination
//! root.
//!
//! ### Change Detection
//!
//! A regular file is unchanged when its modification time is exactly equal
//! to that of the previous snapshot's copy. Size and content are not
//! compared. Copies carry the source's modification time forward.
//!
//! ### Failures
//!
//! The first failing entry aborts its directory and, through it, the run.
//! Partially written snapshots are left in place. Metadata that cannot be
//! applied (times, ownership, permissions) is logged and counted but does
//! not fail the run.
//!
//! ## Module Organization
//!
//! - [`snapshotter`]: run orchestration and configuration builder
//! - [`walker`]: tree traversal and copy-or-link decisions
//! - [`locator`]: previous-snapshot discovery
//! - [`timestamp`]: snapshot naming
//! - [`copy`], [`link`], [`special`], [`metadata`], [`dirs`]: filesystem primitives
//! - [`types`]: common types and data structures
//! - [`error`]: error types and handling

#![cfg(unix)]

// Public API modules
pub mod error;
pub mod locator;
pub mod snapshotter;
pub mod timestamp;
pub mod types;
pub mod walker;

// Filesystem primitives
pub mod copy;
pub mod dirs;
pub mod link;
pub mod metadata;
pub mod special;
pub mod utils;

// Re-export main types for convenience
pub use error::{Result, SnapshotError};
pub use snapshotter::{Snapshotter, SnapshotterBuilder};
pub use timestamp::TimestampFormat;
pub use types::*;
pub use walker::TreeWalker;
