//! End-to-end snapshot scenarios
//!
//! Each test drives full runs through [`SnapshotterBuilder`] against real
//! temporary directories and inspects the trees they leave behind.

use ::isnapshot::*;
use chrono::{NaiveDate, NaiveDateTime};
use filetime::FileTime;
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Test harness owning a source tree and a destination root
pub struct SnapshotHarness {
    pub source_dir: TempDir,
    pub backup_dir: TempDir,
    run: u32,
}

impl SnapshotHarness {
    /// Create a new harness with empty source and destination directories
    pub fn new() -> Self {
        Self {
            source_dir: TempDir::new().unwrap(),
            backup_dir: TempDir::new().unwrap(),
            run: 0,
        }
    }

    pub fn source(&self) -> &Path {
        self.source_dir.path()
    }

    /// Write `content` to a source file and pin its modification time
    pub fn write(&self, relative: &str, content: &[u8], mtime: i64) -> anyhow::Result<PathBuf> {
        let path = self.source().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0))?;
        Ok(path)
    }

    /// Run a snapshot with a distinct, increasing timestamp
    pub fn snapshot_with(&mut self, builder: SnapshotterBuilder) -> Result<SnapshotReport> {
        self.run += 1;
        let snapshotter = builder
            .creation_mask(0o022)
            .build(vec![self.source().to_path_buf()], self.backup_dir.path().to_path_buf())?;
        snapshotter.snapshot_at(Self::time_of_run(self.run))
    }

    pub fn snapshot(&mut self) -> Result<SnapshotReport> {
        self.snapshot_with(SnapshotterBuilder::new())
    }

    fn time_of_run(run: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(8, run / 60, run % 60)
            .unwrap()
    }

    /// Path of a source file inside a snapshot
    pub fn in_snapshot(&self, report: &SnapshotReport, relative: &str) -> PathBuf {
        utils::join_path(&report.snapshot_path, &self.source().join(relative))
    }

    /// Relative paths of every entry below the mirrored source root
    pub fn listing(&self, report: &SnapshotReport) -> Vec<PathBuf> {
        let root = utils::join_path(&report.snapshot_path, self.source());
        let mut entries: Vec<PathBuf> = WalkDir::new(&root)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.path().strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        entries.sort();
        entries
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).unwrap().file_type().is_symlink()
}

#[test]
fn test_two_run_scenario() {
    let mut harness = SnapshotHarness::new();
    harness.write("a/f1", b"first version", 1_000).unwrap();
    harness.write("a/f2", b"stable", 2_000).unwrap();

    let run1 = harness.snapshot().unwrap();
    let f1_run1 = harness.in_snapshot(&run1, "a/f1");
    let f2_run1 = harness.in_snapshot(&run1, "a/f2");
    assert!(!is_symlink(&f1_run1));
    assert!(!is_symlink(&f2_run1));
    assert_eq!(fs::read(&f2_run1).unwrap(), b"stable");

    harness.write("a/f1", b"second version, longer", 3_000).unwrap();

    let run2 = harness.snapshot().unwrap();
    assert_eq!(run2.previous_snapshot.as_deref(), Some(run1.snapshot_path.as_path()));

    let f1_run2 = harness.in_snapshot(&run2, "a/f1");
    let f2_run2 = harness.in_snapshot(&run2, "a/f2");
    assert!(!is_symlink(&f1_run2));
    assert_eq!(fs::read(&f1_run2).unwrap(), b"second version, longer");
    let metadata = fs::metadata(&f1_run2).unwrap();
    assert_eq!(metadata.len(), 22);
    assert_eq!(
        FileTime::from_last_modification_time(&metadata),
        FileTime::from_unix_time(3_000, 0)
    );

    assert!(is_symlink(&f2_run2));
    assert_eq!(fs::read_link(&f2_run2).unwrap(), f2_run1);

    // Run 1 is untouched by run 2
    assert_eq!(fs::read(&f1_run1).unwrap(), b"first version");
}

#[test]
fn test_links_never_chain() {
    let mut harness = SnapshotHarness::new();
    harness.write("doc.txt", b"unchanging", 500).unwrap();

    let run1 = harness.snapshot().unwrap();
    let _run2 = harness.snapshot().unwrap();
    let run3 = harness.snapshot().unwrap();

    let original = harness.in_snapshot(&run1, "doc.txt");
    let latest = harness.in_snapshot(&run3, "doc.txt");
    assert_eq!(fs::read_link(&latest).unwrap(), original);
    assert_eq!(fs::read(&latest).unwrap(), b"unchanging");
}

#[test]
fn test_no_previous_copies_regardless_of_force() {
    for force in [false, true] {
        let mut harness = SnapshotHarness::new();
        harness.write("x/y", b"y", 10).unwrap();
        harness.write("z", b"z", 20).unwrap();

        let report = harness
            .snapshot_with(SnapshotterBuilder::new().force_full_copy(force))
            .unwrap();
        assert!(report.previous_snapshot.is_none());
        assert_eq!(report.stats.files_copied, 2);
        assert_eq!(report.stats.files_linked, 0);
        assert!(!is_symlink(&harness.in_snapshot(&report, "x/y")));
    }
}

#[test]
fn test_force_full_copy_after_previous() {
    let mut harness = SnapshotHarness::new();
    harness.write("same", b"same", 10).unwrap();
    harness.snapshot().unwrap();

    let report = harness
        .snapshot_with(SnapshotterBuilder::new().force_full_copy(true))
        .unwrap();
    assert!(report.previous_snapshot.is_some());
    assert!(!is_symlink(&harness.in_snapshot(&report, "same")));
    assert_eq!(report.stats.files_copied, 1);
}

#[test]
fn test_byte_counting() {
    let mut harness = SnapshotHarness::new();
    harness.write("small", &[1u8; 10], 10).unwrap();
    harness.write("large", &[2u8; 1000], 20).unwrap();

    let builder = || SnapshotterBuilder::new().count_bytes(true);
    let run1 = harness.snapshot_with(builder()).unwrap();
    assert_eq!(run1.stats.total_bytes, 1010);
    assert_eq!(run1.stats.bytes_copied, 1010);

    harness.write("small", &[3u8; 12], 30).unwrap();
    let run2 = harness.snapshot_with(builder()).unwrap();
    assert_eq!(run2.stats.total_bytes, 1012);
    assert_eq!(run2.stats.bytes_copied, 12);

    // Counting is opt-in
    let run3 = harness.snapshot().unwrap();
    assert_eq!(run3.stats.total_bytes, 0);
    assert_eq!(run3.stats.files_linked, 2);
}

#[test]
fn test_exclusion_scenario() {
    let mut harness = SnapshotHarness::new();
    harness.write("src/main.rs", b"fn main() {}", 10).unwrap();
    harness.write("target/debug/app", b"\x7fELF", 10).unwrap();
    harness.write("notes.swp", b"swap", 10).unwrap();

    let report = harness
        .snapshot_with(SnapshotterBuilder::new().exclude_pattern("{*/target,*.swp}"))
        .unwrap();

    assert_eq!(
        harness.listing(&report),
        vec![PathBuf::from("src"), PathBuf::from("src/main.rs")]
    );
    assert_eq!(report.stats.excluded, 2);
}

#[test]
fn test_symlink_to_etc_hosts() {
    let mut harness = SnapshotHarness::new();
    let link = harness.source().join("hosts");
    std::os::unix::fs::symlink("/etc/hosts", &link).unwrap();

    let report = harness.snapshot().unwrap();
    let mirrored = harness.in_snapshot(&report, "hosts");

    assert_eq!(fs::read_link(&mirrored).unwrap(), PathBuf::from("/etc/hosts"));
    let source_meta = fs::symlink_metadata(&link).unwrap();
    let mirrored_meta = fs::symlink_metadata(&mirrored).unwrap();
    assert_eq!(mirrored_meta.uid(), source_meta.uid());
    assert_eq!(mirrored_meta.gid(), source_meta.gid());
}

#[test]
fn test_dangling_and_relative_symlinks() {
    let mut harness = SnapshotHarness::new();
    std::os::unix::fs::symlink("../outside/nowhere", harness.source().join("dangling")).unwrap();
    harness.write("dir/real", b"r", 10).unwrap();
    std::os::unix::fs::symlink("real", harness.source().join("dir/alias")).unwrap();

    let report = harness.snapshot().unwrap();

    assert_eq!(
        fs::read_link(harness.in_snapshot(&report, "dangling")).unwrap(),
        PathBuf::from("../outside/nowhere")
    );
    let alias = harness.in_snapshot(&report, "dir/alias");
    assert_eq!(fs::read_link(&alias).unwrap(), PathBuf::from("real"));
    assert_eq!(fs::read(&alias).unwrap(), b"r");
    assert_eq!(report.stats.symlinks, 2);
}

#[test]
fn test_fifo_scenario() {
    use nix::sys::stat::Mode;

    let mut harness = SnapshotHarness::new();
    let fifo = harness.source().join("queue");
    nix::unistd::mkfifo(&fifo, Mode::from_bits_truncate(0o600)).unwrap();
    utils::set_permissions(&fifo, 0o604).unwrap();

    let report = harness.snapshot().unwrap();
    let mirrored = harness.in_snapshot(&report, "queue");
    let metadata = fs::symlink_metadata(&mirrored).unwrap();

    assert!(metadata.file_type().is_fifo());
    assert_eq!(metadata.mode() & 0o7777, 0o604);
    assert_eq!(metadata.len(), 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_socket_scenario() {
    let mut harness = SnapshotHarness::new();
    let socket = harness.source().join("daemon.sock");
    let _listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();

    let report = harness.snapshot().unwrap();
    let mirrored = harness.in_snapshot(&report, "daemon.sock");
    assert!(fs::symlink_metadata(&mirrored).unwrap().file_type().is_socket());
    assert_eq!(report.stats.special_files, 1);
}

#[test]
fn test_deleted_and_added_files() {
    let mut harness = SnapshotHarness::new();
    let gone = harness.write("gone", b"bye", 10).unwrap();
    harness.write("kept", b"stay", 10).unwrap();
    harness.snapshot().unwrap();

    fs::remove_file(gone).unwrap();
    harness.write("new", b"hello", 20).unwrap();
    let report = harness.snapshot().unwrap();

    assert_eq!(
        harness.listing(&report),
        vec![PathBuf::from("kept"), PathBuf::from("new")]
    );
    assert!(is_symlink(&harness.in_snapshot(&report, "kept")));
    assert!(!is_symlink(&harness.in_snapshot(&report, "new")));
}

#[test]
fn test_permissions_and_times_preserved() {
    let mut harness = SnapshotHarness::new();
    let script = harness.write("bin/run.sh", b"#!/bin/sh\n", 1_234).unwrap();
    utils::set_permissions(&script, 0o750).unwrap();
    filetime::set_file_mtime(harness.source().join("bin"), FileTime::from_unix_time(4_321, 0))
        .unwrap();

    let report = harness.snapshot().unwrap();

    let copy = fs::metadata(harness.in_snapshot(&report, "bin/run.sh")).unwrap();
    assert_eq!(copy.mode() & 0o7777, 0o750);
    assert_eq!(
        FileTime::from_last_modification_time(&copy),
        FileTime::from_unix_time(1_234, 0)
    );

    let dir = fs::metadata(harness.in_snapshot(&report, "bin")).unwrap();
    assert_eq!(
        FileTime::from_last_modification_time(&dir),
        FileTime::from_unix_time(4_321, 0)
    );
}

#[test]
fn test_latest_snapshot_chosen_by_time_not_name() {
    let mut harness = SnapshotHarness::new();
    harness.write("f", b"v1", 100).unwrap();

    // A stale snapshot from a later month but earlier year sorts after ours lexically
    let stale = harness.backup_dir.path().join("12-31-99-23-59-59");
    fs::create_dir(&stale).unwrap();

    let run1 = harness.snapshot().unwrap();
    assert_eq!(run1.previous_snapshot.as_deref(), Some(stale.as_path()));

    let run2 = harness.snapshot().unwrap();
    assert_eq!(run2.previous_snapshot.as_deref(), Some(run1.snapshot_path.as_path()));
    assert!(is_symlink(&harness.in_snapshot(&run2, "f")));
}
