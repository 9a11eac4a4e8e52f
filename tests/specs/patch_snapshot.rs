// SPDX-License-Identifier: MIT

//! The atomicity pairing: snapshot before a patch, roll back after a
//! partial failure.

use hew_core::FakeClock;
use hew_patch::{apply, parse};
use hew_snapshot::Snapshots;
use std::process::Command;

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git_init(dir: &std::path::Path) {
    assert!(Command::new("git")
        .args(["init", "-q"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

#[tokio::test]
async fn snapshot_reverts_a_partially_applied_patch() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    git_init(dir.path());
    tokio::fs::write(dir.path().join("ok.txt"), "one\n").await.unwrap();
    tokio::fs::write(dir.path().join("bad.txt"), "two\n").await.unwrap();

    let snaps = Snapshots::new(dir.path(), FakeClock::new());
    let snapshot = snaps.track(Some("before patch")).await;
    assert!(snapshot.success);
    let hash = snapshot.hash.unwrap();

    // First file applies, second file's hunk is out of range.
    let diff = "\
--- a/ok.txt
+++ b/ok.txt
@@ -1,1 +1,1 @@
-one
+ONE
--- a/bad.txt
+++ b/bad.txt
@@ -50,1 +50,1 @@
-two
+TWO
";
    let patch = parse(diff).unwrap();
    assert!(apply(&patch, dir.path()).await.is_err());

    // Half-applied state on disk, by design.
    let half = tokio::fs::read_to_string(dir.path().join("ok.txt")).await.unwrap();
    assert_eq!(half, "ONE\n");

    // The snapshot layer is the undo.
    let restore = snaps.restore(&hash).await;
    assert!(restore.success, "restore error: {:?}", restore.error);
    let reverted = tokio::fs::read_to_string(dir.path().join("ok.txt")).await.unwrap();
    assert_eq!(reverted, "one\n");
}

#[tokio::test]
async fn per_file_revert_keeps_other_edits() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    git_init(dir.path());
    tokio::fs::write(dir.path().join("keep.txt"), "keep-v1\n").await.unwrap();
    tokio::fs::write(dir.path().join("undo.txt"), "undo-v1\n").await.unwrap();

    let snaps = Snapshots::new(dir.path(), FakeClock::new());
    let hash = snaps.track(None).await.hash.unwrap();

    tokio::fs::write(dir.path().join("keep.txt"), "keep-v2\n").await.unwrap();
    tokio::fs::write(dir.path().join("undo.txt"), "undo-v2\n").await.unwrap();

    assert!(snaps.revert_files(&hash, &["undo.txt"]).await.success);

    assert_eq!(
        tokio::fs::read_to_string(dir.path().join("undo.txt")).await.unwrap(),
        "undo-v1\n"
    );
    assert_eq!(
        tokio::fs::read_to_string(dir.path().join("keep.txt")).await.unwrap(),
        "keep-v2\n"
    );
}
