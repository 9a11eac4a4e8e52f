// SPDX-License-Identifier: MIT

//! Synthesize a diff, apply it through the filesystem applier, and end
//! up with the target text.

use hew_patch::{apply, parse, synthesize};

#[tokio::test]
async fn synthesized_diffs_apply_back_onto_the_tree() {
    let dir = tempfile::tempdir().unwrap();
    let old = "fn main() {\n    println!(\"hello\");\n}\n";
    let new = "fn main() {\n    let name = \"world\";\n    println!(\"hello {name}\");\n}\n";
    tokio::fs::write(dir.path().join("main.rs"), old).await.unwrap();

    let diff = synthesize(old, new, "main.rs");
    let patch = parse(&diff).unwrap();
    let report = apply(&patch, dir.path()).await.unwrap();

    assert_eq!(report.files.len(), 1);
    let result = tokio::fs::read_to_string(dir.path().join("main.rs")).await.unwrap();
    assert_eq!(result, new);
}

#[tokio::test]
async fn multi_file_patch_applies_in_order() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("a.txt"), "alpha\n").await.unwrap();

    let diff = "\
--- a/a.txt
+++ b/a.txt
@@ -1,1 +1,1 @@
-alpha
+ALPHA
--- /dev/null
+++ b/sub/b.txt
@@ -1,0 +1,1 @@
+beta
";
    let patch = parse(diff).unwrap();
    let report = apply(&patch, dir.path()).await.unwrap();

    assert_eq!(report.files.len(), 2);
    assert!(report.files[1].created);
    assert_eq!(
        tokio::fs::read_to_string(dir.path().join("a.txt")).await.unwrap(),
        "ALPHA\n"
    );
    assert_eq!(
        tokio::fs::read_to_string(dir.path().join("sub/b.txt")).await.unwrap(),
        "beta"
    );
}
