// SPDX-License-Identifier: MIT

//! Thin wrapper over git subprocess invocations.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

/// Ceiling for any single git invocation. Plumbing commands on local
/// repositories finish in milliseconds; anything slower is wedged.
const GIT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub status_ok: bool,
}

/// Run `git <args>` in `cwd` with optional extra environment variables.
///
/// Returns `Err` only for spawn failures and timeouts; a non-zero exit is
/// reported through `status_ok` with stderr captured.
pub(crate) async fn run_git(
    cwd: &Path,
    env: &[(&str, &str)],
    args: &[&str],
) -> Result<GitOutput, String> {
    let mut cmd = tokio::process::Command::new("git");
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let output = match tokio::time::timeout(GIT_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => return Err(format!("failed to run git {}: {}", args.join(" "), err)),
        Err(_) => return Err(format!("git {} timed out", args.join(" "))),
    };

    Ok(GitOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status_ok: output.status.success(),
    })
}

/// Run git and require exit code 0, folding stderr into the error string.
pub(crate) async fn run_git_ok(
    cwd: &Path,
    env: &[(&str, &str)],
    args: &[&str],
) -> Result<String, String> {
    let out = run_git(cwd, env, args).await?;
    if out.status_ok {
        Ok(out.stdout)
    } else {
        let stderr = out.stderr.trim();
        if stderr.is_empty() {
            Err(format!("git {} failed", args.join(" ")))
        } else {
            Err(format!("git {} failed: {}", args.join(" "), stderr))
        }
    }
}

/// Whether `cwd` is inside a git work tree.
pub(crate) async fn is_work_tree(cwd: &Path) -> bool {
    matches!(
        run_git(cwd, &[], &["rev-parse", "--is-inside-work-tree"]).await,
        Ok(out) if out.status_ok && out.stdout.trim() == "true"
    )
}

/// Absolute path of the repository's git directory.
pub(crate) async fn git_dir(cwd: &Path) -> Result<std::path::PathBuf, String> {
    let out = run_git_ok(cwd, &[], &["rev-parse", "--absolute-git-dir"]).await?;
    Ok(std::path::PathBuf::from(out.trim()))
}
