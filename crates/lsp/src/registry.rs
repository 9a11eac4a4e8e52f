// SPDX-License-Identifier: MIT

//! Language-server descriptors: which server claims a file, where its
//! project root is, and how to spawn it.
//!
//! Ordering matters. For extensions claimed by more than one server the
//! earlier descriptor shadows the later one: the Deno entry precedes the
//! TypeScript entry so Deno projects (identified by a `deno.*` marker)
//! prefer the Deno server.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Child;

/// Environment flag that opts out of auto-installing server binaries.
pub const AUTO_INSTALL_OPT_OUT: &str = "HEW_NO_AUTO_INSTALL";

/// An npm package that provides a server binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpmPackage {
    pub package: &'static str,
    pub bin: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ServerDescriptor {
    pub id: &'static str,
    pub extensions: &'static [&'static str],
    /// Marker files identifying this server's project root.
    pub root_markers: &'static [&'static str],
    /// Whether the project directory is an acceptable root when no marker
    /// is found. Servers that require a marker get `false`.
    pub root_fallback: bool,
    pub command: &'static str,
    pub args: &'static [&'static str],
    /// Auto-install recipe for servers distributed through npm.
    pub install: Option<NpmPackage>,
}

impl ServerDescriptor {
    pub fn claims(&self, file: &Path) -> bool {
        let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions.contains(&ext)
    }

    /// Walk upward from `file` toward `project_dir` looking for any of the
    /// root markers; the walk never leaves `project_dir`.
    pub fn resolve_root(&self, file: &Path, project_dir: &Path) -> Option<PathBuf> {
        let mut dir = file.parent();
        while let Some(current) = dir {
            if !current.starts_with(project_dir) {
                break;
            }
            for marker in self.root_markers {
                if current.join(marker).exists() {
                    return Some(current.to_path_buf());
                }
            }
            if current == project_dir {
                break;
            }
            dir = current.parent();
        }
        if self.root_fallback {
            Some(project_dir.to_path_buf())
        } else {
            None
        }
    }

    /// Spawn the server process rooted at `root`, auto-installing the
    /// binary when allowed. Returns `None` when the binary cannot be
    /// found or installed.
    pub async fn spawn(&self, root: &Path) -> Option<Child> {
        let binary = self.locate_binary().await?;

        let mut cmd = tokio::process::Command::new(&binary);
        cmd.args(self.args)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match cmd.spawn() {
            Ok(child) => Some(child),
            Err(err) => {
                tracing::warn!(server = self.id, binary = %binary.display(), error = %err, "spawn failed");
                None
            }
        }
    }

    async fn locate_binary(&self) -> Option<PathBuf> {
        if let Some(path) = find_in_path(self.command) {
            return Some(path);
        }
        let install = self.install?;
        let cached = cache_bin_path(install.bin);
        if cached.is_file() {
            return Some(cached);
        }
        if std::env::var_os(AUTO_INSTALL_OPT_OUT).is_some() {
            tracing::debug!(server = self.id, "binary missing and auto-install opted out");
            return None;
        }
        install_npm_package(install).await
    }
}

/// Ordered sequence of descriptors.
#[derive(Debug, Clone)]
pub struct Registry {
    descriptors: Vec<ServerDescriptor>,
}

impl Registry {
    pub fn new(descriptors: Vec<ServerDescriptor>) -> Self {
        Self { descriptors }
    }

    /// The built-in server set.
    pub fn builtin() -> Self {
        Self::new(vec![
            ServerDescriptor {
                id: "deno",
                extensions: &["ts", "tsx", "js", "jsx", "mts", "mjs"],
                root_markers: &["deno.json", "deno.jsonc", "deno.lock"],
                root_fallback: false,
                command: "deno",
                args: &["lsp"],
                install: None,
            },
            ServerDescriptor {
                id: "typescript",
                extensions: &["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"],
                root_markers: &["tsconfig.json", "jsconfig.json", "package.json"],
                root_fallback: true,
                command: "typescript-language-server",
                args: &["--stdio"],
                install: Some(NpmPackage {
                    package: "typescript-language-server",
                    bin: "typescript-language-server",
                }),
            },
            ServerDescriptor {
                id: "pyright",
                extensions: &["py", "pyi"],
                root_markers: &[
                    "pyproject.toml",
                    "setup.py",
                    "requirements.txt",
                    "pyrightconfig.json",
                ],
                root_fallback: true,
                command: "pyright-langserver",
                args: &["--stdio"],
                install: Some(NpmPackage { package: "pyright", bin: "pyright-langserver" }),
            },
            ServerDescriptor {
                id: "rust-analyzer",
                extensions: &["rs"],
                root_markers: &["Cargo.toml"],
                root_fallback: false,
                command: "rust-analyzer",
                args: &[],
                install: None,
            },
            ServerDescriptor {
                id: "gopls",
                extensions: &["go"],
                root_markers: &["go.mod", "go.work"],
                root_fallback: false,
                command: "gopls",
                args: &[],
                install: None,
            },
        ])
    }

    /// Candidate descriptors for a file, in registration order.
    pub fn candidates_for(&self, file: &Path) -> Vec<&ServerDescriptor> {
        self.descriptors.iter().filter(|d| d.claims(file)).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn find_in_path(bin: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

/// Where auto-installed binaries land: `<cache>/hew/lsp/node_modules/.bin`.
fn cache_bin_path(bin: &str) -> PathBuf {
    cache_root().join("node_modules/.bin").join(bin)
}

fn cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hew/lsp")
}

async fn install_npm_package(install: NpmPackage) -> Option<PathBuf> {
    let prefix = cache_root();
    if tokio::fs::create_dir_all(&prefix).await.is_err() {
        return None;
    }
    tracing::info!(package = install.package, "installing language server");

    let status = tokio::process::Command::new("npm")
        .args(["install", "--prefix"])
        .arg(&prefix)
        .arg(install.package)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {
            let bin = cache_bin_path(install.bin);
            if bin.is_file() {
                Some(bin)
            } else {
                tracing::warn!(package = install.package, "install finished but binary missing");
                None
            }
        }
        Ok(status) => {
            tracing::warn!(package = install.package, %status, "npm install failed");
            None
        }
        Err(err) => {
            tracing::warn!(package = install.package, error = %err, "npm unavailable");
            None
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
