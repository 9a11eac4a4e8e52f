// SPDX-License-Identifier: MIT

//! Per-project language-server pool.
//!
//! Sessions are keyed by (server id, resolved root). Spawns for the same
//! key are deduplicated through a shared future, so two tasks racing on
//! `get_client` receive the same client. Keys that fail spawn or
//! initialize are quarantined for the life of the process: a second
//! lookup for a quarantined key costs a map probe, never a subprocess.

use crate::client::Client;
use crate::registry::{Registry, ServerDescriptor};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use hew_core::Clock;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sessions idle longer than this are reaped by [`LspManager::cleanup_idle`].
const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerKey {
    pub server_id: String,
    pub root: PathBuf,
}

struct ManagedServer {
    client: Client,
    last_used: Instant,
}

type SpawnFuture = Shared<BoxFuture<'static, Option<Client>>>;

struct ManagerInner<C: Clock> {
    project_dir: PathBuf,
    registry: Registry,
    clock: C,
    servers: Mutex<HashMap<ServerKey, ManagedServer>>,
    inflight: Mutex<HashMap<ServerKey, SpawnFuture>>,
    quarantine: Mutex<HashSet<ServerKey>>,
    spawn_attempts: AtomicU64,
}

#[derive(Clone)]
pub struct LspManager<C: Clock + 'static> {
    inner: Arc<ManagerInner<C>>,
}

impl<C: Clock + 'static> LspManager<C> {
    pub fn new(project_dir: impl Into<PathBuf>, registry: Registry, clock: C) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                project_dir: project_dir.into(),
                registry,
                clock,
                servers: Mutex::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
                quarantine: Mutex::new(HashSet::new()),
                spawn_attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Find or create a client able to answer for `file_path`.
    ///
    /// Candidates are tried in registry order; quarantined keys and
    /// keys without a resolvable root are skipped. Absence is an answer,
    /// not an error.
    pub async fn get_client(&self, file_path: &Path) -> Option<Client> {
        for descriptor in self.inner.registry.candidates_for(file_path) {
            let Some(root) = descriptor.resolve_root(file_path, &self.inner.project_dir) else {
                continue;
            };
            let key = ServerKey { server_id: descriptor.id.to_string(), root };

            if self.inner.quarantine.lock().contains(&key) {
                continue;
            }

            {
                let mut servers = self.inner.servers.lock();
                if let Some(managed) = servers.get_mut(&key) {
                    if managed.client.is_ready() {
                        managed.last_used = self.inner.clock.now();
                        return Some(managed.client.clone());
                    }
                    // The child died behind our back; evict and respawn.
                    servers.remove(&key);
                }
            }

            let spawn = {
                let mut inflight = self.inner.inflight.lock();
                match inflight.get(&key) {
                    Some(existing) => existing.clone(),
                    None => {
                        let fut =
                            spawn_and_connect(self.inner.clone(), *descriptor, key.clone())
                                .boxed()
                                .shared();
                        inflight.insert(key.clone(), fut.clone());
                        fut
                    }
                }
            };

            if let Some(client) = spawn.await {
                return Some(client);
            }
        }
        None
    }

    /// Kill every managed child and clear the pool.
    pub async fn stop_all(&self) {
        let drained: Vec<ManagedServer> = {
            let mut servers = self.inner.servers.lock();
            servers.drain().map(|(_, managed)| managed).collect()
        };
        for managed in drained {
            managed.client.stop().await;
        }
    }

    /// Stop sessions whose last use exceeds the idle ceiling.
    pub async fn cleanup_idle(&self) {
        let now = self.inner.clock.now();
        let expired: Vec<(ServerKey, Client)> = {
            let mut servers = self.inner.servers.lock();
            let keys: Vec<ServerKey> = servers
                .iter()
                .filter(|(_, managed)| {
                    now.saturating_duration_since(managed.last_used) > IDLE_TIMEOUT
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| servers.remove(&key).map(|managed| (key, managed.client)))
                .collect()
        };
        for (key, client) in expired {
            tracing::debug!(server = %key.server_id, root = %key.root.display(), "reaping idle language server");
            client.stop().await;
        }
    }

    /// Forget quarantined keys, optionally only those for one server id.
    pub fn reset_broken(&self, server_id: Option<&str>) {
        let mut quarantine = self.inner.quarantine.lock();
        match server_id {
            Some(id) => quarantine.retain(|key| key.server_id != id),
            None => quarantine.clear(),
        }
    }

    /// How many subprocess spawns were attempted. Observability and a
    /// cheap way to verify the quarantine short-circuit.
    pub fn spawn_attempts(&self) -> u64 {
        self.inner.spawn_attempts.load(Ordering::Relaxed)
    }

    pub fn quarantined_count(&self) -> usize {
        self.inner.quarantine.lock().len()
    }

    #[cfg(test)]
    fn insert_server(&self, key: ServerKey, client: Client) {
        self.inner
            .servers
            .lock()
            .insert(key, ManagedServer { client, last_used: self.inner.clock.now() });
    }

    #[cfg(test)]
    fn server_count(&self) -> usize {
        self.inner.servers.lock().len()
    }
}

/// The deduplicated spawn path: spawn, connect, register, or quarantine.
async fn spawn_and_connect<C: Clock + 'static>(
    inner: Arc<ManagerInner<C>>,
    descriptor: ServerDescriptor,
    key: ServerKey,
) -> Option<Client> {
    inner.spawn_attempts.fetch_add(1, Ordering::Relaxed);

    let connected = match descriptor.spawn(&key.root).await {
        Some(child) => match Client::connect(descriptor.id, &key.root, child).await {
            Ok(client) => Some(client),
            Err(err) => {
                // connect() already stopped the client, which kills the
                // child.
                tracing::warn!(server = descriptor.id, error = %err, "language server failed to initialize");
                None
            }
        },
        None => None,
    };

    match connected {
        Some(client) => {
            inner.servers.lock().insert(
                key.clone(),
                ManagedServer { client: client.clone(), last_used: inner.clock.now() },
            );
            inner.inflight.lock().remove(&key);
            Some(client)
        }
        None => {
            tracing::warn!(server = %key.server_id, root = %key.root.display(), "quarantining broken server");
            inner.quarantine.lock().insert(key.clone());
            inner.inflight.lock().remove(&key);
            None
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
