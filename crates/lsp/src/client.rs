// SPDX-License-Identifier: MIT

//! One connected language-server session.
//!
//! A client owns a writer task (serialising every outgoing frame, which
//! preserves didOpen/didChange ordering) and a reader task (decoding
//! frames and dispatching responses by id). States move one way:
//! `Disconnected → Initializing → Ready → Stopped`; a client is never
//! re-initialized.

use crate::protocol::{
    initialize_params, language_id_for_path, path_to_uri, CallHierarchyItem, CompletionItem,
    Diagnostic, DocumentSymbol, IncomingCall, Location, OutgoingCall, Position,
};
use crate::transport::{encode_frame, FrameDecoder};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Ceiling on the `initialize` handshake.
const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(45);

/// Default ceiling on any other request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Initializing,
    Ready,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("language server did not produce stdio pipes")]
    NoStdio,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("language server stopped")]
    Stopped,

    #[error("language server error: {0}")]
    Server(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

struct OpenDocument {
    language_id: &'static str,
    version: i64,
    #[allow(dead_code)]
    text: String,
}

type Resolver = oneshot::Sender<Result<Value, ClientError>>;

struct ClientInner {
    server_id: String,
    root_uri: String,
    state: Mutex<ClientState>,
    next_id: AtomicI64,
    writer_tx: mpsc::UnboundedSender<Vec<u8>>,
    pending: Mutex<HashMap<i64, Resolver>>,
    documents: Mutex<HashMap<String, OpenDocument>>,
    diagnostics: Mutex<HashMap<String, Vec<Diagnostic>>>,
    child: Mutex<Option<Child>>,
}

/// Handle to a language-server session. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Connect over a spawned child process: wire up stdio, drain stderr,
    /// and run the `initialize` handshake.
    pub async fn connect(
        server_id: &str,
        root: &Path,
        mut child: Child,
    ) -> Result<Self, ClientError> {
        let stdin = child.stdin.take().ok_or(ClientError::NoStdio)?;
        let stdout = child.stdout.take().ok_or(ClientError::NoStdio)?;
        if let Some(stderr) = child.stderr.take() {
            // Drained but never surfaced.
            tokio::spawn(async move {
                let mut stderr = stderr;
                let mut sink = [0u8; 4096];
                while matches!(stderr.read(&mut sink).await, Ok(n) if n > 0) {}
            });
        }
        Self::connect_io(server_id, root, stdin, stdout, Some(child)).await
    }

    /// Connect over arbitrary streams. Used directly by tests, which speak
    /// the protocol over in-memory pipes instead of a subprocess.
    pub async fn connect_io<W, R>(
        server_id: &str,
        root: &Path,
        writer: W,
        reader: R,
        child: Option<Child>,
    ) -> Result<Self, ClientError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ClientInner {
            server_id: server_id.to_string(),
            root_uri: path_to_uri(root),
            state: Mutex::new(ClientState::Disconnected),
            next_id: AtomicI64::new(0),
            writer_tx,
            pending: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
            diagnostics: Mutex::new(HashMap::new()),
            child: Mutex::new(child),
        });

        spawn_writer(writer, writer_rx);
        spawn_reader(reader, Arc::downgrade(&inner));

        let client = Self { inner };
        *client.inner.state.lock() = ClientState::Initializing;
        let params = initialize_params(&client.inner.root_uri);
        match client
            .request("initialize", params, INITIALIZE_TIMEOUT, &CancellationToken::new())
            .await
        {
            Ok(_) => {
                client.inner.notify("initialized", json!({}));
                *client.inner.state.lock() = ClientState::Ready;
                tracing::debug!(server = %client.inner.server_id, root = %client.inner.root_uri, "language server ready");
                Ok(client)
            }
            Err(err) => {
                tracing::warn!(server = %client.inner.server_id, error = %err, "initialize failed");
                client.stop().await;
                Err(err)
            }
        }
    }

    pub fn state(&self) -> ClientState {
        *self.inner.state.lock()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ClientState::Ready
    }

    pub fn server_id(&self) -> &str {
        &self.inner.server_id
    }

    /// Open a document, or promote to a versioned change if the uri is
    /// already open. Never fails; if the server is gone the notification
    /// is silently dropped.
    pub fn did_open(&self, path: &Path, text: &str) {
        let uri = path_to_uri(path);
        let mut documents = self.inner.documents.lock();
        match documents.get_mut(&uri) {
            Some(doc) => {
                doc.version += 1;
                doc.text = text.to_string();
                let version = doc.version;
                drop(documents);
                self.inner.notify(
                    "textDocument/didChange",
                    json!({
                        "textDocument": { "uri": uri, "version": version },
                        "contentChanges": [{ "text": text }]
                    }),
                );
            }
            None => {
                let language_id = language_id_for_path(path);
                documents.insert(
                    uri.clone(),
                    OpenDocument { language_id, version: 1, text: text.to_string() },
                );
                drop(documents);
                self.inner.notify(
                    "textDocument/didOpen",
                    json!({
                        "textDocument": {
                            "uri": uri,
                            "languageId": language_id,
                            "version": 1,
                            "text": text
                        }
                    }),
                );
            }
        }
    }

    pub fn did_close(&self, path: &Path) {
        let uri = path_to_uri(path);
        if self.inner.documents.lock().remove(&uri).is_some() {
            self.inner
                .notify("textDocument/didClose", json!({ "textDocument": { "uri": uri } }));
        }
    }

    /// Diagnostics last published by the server for a file. Pure cache
    /// read; never waits on the server.
    pub fn get_diagnostics(&self, path: &Path) -> Vec<Diagnostic> {
        self.inner
            .diagnostics
            .lock()
            .get(&path_to_uri(path))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn hover(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, ClientError> {
        let result = self
            .request(
                "textDocument/hover",
                text_document_position(path, position),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        Ok(non_null(result))
    }

    pub async fn definition(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<Location>, ClientError> {
        let result = self
            .request(
                "textDocument/definition",
                text_document_position(path, position),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        Ok(parse_locations(result))
    }

    pub async fn references(
        &self,
        path: &Path,
        position: Position,
        include_declaration: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Location>, ClientError> {
        let mut params = text_document_position(path, position);
        params["context"] = json!({ "includeDeclaration": include_declaration });
        let result = self
            .request("textDocument/references", params, REQUEST_TIMEOUT, cancel)
            .await?;
        Ok(parse_locations(result))
    }

    pub async fn document_symbols(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<DocumentSymbol>, ClientError> {
        let params = json!({ "textDocument": { "uri": path_to_uri(path) } });
        let result = self
            .request("textDocument/documentSymbol", params, REQUEST_TIMEOUT, cancel)
            .await?;
        parse_list(result)
    }

    pub async fn workspace_symbols(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DocumentSymbol>, ClientError> {
        let result = self
            .request("workspace/symbol", json!({ "query": query }), REQUEST_TIMEOUT, cancel)
            .await?;
        parse_list(result)
    }

    /// Completion accepts either a bare item list or a `{items: [...]}`
    /// envelope.
    pub async fn completion(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompletionItem>, ClientError> {
        let result = self
            .request(
                "textDocument/completion",
                text_document_position(path, position),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        let items = match result {
            Value::Object(ref obj) if obj.contains_key("items") => {
                result.get("items").cloned().unwrap_or(Value::Null)
            }
            other => other,
        };
        parse_list(items)
    }

    pub async fn prepare_rename(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, ClientError> {
        let result = self
            .request(
                "textDocument/prepareRename",
                text_document_position(path, position),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        Ok(non_null(result))
    }

    /// Returns the server's `WorkspaceEdit` untouched; applying it is the
    /// caller's business.
    pub async fn rename(
        &self,
        path: &Path,
        position: Position,
        new_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, ClientError> {
        let mut params = text_document_position(path, position);
        params["newName"] = json!(new_name);
        let result = self
            .request("textDocument/rename", params, REQUEST_TIMEOUT, cancel)
            .await?;
        Ok(non_null(result))
    }

    pub async fn goto_implementation(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<Location>, ClientError> {
        let result = self
            .request(
                "textDocument/implementation",
                text_document_position(path, position),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        Ok(parse_locations(result))
    }

    pub async fn prepare_call_hierarchy(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<CallHierarchyItem>, ClientError> {
        let result = self
            .request(
                "textDocument/prepareCallHierarchy",
                text_document_position(path, position),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        parse_list(result)
    }

    pub async fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
        cancel: &CancellationToken,
    ) -> Result<Vec<IncomingCall>, ClientError> {
        let result = self
            .request(
                "callHierarchy/incomingCalls",
                json!({ "item": item }),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        parse_list(result)
    }

    pub async fn outgoing_calls(
        &self,
        item: &CallHierarchyItem,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutgoingCall>, ClientError> {
        let result = self
            .request(
                "callHierarchy/outgoingCalls",
                json!({ "item": item }),
                REQUEST_TIMEOUT,
                cancel,
            )
            .await?;
        parse_list(result)
    }

    /// Reject every pending request, terminate the child, and clear all
    /// per-session state. Idempotent.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == ClientState::Stopped {
                return;
            }
            *state = ClientState::Stopped;
        }
        self.inner.reject_pending();
        self.inner.documents.lock().clear();
        self.inner.diagnostics.lock().clear();

        let child = self.inner.child.lock().take();
        if let Some(mut child) = child {
            terminate(&mut child);
            // Reap off-task so stop() never blocks on a slow exit.
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
        }
    }

    /// Issue a raw request: assign the next id, register a one-shot
    /// resolver, and wait for response, timeout, cancellation, or process
    /// exit, whichever settles first.
    async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Value, ClientError> {
        if self.state() == ClientState::Stopped {
            return Err(ClientError::Stopped);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(id, tx);

        let frame = encode_frame(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }));
        if self.inner.writer_tx.send(frame).is_err() {
            self.inner.pending.lock().remove(&id);
            return Err(ClientError::Stopped);
        }

        tokio::select! {
            settled = rx => match settled {
                Ok(result) => result,
                Err(_) => Err(ClientError::Stopped),
            },
            _ = tokio::time::sleep(timeout) => {
                self.inner.pending.lock().remove(&id);
                Err(ClientError::Timeout(timeout))
            }
            _ = cancel.cancelled() => {
                self.inner.pending.lock().remove(&id);
                Err(ClientError::Cancelled)
            }
        }
    }
}

impl ClientInner {
    fn notify(&self, method: &str, params: Value) {
        let frame = encode_frame(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        }));
        let _ = self.writer_tx.send(frame);
    }

    fn reject_pending(&self) {
        let pending: Vec<Resolver> = {
            let mut map = self.pending.lock();
            map.drain().map(|(_, tx)| tx).collect()
        };
        for tx in pending {
            let _ = tx.send(Err(ClientError::Stopped));
        }
    }

    /// Route one decoded frame. Invalid JSON is dropped without error.
    fn dispatch(&self, frame: &[u8]) {
        let message: Value = match serde_json::from_slice(frame) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(server = %self.server_id, error = %err, "dropping undecodable frame");
                return;
            }
        };

        let id = message.get("id");
        let method = message.get("method").and_then(Value::as_str);

        match (id, method) {
            // Server-originated request: this client does not participate
            // in reverse RPC, so answer with a null result.
            (Some(id), Some(_)) => {
                let frame = encode_frame(&json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": null
                }));
                let _ = self.writer_tx.send(frame);
            }
            // Response to one of ours.
            (Some(id), None) => {
                let Some(id) = id.as_i64() else {
                    return;
                };
                let resolver = self.pending.lock().remove(&id);
                if let Some(tx) = resolver {
                    let settled = match message.get("error") {
                        Some(err) => Err(ClientError::Server(err.to_string())),
                        None => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(settled);
                }
            }
            (None, Some("textDocument/publishDiagnostics")) => {
                let params = message.get("params").cloned().unwrap_or(Value::Null);
                let uri = params.get("uri").and_then(Value::as_str).unwrap_or("").to_string();
                if uri.is_empty() {
                    return;
                }
                let diagnostics: Vec<Diagnostic> = params
                    .get("diagnostics")
                    .cloned()
                    .map(|v| serde_json::from_value(v).unwrap_or_default())
                    .unwrap_or_default();
                self.diagnostics.lock().insert(uri, diagnostics);
            }
            // window/logMessage, window/showMessage, $/progress, ...
            (None, Some(_)) => {}
            (None, None) => {}
        }
    }

    /// The server's stdout reached EOF: reject everything in flight and
    /// mark the session stopped.
    fn handle_exit(&self) {
        {
            let mut state = self.state.lock();
            if *state == ClientState::Stopped {
                return;
            }
            *state = ClientState::Stopped;
        }
        tracing::debug!(server = %self.server_id, "language server exited");
        let pending: Vec<Resolver> = {
            let mut map = self.pending.lock();
            map.drain().map(|(_, tx)| tx).collect()
        };
        for tx in pending {
            let _ = tx.send(Err(ClientError::Stopped));
        }
        self.documents.lock().clear();
        self.diagnostics.lock().clear();
    }
}

fn spawn_writer<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if writer.write_all(&frame).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });
}

fn spawn_reader<R>(mut reader: R, inner: Weak<ClientInner>)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    decoder.extend(&buf[..n]);
                    while let Some(frame) = decoder.next_frame() {
                        let Some(inner) = inner.upgrade() else {
                            return;
                        };
                        inner.dispatch(&frame);
                    }
                }
            }
        }
        if let Some(inner) = inner.upgrade() {
            inner.handle_exit();
        }
    });
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGTERM,
        );
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.start_kill();
}

fn text_document_position(path: &Path, position: Position) -> Value {
    json!({
        "textDocument": { "uri": path_to_uri(path) },
        "position": position
    })
}

fn non_null(value: Value) -> Option<Value> {
    if value.is_null() { None } else { Some(value) }
}

/// Parse a list of `T`, tolerating null and skipping malformed entries.
fn parse_list<T: serde::de::DeserializeOwned>(value: Value) -> Result<Vec<T>, ClientError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        other => Err(ClientError::Malformed(other.to_string())),
    }
}

/// Normalise `null | Location | Location[] | LocationLink[]` into a flat
/// location list.
fn parse_locations(value: Value) -> Vec<Location> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter_map(parse_location).collect(),
        single => parse_location(single).into_iter().collect(),
    }
}

fn parse_location(value: Value) -> Option<Location> {
    if let Some(target_uri) = value.get("targetUri").and_then(Value::as_str) {
        let range = value
            .get("targetSelectionRange")
            .or_else(|| value.get("targetRange"))
            .cloned()
            .and_then(|r| serde_json::from_value(r).ok())?;
        return Some(Location { uri: target_uri.to_string(), range });
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
