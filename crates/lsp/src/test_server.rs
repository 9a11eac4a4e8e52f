// SPDX-License-Identifier: MIT

//! Scripted in-memory language server for tests.
//!
//! Speaks framed JSON-RPC over a duplex pipe: answers requests from a
//! default table (overridable per method), records every message the
//! client sends, and can push arbitrary raw frames at the client.

use crate::client::Client;
use crate::transport::{encode_frame, FrameDecoder};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

pub(crate) struct FakeServer {
    push_tx: mpsc::UnboundedSender<Vec<u8>>,
    seen_rx: mpsc::UnboundedReceiver<Value>,
    overrides: Arc<Mutex<HashMap<String, Option<Value>>>>,
    task: tokio::task::JoinHandle<()>,
}

impl FakeServer {
    /// Override the response for a method. `None` swallows the request,
    /// which is how tests exercise timeouts.
    pub(crate) fn respond_with(&self, method: &str, response: Option<Value>) {
        self.overrides.lock().insert(method.to_string(), response);
    }

    /// Push a raw pre-framed byte sequence at the client.
    pub(crate) fn push_raw(&self, frame: Vec<u8>) {
        let _ = self.push_tx.send(frame);
    }

    /// Push a JSON message at the client.
    pub(crate) fn push(&self, message: Value) {
        self.push_raw(encode_frame(&message));
    }

    /// Next message the client sent, within a deadline.
    pub(crate) async fn next_seen(&mut self) -> Value {
        match tokio::time::timeout(Duration::from_secs(5), self.seen_rx.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => panic!("fake server channel closed"),
            Err(_) => panic!("timed out waiting for a client message"),
        }
    }

    /// Skip messages until one with the given method arrives.
    pub(crate) async fn seen_method(&mut self, method: &str) -> Value {
        loop {
            let message = self.next_seen().await;
            if message.get("method").and_then(Value::as_str) == Some(method) {
                return message;
            }
        }
    }

    /// Skip messages until a response (no method, has id or result) with
    /// the given id arrives.
    pub(crate) async fn seen_response(&mut self, id: i64) -> Value {
        loop {
            let message = self.next_seen().await;
            if message.get("method").is_none() && message.get("id").and_then(Value::as_i64) == Some(id)
            {
                return message;
            }
        }
    }

    /// Tear the transport down, as if the server process died.
    pub(crate) fn shutdown(&self) {
        self.task.abort();
    }
}

fn default_response(method: &str) -> Value {
    match method {
        "initialize" => json!({ "capabilities": {} }),
        "textDocument/hover" => json!({ "contents": "hovered" }),
        "textDocument/completion" => json!({
            "items": [{ "label": "completed", "kind": 3 }]
        }),
        "textDocument/definition" => json!([{
            "uri": "file:///fake/def.ts",
            "range": {
                "start": { "line": 1, "character": 0 },
                "end": { "line": 1, "character": 4 }
            }
        }]),
        _ => Value::Null,
    }
}

/// Start a fake server and a client connected to it.
pub(crate) async fn start() -> (Client, FakeServer) {
    let (client_io, server_io) = tokio::io::duplex(1 << 16);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (mut server_read, mut server_write) = tokio::io::split(server_io);

    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let overrides: Arc<Mutex<HashMap<String, Option<Value>>>> = Arc::new(Mutex::new(HashMap::new()));

    let task_overrides = overrides.clone();
    let task = tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 8192];
        loop {
            tokio::select! {
                pushed = push_rx.recv() => {
                    let Some(frame) = pushed else { break };
                    if server_write.write_all(&frame).await.is_err() {
                        break;
                    }
                }
                read = server_read.read(&mut buf) => {
                    let Ok(n) = read else { break };
                    if n == 0 {
                        break;
                    }
                    decoder.extend(&buf[..n]);
                    while let Some(frame) = decoder.next_frame() {
                        let Ok(message) = serde_json::from_slice::<Value>(&frame) else {
                            continue;
                        };
                        let reply = build_reply(&message, &task_overrides);
                        let _ = seen_tx.send(message);
                        if let Some(reply) = reply {
                            if server_write.write_all(&encode_frame(&reply)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    });

    let client = Client::connect_io(
        "fake",
        Path::new("/fake/project"),
        client_write,
        client_read,
        None,
    )
    .await
    .expect("fake server handshake");

    (client, FakeServer { push_tx, seen_rx, overrides, task })
}

fn build_reply(
    message: &Value,
    overrides: &Arc<Mutex<HashMap<String, Option<Value>>>>,
) -> Option<Value> {
    let id = message.get("id")?;
    let method = message.get("method").and_then(Value::as_str)?;
    let result = match overrides.lock().get(method) {
        Some(Some(overridden)) => overridden.clone(),
        Some(None) => return None,
        None => default_response(method),
    };
    Some(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}
