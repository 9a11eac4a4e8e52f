// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hew-lsp: language-server multiplexing over stdio.
//!
//! Four layers, leaves first:
//!
//! - [`transport`]: `Content-Length`-framed JSON-RPC byte codec
//! - [`client`]: one connected server session (handshake, document
//!   lifecycle, typed requests, diagnostic cache)
//! - [`registry`]: file extension → candidate servers with root markers
//!   and spawn recipes
//! - [`manager`]: per-(server, root) pool with spawn deduplication,
//!   quarantine of broken servers, and idle reaping

pub mod client;
pub mod manager;
pub mod protocol;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::{Client, ClientError, ClientState};
pub use manager::LspManager;
pub use protocol::{
    language_id_for_path, path_to_uri, uri_to_path, CallHierarchyItem, CompletionItem, Diagnostic,
    DocumentSymbol, IncomingCall, Location, OutgoingCall, Position, Range,
};
pub use registry::{Registry, ServerDescriptor};
pub use transport::{encode_frame, FrameDecoder};
