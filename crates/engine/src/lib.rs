// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hew-engine: composition root for the agent engine.
//!
//! An [`Engine`] is the explicitly-constructed context the tool
//! dispatcher threads through every invocation: database handle, LSP
//! manager, indexer, snapshot access, question broker. There are no
//! module-level singletons: construction is explicit, expensive pieces
//! initialise on first use, and [`Engine::shutdown`] is the one place
//! that tears children down.
//!
//! [`dispatch`] holds the tool capability interface: tools declare their
//! parameter schemas as data and the dispatcher validates arguments
//! before invocation.

mod dispatch;
mod engine;

pub use dispatch::{schema_for, validate_args, Tool, ToolRegistry};
pub use engine::{Engine, EngineConfig};
