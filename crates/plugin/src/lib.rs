// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-plugin: executors living in another process.
//!
//! The host talks to a plugin through [`RemoteExecutor`], usually obtained
//! from [`PluginProcess::spawn`]. The plugin binary hands its executor to
//! [`serve_stdio`].

mod client;
pub mod env;
mod error;
pub mod logging;
mod process;
mod server;
mod writer;

#[cfg(test)]
mod test_fixtures;

pub use client::{RemoteExecutor, RpcClient};
pub use error::PluginError;
pub use process::PluginProcess;
pub use server::{serve, serve_stdio, PluginServer};
