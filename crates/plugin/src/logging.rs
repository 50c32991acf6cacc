// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for plugin processes.

use crate::env;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber writing to stderr, filtered by `KILN_LOG`.
///
/// Stdout carries the RPC channel, so nothing may be logged there. Returns
/// false when a global subscriber was already installed.
pub fn init_stderr() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env::log_filter()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .is_ok()
}
