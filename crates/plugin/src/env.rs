// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the plugin crate.

use kiln_wire::{MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE};
use std::time::Duration;

/// Filter used when `KILN_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Handshake timeout (default 5s, configurable via `KILN_RPC_TIMEOUT_MS`).
pub fn rpc_timeout() -> Duration {
    std::env::var("KILN_RPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Tracing filter directives for plugin processes.
pub fn log_filter() -> String {
    std::env::var("KILN_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| {
        DEFAULT_LOG_FILTER.to_string()
    })
}

/// Whether this process was launched by a kiln host.
pub fn launched_by_host() -> bool {
    std::env::var(MAGIC_COOKIE_KEY).is_ok_and(|value| value == MAGIC_COOKIE_VALUE)
}
