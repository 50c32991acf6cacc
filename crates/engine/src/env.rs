// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

/// Concurrency ceiling used when `KILN_MAX_CONCURRENCY` is unset or invalid.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// Maximum number of tasks executing at once (`KILN_MAX_CONCURRENCY`).
pub fn max_concurrency() -> usize {
    std::env::var("KILN_MAX_CONCURRENCY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_CONCURRENCY)
}

/// Set `KILN_NO_CACHE` to any non-empty value to disable the state cache.
pub fn cache_disabled() -> bool {
    std::env::var("KILN_NO_CACHE").is_ok_and(|s| !s.is_empty())
}
