// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::env;

/// Knobs for a [`Scheduler`](crate::Scheduler) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Tasks allowed to execute at once. Zero is treated as one.
    pub max_concurrency: usize,
    /// Skip tasks whose saved state is still fresh, and save state after
    /// each successful execution.
    pub cache: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_concurrency: env::DEFAULT_MAX_CONCURRENCY, cache: true }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `KILN_MAX_CONCURRENCY` and `KILN_NO_CACHE`.
    pub fn from_env() -> Self {
        Self { max_concurrency: env::max_concurrency(), cache: !env::cache_disabled() }
    }

    kiln_core::setters! {
        set {
            max_concurrency: usize,
            cache: bool,
        }
    }

    pub(crate) fn concurrency_limit(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
