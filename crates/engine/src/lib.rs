// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-engine: executor routing and the dependency-aware scheduler.

mod cache;
mod config;
pub mod env;
mod report;
pub mod router;
mod scheduler;

pub use config::SchedulerConfig;
pub use report::{RunReport, ScheduleError, TaskError, TaskFailure};
pub use router::Router;
pub use scheduler::Scheduler;
