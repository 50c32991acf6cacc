// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-core: tasks, sessions and the executor capability shared by every
//! kiln crate.

pub mod macros;

pub mod args;
pub mod error;
pub mod executor;
pub mod fs;
pub mod id;
pub mod log;
pub mod native;
pub mod session;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use args::{decode, to_value, ArgsValidator, DecodeError, RequiredFields, Value};
pub use error::{ExecutorError, RoutingError, SessionError};
pub use executor::Executor;
pub use fs::{Filesystem, LocalFs, MemoryFs};
pub use id::{short, SessionId, TaskId};
pub use log::{
    AttachId, ChannelSink, LogLevel, LogRecord, LogSink, Logger, SourceLocation, StartupBuffer,
    TracingSink,
};
pub use native::{NativeExecutor, TaskContext, TaskHandler};
pub use session::{Session, Workspace};
pub use task::{Task, TaskResult};
