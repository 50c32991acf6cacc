// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process executors built from a typed handler.
//!
//! [`NativeExecutor`] validates and decodes the task's opaque arguments into
//! the handler's `Args` type before running it.

use crate::args::ArgsValidator;
use crate::error::ExecutorError;
use crate::executor::Executor;
use crate::id::SessionId;
use crate::log::Logger;
use crate::session::Session;
use crate::task::{Task, TaskResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a handler sees while running one task.
pub struct TaskContext {
    pub session: Arc<Session>,
    pub task: Task,
}

impl TaskContext {
    pub fn logger(&self) -> Logger {
        self.session.logger()
    }

    /// Output directory of the task, relative to the output filesystem.
    pub fn output_dir(&self) -> PathBuf {
        self.session.task_output_dir(&self.task.id)
    }

    /// Read a file from the source filesystem.
    pub fn read_source(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        self.session.source().read(path.as_ref())
    }

    /// Files matched by the task's input patterns, in pattern order.
    pub fn input_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for pattern in &self.task.inputs {
            files.extend(self.session.source().glob(pattern)?);
        }
        Ok(files)
    }

    /// Write `name` into the task's output directory and return the path to
    /// list in the result.
    pub fn write_output(&self, name: impl AsRef<Path>, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.output_dir().join(name);
        self.session.output().write(&path, data)?;
        Ok(path)
    }
}

#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    type Args: DeserializeOwned + Send;

    async fn run(&self, ctx: TaskContext, args: Self::Args) -> Result<TaskResult, ExecutorError>;

    async fn open_session(&self, _session: &Arc<Session>) -> Result<(), ExecutorError> {
        Ok(())
    }

    async fn close_session(&self, _session_id: &SessionId) -> Result<(), ExecutorError> {
        Ok(())
    }
}

pub struct NativeExecutor<H> {
    handler: H,
    validator: Option<Arc<dyn ArgsValidator>>,
}

impl<H: TaskHandler> NativeExecutor<H> {
    pub fn new(handler: H) -> Self {
        Self { handler, validator: None }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ArgsValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

#[async_trait]
impl<H: TaskHandler> Executor for NativeExecutor<H> {
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        if let Some(validator) = &self.validator {
            validator.validate(&task.args)?;
        }
        let args: H::Args = task.decode_args()?;
        let ctx = TaskContext { session: Arc::clone(session), task: task.clone() };
        self.handler.run(ctx, args).await
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        self.handler.open_session(session).await
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        self.handler.close_session(session_id).await
    }
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
