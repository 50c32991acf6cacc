// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles shared across crates (enabled by the `test-support` feature).

use crate::args::Value;
use crate::error::ExecutorError;
use crate::executor::Executor;
use crate::id::SessionId;
use crate::log::{LogRecord, LogSink};
use crate::session::Session;
use crate::task::{Task, TaskResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sink that keeps every record in memory.
#[derive(Default)]
pub struct CollectSink {
    records: Mutex<Vec<LogRecord>>,
}

impl CollectSink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }
}

impl LogSink for CollectSink {
    fn emit(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}

/// One observed `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecCall {
    pub session_id: SessionId,
    pub task_id: String,
    /// Executor name as seen by this executor (after any router stripping).
    pub executor: String,
    pub args: Value,
}

#[derive(Default)]
struct RecordingState {
    calls: Vec<ExecCall>,
    results: HashMap<String, TaskResult>,
    failures: HashMap<String, String>,
    opened: Vec<SessionId>,
    closed: Vec<SessionId>,
    fail_open: Option<String>,
    fail_close: Option<String>,
}

/// Executor that records calls and returns canned results keyed by task id.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    state: Arc<Mutex<RecordingState>>,
    delay: Option<Duration>,
    write_outputs: bool,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `result` when the task with id `task_id` executes.
    pub fn with_result(self, task_id: &str, result: TaskResult) -> Self {
        self.state.lock().results.insert(task_id.to_string(), result);
        self
    }

    /// Fail the task with id `task_id` with `message`.
    pub fn fail_task(self, task_id: &str, message: &str) -> Self {
        self.state.lock().failures.insert(task_id.to_string(), message.to_string());
        self
    }

    pub fn fail_open(self, message: &str) -> Self {
        self.state.lock().fail_open = Some(message.to_string());
        self
    }

    pub fn fail_close(self, message: &str) -> Self {
        self.state.lock().fail_close = Some(message.to_string());
        self
    }

    /// Sleep this long inside every execution.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Write each listed output file (content: task id) before returning.
    pub fn writing_outputs(mut self) -> Self {
        self.write_outputs = true;
        self
    }

    pub fn calls(&self) -> Vec<ExecCall> {
        self.state.lock().calls.clone()
    }

    /// Ids of executed tasks, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().calls.iter().map(|c| c.task_id.clone()).collect()
    }

    pub fn opened(&self) -> Vec<SessionId> {
        self.state.lock().opened.clone()
    }

    pub fn closed(&self) -> Vec<SessionId> {
        self.state.lock().closed.clone()
    }

    /// Highest number of executions observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        let (result, failure) = {
            let mut state = self.state.lock();
            state.calls.push(ExecCall {
                session_id: session.id().clone(),
                task_id: task.id.to_string(),
                executor: task.executor.clone(),
                args: task.args.clone(),
            });
            (
                state.results.get(task.id.as_str()).cloned().unwrap_or_default(),
                state.failures.get(task.id.as_str()).cloned(),
            )
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = failure {
            return Err(ExecutorError::Failed(message));
        }
        if self.write_outputs {
            for output in &result.outputs {
                session.output().write(output, task.id.as_str().as_bytes())?;
            }
        }
        Ok(result)
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.fail_open {
            return Err(ExecutorError::Failed(message.clone()));
        }
        state.opened.push(session.id().clone());
        Ok(())
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        let mut state = self.state.lock();
        state.closed.push(session_id.clone());
        match &state.fail_close {
            Some(message) => Err(ExecutorError::Failed(message.clone())),
            None => Ok(()),
        }
    }
}
