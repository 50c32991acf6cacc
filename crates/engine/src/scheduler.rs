// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-aware task scheduler.
//!
//! A single coordinator loop owns all bookkeeping. Ready tasks are spawned
//! onto a [`JoinSet`] up to the concurrency ceiling; each completion may
//! unblock dependents and contribute follow-up tasks. The run ends when
//! nothing is pending or running.

use crate::cache;
use crate::config::SchedulerConfig;
use crate::report::{RunReport, ScheduleError, TaskError, TaskFailure};
use futures_util::FutureExt;
use kiln_core::{Executor, ExecutorError, Session, Task, TaskId, TaskResult};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

pub struct Scheduler {
    executor: Arc<dyn Executor>,
    config: SchedulerConfig,
}

enum Outcome {
    Ran(TaskResult),
    Cached(TaskResult),
    Failed(ExecutorError),
    Panicked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Bookkeeping of one run, touched only by the coordinator loop.
#[derive(Default)]
struct RunState {
    states: HashMap<TaskId, TaskState>,
    /// Submitted but not started, in submission order.
    pending: Vec<Task>,
    failures: Vec<TaskFailure>,
    report: RunReport,
}

impl RunState {
    fn submit(&mut self, task: Task) {
        if self.states.contains_key(&task.id) {
            // The first task with this id keeps its state.
            tracing::warn!(task_id = %task.id, "duplicate task id");
            let error = TaskError::DuplicateTask(task.id.clone());
            self.failures.push(TaskFailure { task_id: task.id, error });
            return;
        }
        self.states.insert(task.id.clone(), TaskState::Pending);
        self.pending.push(task);
    }

    fn fail(&mut self, task_id: TaskId, error: TaskError) {
        self.states.insert(task_id.clone(), TaskState::Failed);
        self.failures.push(TaskFailure { task_id, error });
    }

    fn state(&self, task_id: &TaskId) -> Option<TaskState> {
        self.states.get(task_id).copied()
    }

    /// Fail every pending task with a failed dependency, transitively.
    fn fail_blocked(&mut self) {
        loop {
            let blocked = self.pending.iter().enumerate().find_map(|(index, task)| {
                task.dependencies
                    .iter()
                    .find(|dep| self.state(dep) == Some(TaskState::Failed))
                    .map(|dep| (index, dep.clone()))
            });
            let Some((index, dep)) = blocked else { break };
            let task = self.pending.remove(index);
            tracing::warn!(
                task_id = %task.id,
                dependency = %dep,
                "dependency failed, not running task"
            );
            self.fail(task.id, TaskError::DependencyFailed(dep));
        }
    }

    /// Remove and return the first pending task whose dependencies succeeded.
    fn take_ready(&mut self) -> Option<Task> {
        let index = self.pending.iter().position(|task| {
            task.dependencies.iter().all(|dep| self.state(dep) == Some(TaskState::Succeeded))
        })?;
        let task = self.pending.remove(index);
        self.states.insert(task.id.clone(), TaskState::Running);
        Some(task)
    }

    fn complete(&mut self, task_id: TaskId, outcome: Outcome) {
        let (result, cached) = match outcome {
            Outcome::Ran(result) => (result, false),
            Outcome::Cached(result) => (result, true),
            Outcome::Failed(e) => return self.fail(task_id, TaskError::Executor(e)),
            Outcome::Panicked(message) => return self.fail(task_id, TaskError::Panicked(message)),
        };

        self.states.insert(task_id.clone(), TaskState::Succeeded);
        for followup in result.followups {
            self.submit(followup.qualified_under(&task_id));
        }
        if cached {
            self.report.skipped.push(task_id);
        } else {
            self.report.executed.push(task_id);
        }
    }

    /// Fail whatever never started and build the final result.
    fn finish(mut self, cancelled: bool) -> Result<RunReport, ScheduleError> {
        for task in std::mem::take(&mut self.pending) {
            let error = if cancelled {
                TaskError::Cancelled
            } else {
                let unmet = task
                    .dependencies
                    .iter()
                    .find(|dep| self.state(dep) != Some(TaskState::Succeeded))
                    .cloned()
                    .unwrap_or_else(|| task.id.clone());
                TaskError::UnresolvedDependency(unmet)
            };
            self.fail(task.id, error);
        }

        if self.failures.is_empty() {
            Ok(self.report)
        } else {
            Err(ScheduleError::Tasks { failures: self.failures, report: self.report })
        }
    }
}

impl Scheduler {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor, config: SchedulerConfig::default() }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Open the session on the executor, run `tasks`, and close the session
    /// whatever the outcome.
    pub async fn run_session(
        &self,
        session: &Arc<Session>,
        tasks: Vec<Task>,
    ) -> Result<RunReport, ScheduleError> {
        tracing::info!(
            session_id = %session.id(),
            workspace = %session.workspace(),
            "opening session"
        );
        let result = match self.executor.open_session(session).await {
            Ok(()) => self.run(session, tasks).await,
            Err(e) => {
                tracing::error!(session_id = %session.id(), error = %e, "failed to open session");
                Err(ScheduleError::OpenSession(e))
            }
        };

        if let Err(e) = self.executor.close_session(session.id()).await {
            tracing::warn!(session_id = %session.id(), error = %e, "failed to close session");
        }
        result
    }

    /// Run `tasks` and every follow-up they produce.
    ///
    /// Returns once nothing is pending or running. Cancelling the session's
    /// token stops new tasks from starting; running ones are awaited.
    pub async fn run(
        &self,
        session: &Arc<Session>,
        tasks: Vec<Task>,
    ) -> Result<RunReport, ScheduleError> {
        let start = Instant::now();
        let cancel = session.cancellation().clone();
        let limit = self.config.concurrency_limit();

        let mut run = RunState::default();
        for task in tasks {
            run.submit(task);
        }

        let mut running: JoinSet<(TaskId, Outcome)> = JoinSet::new();
        loop {
            run.fail_blocked();
            if !cancel.is_cancelled() {
                while running.len() < limit {
                    let Some(task) = run.take_ready() else { break };
                    self.spawn(&mut running, session, task);
                }
            }
            if running.is_empty() {
                break;
            }

            let joined = tokio::select! {
                joined = running.join_next() => joined,
                _ = cancel.cancelled(), if !cancel.is_cancelled() => {
                    tracing::info!(session_id = %session.id(), "run cancelled, draining");
                    continue;
                }
            };
            match joined {
                Some(Ok((task_id, outcome))) => run.complete(task_id, outcome),
                // Panics are caught inside the task, so only aborts land here.
                Some(Err(e)) => tracing::error!(error = %e, "task join error"),
                None => break,
            }
        }

        let result = run.finish(cancel.is_cancelled());
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(report) => tracing::info!(
                executed = report.executed.len(),
                skipped = report.skipped.len(),
                elapsed_ms,
                "run completed"
            ),
            Err(e) => tracing::error!(failed = e.failures().len(), elapsed_ms, "run failed"),
        }
        result
    }

    fn spawn(&self, running: &mut JoinSet<(TaskId, Outcome)>, session: &Arc<Session>, task: Task) {
        let executor = Arc::clone(&self.executor);
        let session = Arc::clone(session);
        let cache = self.config.cache;
        running.spawn(async move {
            let task_id = task.id.clone();
            let outcome = AssertUnwindSafe(execute(executor, session, task, cache))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Outcome::Panicked(panic_message(panic.as_ref())));
            (task_id, outcome)
        });
    }
}

async fn execute(
    executor: Arc<dyn Executor>,
    session: Arc<Session>,
    mut task: Task,
    cache: bool,
) -> Outcome {
    if cache {
        if let Some(result) = cache::lookup(&session, &task) {
            tracing::info!(task_id = %task.id, "task state is fresh, skipping");
            return Outcome::Cached(result);
        }
    }

    tracing::info!(task_id = %task.id, executor = %task.executor, "task started");
    let start = Instant::now();
    let result = executor.execute(&session, &mut task).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(result) => {
            tracing::info!(
                task_id = %task.id,
                outputs = result.outputs.len(),
                followups = result.followups.len(),
                elapsed_ms,
                "task completed"
            );
            if cache {
                cache::store(&session, &task, &result);
            }
            Outcome::Ran(result)
        }
        Err(e) => {
            tracing::error!(task_id = %task.id, error = %e, elapsed_ms, "task failed");
            Outcome::Failed(e)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
