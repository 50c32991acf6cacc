// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome of a scheduler run.

use kiln_core::{ExecutorError, TaskId};
use std::fmt;
use thiserror::Error;

/// Tasks that completed successfully, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks whose executor ran.
    pub executed: Vec<TaskId>,
    /// Tasks whose saved result was fresh and replayed instead.
    pub skipped: Vec<TaskId>,
}

impl RunReport {
    /// Number of tasks that completed, executed or skipped.
    pub fn completed(&self) -> usize {
        self.executed.len() + self.skipped.len()
    }
}

/// Why a single task did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("dependency {0} failed")]
    DependencyFailed(TaskId),

    #[error("dependency {0} can never complete")]
    UnresolvedDependency(TaskId),

    #[error("task id {0} is already part of the run")]
    DuplicateTask(TaskId),

    #[error("run cancelled before the task started")]
    Cancelled,

    #[error("task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
#[error("{task_id}: {error}")]
pub struct TaskFailure {
    pub task_id: TaskId,
    #[source]
    pub error: TaskError,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The executor refused the session; no task ran.
    #[error("failed to open session: {0}")]
    OpenSession(#[source] ExecutorError),

    /// At least one task failed. Everything that could run did.
    #[error("{}", FailureList(.failures))]
    Tasks { failures: Vec<TaskFailure>, report: RunReport },
}

impl ScheduleError {
    pub fn failures(&self) -> &[TaskFailure] {
        match self {
            ScheduleError::OpenSession(_) => &[],
            ScheduleError::Tasks { failures, .. } => failures,
        }
    }

    /// Ids of the failed tasks, in failure order.
    pub fn failed_tasks(&self) -> Vec<&TaskId> {
        self.failures().iter().map(|f| &f.task_id).collect()
    }

    /// What completed before and around the failures.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            ScheduleError::OpenSession(_) => None,
            ScheduleError::Tasks { report, .. } => Some(report),
        }
    }
}

struct FailureList<'a>(&'a [TaskFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.0.len() == 1 { "task" } else { "tasks" };
        write!(f, "{} {noun} failed", self.0.len())?;
        for failure in self.0 {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}
