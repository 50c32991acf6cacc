// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler side of the state cache. Cache trouble is logged, never fatal.

use kiln_core::{Session, Task, TaskResult};
use kiln_storage::StateError;

/// The saved result of `task`, if its state is still fresh.
pub(crate) fn lookup(session: &Session, task: &Task) -> Option<TaskResult> {
    match kiln_storage::check_state(session, task) {
        Ok((state, mismatches)) if mismatches.is_empty() => Some(state.result),
        Ok(_) => None,
        Err(StateError::Missing(_)) => None,
        Err(e) => {
            tracing::warn!(task_id = %task.id, error = %e, "ignoring unreadable task state");
            None
        }
    }
}

pub(crate) fn store(session: &Session, task: &Task, result: &TaskResult) {
    if let Err(e) = kiln_storage::save_state(session, task, result) {
        tracing::warn!(task_id = %task.id, error = %e, "failed to save task state");
    }
}
