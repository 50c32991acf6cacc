// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saved state of an executed task and staleness detection.
//!
//! After a successful run the scheduler saves a [`TaskState`] next to the
//! task's outputs. Before the next run it asks [`detect_mismatches`] what
//! changed; an empty answer means the stored result can be replayed.

use crate::checksum;
use kiln_core::{Session, Task, TaskId, TaskResult};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// File name of the saved state inside a task's output directory.
pub const STATE_FILE: &str = ".kiln-state.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no saved state for task {0}")]
    Missing(TaskId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskState {
    pub executor: String,
    /// Input glob patterns as written on the task.
    pub patterns: Vec<String>,
    /// Files the patterns resolved to.
    pub inputs: Vec<PathBuf>,
    pub result: TaskResult,
    pub arguments_checksum: String,
    pub inputs_checksum: String,
    pub outputs_checksum: String,
    pub followups_checksum: String,
}

/// One reason a saved state no longer describes the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mismatch {
    Executor,
    Patterns,
    Inputs,
    ArgumentsChecksum,
    InputsChecksum,
    OutputsChecksum,
    FollowupsChecksum,
}

kiln_core::simple_display! {
    Mismatch {
        Executor => "executor",
        Patterns => "patterns",
        Inputs => "inputs",
        ArgumentsChecksum => "arguments-checksum",
        InputsChecksum => "inputs-checksum",
        OutputsChecksum => "outputs-checksum",
        FollowupsChecksum => "followups-checksum",
    }
}

/// Location of the state file of `task_id`, relative to the output filesystem.
pub fn state_path(task_id: &TaskId) -> PathBuf {
    task_id.output_dir().join(STATE_FILE)
}

/// Fingerprint `task` and its `result` and persist it.
///
/// Every output listed in `result` must exist.
pub fn save_state(
    session: &Session,
    task: &Task,
    result: &TaskResult,
) -> Result<TaskState, StateError> {
    let inputs = checksum::resolve_inputs(&**session.source(), &task.inputs)?;
    let state = TaskState {
        executor: task.executor.clone(),
        patterns: task.inputs.clone(),
        arguments_checksum: checksum::of_json(&task.args)?,
        inputs_checksum: checksum::of_files(&**session.source(), &inputs)?,
        outputs_checksum: checksum::of_files(&**session.output(), &result.outputs)?,
        followups_checksum: checksum::of_json(&result.followups)?,
        inputs,
        result: result.clone(),
    };

    let bytes = serde_json::to_vec_pretty(&state)?;
    session.output().write(&state_path(&task.id), &bytes)?;
    tracing::debug!(
        task_id = %task.id,
        checksum = kiln_core::short(&state.arguments_checksum, 12),
        "saved task state"
    );
    Ok(state)
}

/// Read the saved state of `task_id`.
pub fn load_state(session: &Session, task_id: &TaskId) -> Result<TaskState, StateError> {
    let bytes = match session.output().read(&state_path(task_id)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StateError::Missing(task_id.clone()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

/// Compare the saved state of `task` against the task and filesystems as they
/// are now.
///
/// Returns every mismatch found, in declaration order. Absent or unreadable
/// state is an error, which callers treat as a miss.
pub fn detect_mismatches(session: &Session, task: &Task) -> Result<Vec<Mismatch>, StateError> {
    check_state(session, task).map(|(_, mismatches)| mismatches)
}

/// Like [`detect_mismatches`], also returning the saved state so a fresh
/// result can be replayed without reading it twice.
pub fn check_state(
    session: &Session,
    task: &Task,
) -> Result<(TaskState, Vec<Mismatch>), StateError> {
    let state = load_state(session, &task.id)?;
    let mut mismatches = Vec::new();

    if state.executor != task.executor {
        mismatches.push(Mismatch::Executor);
    }
    if state.patterns != task.inputs {
        mismatches.push(Mismatch::Patterns);
    }

    let inputs = checksum::resolve_inputs(&**session.source(), &task.inputs)?;
    if state.inputs != inputs {
        mismatches.push(Mismatch::Inputs);
    }
    if state.arguments_checksum != checksum::of_json(&task.args)? {
        mismatches.push(Mismatch::ArgumentsChecksum);
    }

    // A file that vanished between resolving and reading counts as changed.
    let inputs_checksum = checksum::of_files(&**session.source(), &inputs).ok();
    if inputs_checksum.as_deref() != Some(state.inputs_checksum.as_str()) {
        mismatches.push(Mismatch::InputsChecksum);
    }

    // Missing outputs mean the cached result cannot be replayed.
    let outputs_checksum =
        checksum::of_files(&**session.output(), &state.result.outputs).ok();
    if outputs_checksum.as_deref() != Some(state.outputs_checksum.as_str()) {
        mismatches.push(Mismatch::OutputsChecksum);
    }

    if state.followups_checksum != checksum::of_json(&state.result.followups)? {
        mismatches.push(Mismatch::FollowupsChecksum);
    }

    if !mismatches.is_empty() {
        tracing::debug!(
            task_id = %task.id,
            mismatches = %mismatches.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(","),
            "task state is stale"
        );
    }
    Ok((state, mismatches))
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
