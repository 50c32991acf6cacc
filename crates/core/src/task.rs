// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tasks and their results.

use crate::args::{self, DecodeError, Value};
use crate::id::TaskId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named unit of work bound to an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Dotted executor name, resolved by the router.
    pub executor: String,
    /// Ordered glob patterns over the session's source filesystem.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub args: Value,
    /// Tasks of the same run that must complete before this one starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, executor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            executor: executor.into(),
            inputs: Vec::new(),
            args: Value::Null,
            dependencies: Vec::new(),
        }
    }

    crate::setters! {
        set {
            args: Value,
        }
    }

    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Set the arguments from any serializable value.
    pub fn with_args<T: Serialize + ?Sized>(mut self, args: &T) -> Result<Self, DecodeError> {
        self.args = args::to_value(args)?;
        Ok(self)
    }

    /// Decode the arguments into a concrete shape.
    pub fn decode_args<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        args::decode(&self.args)
    }

    /// Re-qualify a follow-up produced by `parent`: its id and the ids of
    /// its sibling dependencies are nested under the parent id.
    pub fn qualified_under(mut self, parent: &TaskId) -> Self {
        self.id = parent.child(&self.id);
        self.dependencies = self.dependencies.iter().map(|dep| parent.child(dep)).collect();
        self
    }
}

/// What a successful execution produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Output files, relative to the session's output filesystem.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    /// Tasks to schedule as children of the producing task.
    #[serde(default)]
    pub followups: Vec<Task>,
}

impl TaskResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    pub fn followup(mut self, task: Task) -> Self {
        self.followups.push(task);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.followups.is_empty()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
