// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every executor implementation.

use crate::args::DecodeError;
use crate::id::SessionId;
use thiserror::Error;

/// Name resolution failures in the executor tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no executor found for {name:?}")]
    NoExecutorFound { name: String },
    #[error("executor already registered: {name}")]
    DuplicateExecutor { name: String },
}

/// Operations against a session the executor does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    Unknown(SessionId),
    #[error("session {0} was cancelled")]
    Cancelled(SessionId),
}

/// Errors returned by [`Executor`](crate::Executor) operations.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The channel to a remote executor failed or returned garbage.
    #[error("transport error: {0}")]
    Transport(String),

    /// The executor's own logic failed. The message is preserved verbatim,
    /// including across process boundaries.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Several independent failures, e.g. from a session broadcast.
    #[error("{}", join_errors(.0))]
    Aggregate(Vec<ExecutorError>),
}

impl ExecutorError {
    /// Construct an execution failure from any displayable message.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// True when the executor's own logic failed, as opposed to routing,
    /// transport or session bookkeeping.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Collapse a list of errors: none → `Ok`, one → itself, more → `Aggregate`.
    pub fn aggregate(mut errors: Vec<ExecutorError>) -> Result<(), ExecutorError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Aggregate(errors)),
        }
    }
}

fn join_errors(errors: &[ExecutorError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
