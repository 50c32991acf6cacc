// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use kiln_core::{LogRecord, Task, TaskResult};
use serde::{Deserialize, Serialize};

use crate::Status;

/// Response from plugin to host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Handshake accepted
    Hello { version: u32 },

    /// Session opened; log frames may follow on the same id
    Ack,

    /// Log record streamed for an open session
    Log { record: LogRecord },

    /// Log stream of a session ended (final frame for an `OpenSession` id)
    SessionEnded,

    /// Task executed successfully
    Executed {
        #[serde(default)]
        outputs: Vec<PathBuf>,
        #[serde(default)]
        followups: Vec<Task>,
    },

    /// Session closed
    Closed,

    /// Request failed
    Error { status: Status, message: String },
}

impl Response {
    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Response::Error { status, message: message.into() }
    }

    pub fn executed(result: TaskResult) -> Self {
        Response::Executed { outputs: result.outputs, followups: result.followups }
    }

    /// True for responses after which no more frames arrive for the same id.
    pub fn is_final(&self) -> bool {
        !matches!(self, Response::Ack | Response::Log { .. })
    }
}
