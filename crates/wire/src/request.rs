// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kiln_core::{LogLevel, SessionId, Task, Workspace};
use serde::{Deserialize, Serialize};

/// Which session log records the host wants streamed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    pub min_level: LogLevel,
    #[serde(default)]
    pub include_source: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self { min_level: LogLevel::Info, include_source: false }
    }
}

/// Request from host to plugin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Must be the first request on a channel
    Hello { cookie: String, version: u32 },

    /// Open a session. Answered by `Ack`, then `Log` frames until the
    /// session closes, then `SessionEnded`.
    OpenSession {
        session_id: SessionId,
        workspace: Workspace,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log: Option<LogOptions>,
    },

    /// Execute one task within an open session
    ExecuteTask { session_id: SessionId, task: Task },

    /// Close a session and release its log stream
    CloseSession { session_id: SessionId },
}

impl Request {
    /// Session the request targets, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Request::Hello { .. } => None,
            Request::OpenSession { session_id, .. }
            | Request::ExecuteTask { session_id, .. }
            | Request::CloseSession { session_id } => Some(session_id),
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
