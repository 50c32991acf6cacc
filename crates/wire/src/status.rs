// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The executor ran and reported a failure. The message is its own text.
    ExecutionFailed,
    UnknownSession,
    Handshake,
    InvalidRequest,
    Internal,
}

kiln_core::simple_display! {
    Status {
        ExecutionFailed => "execution failed",
        UnknownSession => "unknown session",
        Handshake => "handshake rejected",
        InvalidRequest => "invalid request",
        Internal => "internal error",
    }
}
