// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kiln_core::ExecutorError;
use kiln_wire::ProtocolError;
use thiserror::Error;

/// Errors from setting up or running a plugin channel.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("KILN_PLUGIN_COOKIE is not set; plugins must be launched by a kiln host")]
    MissingCookie,

    #[error("failed to spawn plugin: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<PluginError> for ExecutorError {
    fn from(e: PluginError) -> Self {
        ExecutorError::transport(e)
    }
}
