// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launching plugin subprocesses.

use crate::client::{RemoteExecutor, RpcClient};
use crate::env;
use crate::error::PluginError;
use kiln_wire::{MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE};
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};

/// A running plugin process and the executor speaking to it.
///
/// Stdin/stdout carry the RPC channel; stderr is inherited so the plugin's
/// tracing output lands next to the host's. The process is killed on drop.
pub struct PluginProcess {
    child: Child,
    executor: Arc<RemoteExecutor>,
    version: u32,
}

impl std::fmt::Debug for PluginProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginProcess")
            .field("child", &self.child)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl PluginProcess {
    /// Spawn `command` and complete the handshake.
    pub async fn spawn(mut command: Command) -> Result<Self, PluginError> {
        command
            .env(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(PluginError::Spawn)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(PluginError::Spawn(io::Error::other("plugin stdio is not piped")));
        };

        let client = RpcClient::connect(stdout, stdin);
        let version = client.handshake(env::rpc_timeout()).await?;
        tracing::info!(pid = child.id().unwrap_or_default(), version, "plugin started");

        let executor = Arc::new(RemoteExecutor::new(Arc::new(client)));
        Ok(Self { child, executor, version })
    }

    pub fn executor(&self) -> Arc<RemoteExecutor> {
        Arc::clone(&self.executor)
    }

    /// Protocol version the plugin reported in the handshake.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}
