// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for channel tests: a host client wired to an in-process
//! server over an in-memory duplex pipe.

use crate::{PluginError, PluginServer, RpcClient};
use async_trait::async_trait;
use kiln_core::test_support::RecordingExecutor;
use kiln_core::{
    Executor, ExecutorError, LogLevel, LogRecord, Session, SessionId, Task, TaskResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub(crate) struct Channel {
    pub client: Arc<RpcClient>,
    pub server: Arc<PluginServer>,
    pub serving: JoinHandle<Result<(), PluginError>>,
}

/// Serve `executor` in-process and connect a client, without handshaking.
pub(crate) fn connect(executor: Arc<dyn Executor>) -> Channel {
    let (host, plugin) = tokio::io::duplex(64 * 1024);
    let (host_read, host_write) = tokio::io::split(host);
    let (plugin_read, plugin_write) = tokio::io::split(plugin);

    let server = Arc::new(PluginServer::new(executor));
    let serving = tokio::spawn(Arc::clone(&server).serve(plugin_read, plugin_write));
    Channel { client: Arc::new(RpcClient::connect(host_read, host_write)), server, serving }
}

/// [`connect`] followed by a successful handshake.
pub(crate) async fn connected(executor: Arc<dyn Executor>) -> Channel {
    let channel = connect(executor);
    channel.client.handshake(Duration::from_secs(5)).await.unwrap();
    channel
}

/// Executor that logs through the session at every step.
///
/// `open_session` logs before the host's stream can be attached, so its
/// record exercises the startup buffer.
pub(crate) struct Chatty;

#[async_trait]
impl Executor for Chatty {
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        let logger = session.logger();
        logger.debug(format!("details of {}", task.id));
        logger.record(
            LogRecord::new(LogLevel::Info, format!("running {}", task.id))
                .attr("executor", &task.executor)
                .at("chatty.rs", 42),
        );
        Ok(TaskResult::new())
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        session.logger().info("opening");
        Ok(())
    }

    async fn close_session(&self, _session_id: &SessionId) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Executor whose `open_session` never finishes.
pub(crate) struct Stall;

#[async_trait]
impl Executor for Stall {
    async fn execute(
        &self,
        _session: &Arc<Session>,
        _task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        Ok(TaskResult::new())
    }

    async fn open_session(&self, _session: &Arc<Session>) -> Result<(), ExecutorError> {
        std::future::pending().await
    }

    async fn close_session(&self, _session_id: &SessionId) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Recording executor whose `open_session` takes `delay` to finish.
pub(crate) struct SlowOpen {
    pub inner: RecordingExecutor,
    pub delay: Duration,
}

#[async_trait]
impl Executor for SlowOpen {
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        self.inner.execute(session, task).await
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        tokio::time::sleep(self.delay).await;
        self.inner.open_session(session).await
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        self.inner.close_session(session_id).await
    }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
