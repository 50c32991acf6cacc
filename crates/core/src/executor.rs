// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor capability.
//!
//! Every layer speaks this trait: native in-process executors, RPC-backed
//! remote executors, and the router tree composing them.

use crate::error::ExecutorError;
use crate::id::SessionId;
use crate::session::Session;
use crate::task::{Task, TaskResult};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `task` within `session`.
    ///
    /// Implementations may rewrite `task.executor` while dispatching but
    /// must restore it before returning.
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError>;

    /// Prepare per-session state. Called once before any task of the session.
    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError>;

    /// Release per-session state, including log subscriptions.
    async fn close_session(&self, session_id: &SessionId) -> Result<(), ExecutorError>;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Arc<E> {
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        (**self).execute(session, task).await
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        (**self).open_session(session).await
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        (**self).close_session(session_id).await
    }
}
