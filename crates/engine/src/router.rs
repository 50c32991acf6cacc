// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical executor dispatch.
//!
//! A [`Router`] maps the first segment of a dotted executor name to either a
//! leaf executor or a nested router, and forwards the remaining segments.
//! Lookup at each level tries the exact segment, then [`WILDCARD`], then the
//! [`CATCH_ALL`] slot.

use async_trait::async_trait;
use futures_util::future::join_all;
use kiln_core::id::{self, split_first};
use kiln_core::{Executor, ExecutorError, RoutingError, Session, SessionId, Task, TaskResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Matches any single segment.
pub const WILDCARD: &str = "*";

/// Matches anything not matched more specifically, including the empty rest
/// of a name that ends at a sub-tree.
pub const CATCH_ALL: &str = "";

#[derive(Clone)]
enum Node {
    Leaf(Arc<dyn Executor>),
    Branch(Arc<Router>),
}

#[derive(Default)]
pub struct Router {
    children: RwLock<HashMap<String, Node>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` under the dotted `name`.
    ///
    /// A leaf in the way of a longer name is promoted into a sub-tree that
    /// keeps the old leaf under [`CATCH_ALL`]. Registering a leaf where a
    /// sub-tree already exists puts it under that sub-tree's catch-all slot.
    pub fn register(&self, name: &str, executor: Arc<dyn Executor>) -> Result<(), RoutingError> {
        self.insert(name, name, executor)?;
        tracing::debug!(executor = name, "registered executor");
        Ok(())
    }

    fn insert(
        &self,
        full: &str,
        name: &str,
        executor: Arc<dyn Executor>,
    ) -> Result<(), RoutingError> {
        let (head, rest) = split_first(name);
        let mut children = self.children.write();

        let subtree = match (children.get(head).cloned(), rest) {
            (None, None) => {
                children.insert(head.to_string(), Node::Leaf(executor));
                return Ok(());
            }
            (Some(Node::Leaf(_)), None) => {
                return Err(RoutingError::DuplicateExecutor { name: full.to_string() });
            }
            (Some(Node::Branch(subtree)), _) => subtree,
            (Some(Node::Leaf(leaf)), Some(_)) => {
                let promoted = Router::new();
                promoted.children.write().insert(CATCH_ALL.to_string(), Node::Leaf(leaf));
                let promoted = Arc::new(promoted);
                children.insert(head.to_string(), Node::Branch(Arc::clone(&promoted)));
                promoted
            }
            (None, Some(_)) => {
                let created = Arc::new(Router::new());
                children.insert(head.to_string(), Node::Branch(Arc::clone(&created)));
                created
            }
        };
        drop(children);

        subtree.insert(full, rest.unwrap_or(CATCH_ALL), executor)
    }

    /// Remove the executors registered under `names`, pruning sub-trees left
    /// empty. Unknown names are ignored.
    pub fn unregister<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.remove(name.as_ref());
        }
    }

    fn remove(&self, name: &str) {
        let (head, rest) = split_first(name);
        let mut children = self.children.write();
        let prune = match (children.get(head).cloned(), rest) {
            (Some(Node::Leaf(_)), None) => true,
            (Some(Node::Branch(subtree)), rest) => {
                subtree.remove(rest.unwrap_or(CATCH_ALL));
                subtree.is_empty()
            }
            _ => false,
        };
        if prune {
            children.remove(head);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty()
    }

    /// Every leaf with its fully qualified name, sorted by name.
    pub fn enumerate(&self) -> Vec<(String, Arc<dyn Executor>)> {
        let mut leaves = Vec::new();
        self.collect("", &mut leaves);
        leaves.sort_by(|a, b| a.0.cmp(&b.0));
        leaves
    }

    fn collect(&self, prefix: &str, out: &mut Vec<(String, Arc<dyn Executor>)>) {
        for (segment, node) in self.children.read().iter() {
            let path = id::join(prefix, segment);
            match node {
                Node::Leaf(executor) => out.push((path, Arc::clone(executor))),
                Node::Branch(subtree) => subtree.collect(&path, out),
            }
        }
    }

    /// Resolve `name` to a leaf and the part of the name left for it.
    ///
    /// Exact and wildcard hits consume the first segment; a catch-all hit
    /// consumes nothing, so a promoted leaf sees the same name as before.
    pub fn resolve(&self, name: &str) -> Option<(Arc<dyn Executor>, String)> {
        let (head, rest) = split_first(name);
        let (node, rest) = {
            let children = self.children.read();
            match [head, WILDCARD].iter().find_map(|key| children.get(*key).cloned()) {
                Some(node) => (node, rest.unwrap_or(CATCH_ALL)),
                None => (children.get(CATCH_ALL).cloned()?, name),
            }
        };
        match node {
            Node::Leaf(executor) => Some((executor, rest.to_string())),
            Node::Branch(subtree) => subtree.resolve(rest),
        }
    }

    /// Distinct leaves; an executor registered under several names appears once.
    fn distinct_leaves(&self) -> Vec<(String, Arc<dyn Executor>)> {
        let mut seen = std::collections::HashSet::new();
        self.enumerate()
            .into_iter()
            .filter(|(_, executor)| seen.insert(Arc::as_ptr(executor) as *const () as usize))
            .collect()
    }
}

#[async_trait]
impl Executor for Router {
    async fn execute(
        &self,
        session: &Arc<Session>,
        task: &mut Task,
    ) -> Result<TaskResult, ExecutorError> {
        let Some((executor, rest)) = self.resolve(&task.executor) else {
            return Err(RoutingError::NoExecutorFound { name: task.executor.clone() }.into());
        };
        tracing::trace!(
            task_id = %task.id,
            executor = %task.executor,
            rest = %rest,
            "routing task"
        );

        let name = std::mem::replace(&mut task.executor, rest);
        let result = executor.execute(session, task).await;
        task.executor = name;
        result
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        let leaves = self.distinct_leaves();
        let results = join_all(leaves.iter().map(|(_, leaf)| leaf.open_session(session))).await;

        let mut errors = Vec::new();
        for ((name, _), result) in leaves.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(
                    session_id = %session.id(),
                    executor = %name,
                    error = %e,
                    "failed to open session"
                );
                errors.push(e);
            }
        }
        ExecutorError::aggregate(errors)
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<(), ExecutorError> {
        let leaves = self.distinct_leaves();
        let results = join_all(leaves.iter().map(|(_, leaf)| leaf.close_session(session_id))).await;

        for ((name, _), result) in leaves.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(
                    session_id = %session_id,
                    executor = %name,
                    error = %e,
                    "failed to close session"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
