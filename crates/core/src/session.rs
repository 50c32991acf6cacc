// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sessions: an isolated workspace (source + output filesystem pair) scoping
//! one build run.

use crate::fs::{Filesystem, LocalFs, MemoryFs};
use crate::id::{SessionId, TaskId};
use crate::log::{LogSink, Logger, TracingSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Directory under a local workspace that holds task outputs.
pub const OUTPUT_DIR: &str = ".kiln/out";

/// Describes how a session's filesystems are backed.
///
/// A `Local` workspace implies every process touching the session shares
/// the same path on disk; `Test` sessions are in-memory and share nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workspace {
    Local { path: PathBuf },
    Test,
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workspace::Local { path } => write!(f, "local({})", path.display()),
            Workspace::Test => write!(f, "test"),
        }
    }
}

pub struct Session {
    id: SessionId,
    workspace: Workspace,
    source: Arc<dyn Filesystem>,
    output: Arc<dyn Filesystem>,
    log: Arc<dyn LogSink>,
    cancel: CancellationToken,
}

impl Session {
    /// Build a session of the kind `workspace` describes.
    ///
    /// Local sessions read sources from the workspace root and write outputs
    /// under [`OUTPUT_DIR`], which is created if missing. Source globs never
    /// match anything under [`OUTPUT_DIR`].
    pub fn open(id: SessionId, workspace: Workspace) -> io::Result<Self> {
        let (source, output): (Arc<dyn Filesystem>, Arc<dyn Filesystem>) = match &workspace {
            Workspace::Local { path } => {
                let output_root = path.join(OUTPUT_DIR);
                std::fs::create_dir_all(&output_root)?;
                let source = LocalFs::new(path).excluding(OUTPUT_DIR);
                (Arc::new(source), Arc::new(LocalFs::new(output_root)))
            }
            Workspace::Test => (Arc::new(MemoryFs::new()), Arc::new(MemoryFs::new())),
        };
        Ok(Self::new(id, workspace, source, output))
    }

    /// A fresh in-memory session with a random id.
    pub fn in_memory() -> Self {
        Self::new(
            SessionId::new(),
            Workspace::Test,
            Arc::new(MemoryFs::new()),
            Arc::new(MemoryFs::new()),
        )
    }

    /// A fresh session over a local directory with a random id.
    pub fn local(path: impl Into<PathBuf>) -> io::Result<Self> {
        Self::open(SessionId::new(), Workspace::Local { path: path.into() })
    }

    pub fn new(
        id: SessionId,
        workspace: Workspace,
        source: Arc<dyn Filesystem>,
        output: Arc<dyn Filesystem>,
    ) -> Self {
        Self {
            id,
            workspace,
            source,
            output,
            log: Arc::new(TracingSink),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = sink;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn source(&self) -> &Arc<dyn Filesystem> {
        &self.source
    }

    pub fn output(&self) -> &Arc<dyn Filesystem> {
        &self.output
    }

    pub fn log_sink(&self) -> &Arc<dyn LogSink> {
        &self.log
    }

    pub fn logger(&self) -> Logger {
        Logger::new(Arc::clone(&self.log))
    }

    /// Token governing the session's lifetime; cancelled when it closes.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Output directory of `task_id`, relative to the output filesystem.
    pub fn task_output_dir(&self, task_id: &TaskId) -> PathBuf {
        task_id.output_dir()
    }

    /// Create the output directory of `task_id` if missing.
    pub fn ensure_output_dir(&self, task_id: &TaskId) -> io::Result<PathBuf> {
        let dir = self.task_output_dir(task_id);
        self.output.create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Absolute on-disk output directory, for local sessions.
    pub fn task_output_path(&self, task_id: &TaskId) -> Option<PathBuf> {
        self.output.root().map(|root: &Path| root.join(task_id.output_dir()))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
