// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: a workspace on disk and a few native executors.

pub use async_trait::async_trait;
pub use kiln_core::test_support::{CollectSink, RecordingExecutor};
pub use kiln_core::{
    Executor, ExecutorError, NativeExecutor, Session, Task, TaskContext, TaskHandler, TaskResult,
};
pub use kiln_engine::{Router, RunReport, ScheduleError, Scheduler, SchedulerConfig, TaskError};
pub use serde::Deserialize;
pub use serde_json::json;
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
use tempfile::TempDir;

/// A temporary workspace directory with a local session over it.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn write(&self, path: &str, contents: &str) {
        let path = self.dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Read a task output, relative to the output root.
    pub fn output(&self, path: &str) -> String {
        std::fs::read_to_string(self.output_path(path)).unwrap()
    }

    pub fn output_path(&self, path: &str) -> PathBuf {
        self.dir.path().join(kiln_core::session::OUTPUT_DIR).join(path)
    }

    /// A fresh session; every run of a build gets its own.
    pub fn session(&self) -> Arc<Session> {
        Arc::new(Session::local(self.dir.path()).unwrap())
    }
}

#[derive(Deserialize)]
pub struct ConcatArgs {
    pub output: String,
    #[serde(default)]
    pub header: String,
}

/// Concatenates every input file into one output.
pub struct Concat;

#[async_trait]
impl TaskHandler for Concat {
    type Args = ConcatArgs;

    async fn run(&self, ctx: TaskContext, args: ConcatArgs) -> Result<TaskResult, ExecutorError> {
        let mut data = args.header.into_bytes();
        for file in ctx.input_files()? {
            data.extend(ctx.read_source(&file)?);
        }
        let path = ctx.write_output(&args.output, &data)?;
        Ok(TaskResult::new().output(path))
    }
}

#[derive(Deserialize)]
pub struct SplitArgs {
    pub executor: String,
}

/// Emits one concat follow-up per input file, plus a `bundle` follow-up
/// concatenating the parts' outputs once they exist.
pub struct Split;

#[async_trait]
impl TaskHandler for Split {
    type Args = SplitArgs;

    async fn run(&self, ctx: TaskContext, args: SplitArgs) -> Result<TaskResult, ExecutorError> {
        let mut result = TaskResult::new();
        let mut parts = Vec::new();
        for (i, file) in ctx.input_files()?.into_iter().enumerate() {
            let id = format!("part{i}");
            let task = Task::new(id.as_str(), args.executor.as_str())
                .inputs([file.to_string_lossy().into_owned()])
                .args(json!({ "output": "part.txt" }));
            result = result.followup(task);
            parts.push(id);
        }
        let parts_glob = format!(
            "{}/{}/part*/part.txt",
            kiln_core::session::OUTPUT_DIR,
            ctx.task.id.output_dir().display()
        );
        let bundle = Task::new("bundle", args.executor.as_str())
            .inputs([parts_glob])
            .depends_on(parts)
            .args(json!({ "output": "bundle.txt", "header": "bundle\n" }));
        Ok(result.followup(bundle))
    }
}

pub fn local_router() -> Router {
    let router = Router::new();
    router.register("text.concat", Arc::new(NativeExecutor::new(Concat))).unwrap();
    router.register("text.split", Arc::new(NativeExecutor::new(Split))).unwrap();
    router
}

pub fn ids(report: &RunReport) -> (Vec<String>, Vec<String>) {
    let mut executed: Vec<String> = report.executed.iter().map(|id| id.to_string()).collect();
    let mut skipped: Vec<String> = report.skipped.iter().map(|id| id.to_string()).collect();
    executed.sort();
    skipped.sort();
    (executed, skipped)
}
