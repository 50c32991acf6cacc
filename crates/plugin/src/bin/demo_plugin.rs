// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small plugin used to exercise the host/plugin channel end to end.
//!
//! Executors: `echo` writes a message to an output file, `fail` fails with
//! the given message, `fanout` emits `count` echo follow-ups.

use async_trait::async_trait;
use kiln_core::{
    ExecutorError, NativeExecutor, Session, Task, TaskContext, TaskHandler, TaskResult,
};
use kiln_engine::Router;
use serde::Deserialize;
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Deserialize)]
struct EchoArgs {
    message: String,
    #[serde(default = "default_output")]
    output: String,
}

fn default_output() -> String {
    "out.txt".to_string()
}

struct Echo;

#[async_trait]
impl TaskHandler for Echo {
    type Args = EchoArgs;

    async fn run(&self, ctx: TaskContext, args: EchoArgs) -> Result<TaskResult, ExecutorError> {
        ctx.logger().info(format!("echo {}", ctx.task.id));
        let path = ctx.write_output(&args.output, args.message.as_bytes())?;
        Ok(TaskResult::new().output(path))
    }

    async fn open_session(&self, session: &Arc<Session>) -> Result<(), ExecutorError> {
        session.logger().info("echo ready");
        Ok(())
    }
}

#[derive(Deserialize)]
struct FailArgs {
    message: String,
}

struct Fail;

#[async_trait]
impl TaskHandler for Fail {
    type Args = FailArgs;

    async fn run(&self, _ctx: TaskContext, args: FailArgs) -> Result<TaskResult, ExecutorError> {
        Err(ExecutorError::Failed(args.message))
    }
}

#[derive(Deserialize)]
struct FanoutArgs {
    count: usize,
    /// Executor name the follow-ups are addressed to, as seen by the host.
    executor: String,
}

struct Fanout;

#[async_trait]
impl TaskHandler for Fanout {
    type Args = FanoutArgs;

    async fn run(&self, _ctx: TaskContext, args: FanoutArgs) -> Result<TaskResult, ExecutorError> {
        let result = (0..args.count).fold(TaskResult::new(), |result, i| {
            let task = Task::new(format!("item{i}"), args.executor.as_str())
                .args(json!({ "message": format!("item {i}") }));
            result.followup(task)
        });
        Ok(result)
    }
}

fn router() -> Result<Router, kiln_core::RoutingError> {
    let router = Router::new();
    router.register("echo", Arc::new(NativeExecutor::new(Echo)))?;
    router.register("fail", Arc::new(NativeExecutor::new(Fail)))?;
    router.register("fanout", Arc::new(NativeExecutor::new(Fanout)))?;
    Ok(router)
}

#[tokio::main]
async fn main() -> ExitCode {
    kiln_plugin::logging::init_stderr();

    let router = match router() {
        Ok(router) => router,
        Err(e) => {
            tracing::error!(error = %e, "failed to register executors");
            return ExitCode::FAILURE;
        }
    };
    match kiln_plugin::serve_stdio(Arc::new(router)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "plugin stopped");
            eprintln!("kiln-demo-plugin: {e}");
            ExitCode::FAILURE
        }
    }
}
