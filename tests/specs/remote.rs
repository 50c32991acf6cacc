// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds mixing local executors with executors served over the plugin
//! channel.

use crate::prelude::*;
use kiln_core::LogLevel;
use kiln_plugin::{RemoteExecutor, RpcClient};
use std::time::Duration;

/// Serve `executor` in-process over a duplex pipe and return the host end.
async fn plugin(executor: Arc<dyn Executor>) -> RemoteExecutor {
    let (host, plugin) = tokio::io::duplex(64 * 1024);
    let (host_read, host_write) = tokio::io::split(host);
    let (plugin_read, plugin_write) = tokio::io::split(plugin);
    tokio::spawn(kiln_plugin::serve(plugin_read, plugin_write, executor));

    let client = Arc::new(RpcClient::connect(host_read, host_write));
    client.handshake(Duration::from_secs(5)).await.unwrap();
    RemoteExecutor::new(client)
}

#[derive(Deserialize)]
struct ShoutArgs {
    message: String,
}

/// Logs its message at warn level and produces nothing.
struct Shout;

#[async_trait]
impl TaskHandler for Shout {
    type Args = ShoutArgs;

    async fn run(&self, ctx: TaskContext, args: ShoutArgs) -> Result<TaskResult, ExecutorError> {
        ctx.logger().warn(args.message);
        Ok(TaskResult::new())
    }
}

async fn host_router(plugin_side: Router) -> Router {
    let router = local_router();
    router.register("remote", Arc::new(plugin(Arc::new(plugin_side)).await)).unwrap();
    router
}

#[tokio::test]
async fn followups_can_run_in_a_plugin() {
    let ws = Workspace::new();
    ws.write("src/a.txt", "A");
    ws.write("src/b.txt", "B");
    let plugin_side = Router::new();
    plugin_side.register("concat", Arc::new(NativeExecutor::new(Concat))).unwrap();
    let router = host_router(plugin_side).await;

    let docs = Task::new("docs", "text.split")
        .inputs(["src/*.txt"])
        .args(json!({ "executor": "remote.concat" }));
    let report = Scheduler::new(Arc::new(router))
        .run_session(&ws.session(), vec![docs])
        .await
        .unwrap();

    assert_eq!(report.completed(), 4);
    assert_eq!(ws.output("docs/bundle/bundle.txt"), "bundle\nAB");
}

#[tokio::test]
async fn plugin_failure_reaches_the_report_verbatim() {
    let message = "rustc: error[E0308]: mismatched types\n --> src/lib.rs:4:5";
    let plugin_side = Router::new();
    let flaky = RecordingExecutor::new().fail_task("compile", message);
    plugin_side.register("cargo", Arc::new(flaky)).unwrap();
    let router = host_router(plugin_side).await;

    let ws = Workspace::new();
    let err = Scheduler::new(Arc::new(router))
        .run_session(&ws.session(), vec![Task::new("compile", "remote.cargo")])
        .await
        .unwrap_err();

    let failure = &err.failures()[0];
    assert!(matches!(failure.error, TaskError::Executor(ExecutorError::Failed(_))));
    assert_eq!(failure.error.to_string(), message);
}

#[tokio::test]
async fn plugin_logs_land_in_the_host_session() {
    let plugin_side = Router::new();
    plugin_side.register("shout", Arc::new(NativeExecutor::new(Shout))).unwrap();
    let router = host_router(plugin_side).await;

    let ws = Workspace::new();
    let sink = Arc::new(CollectSink::default());
    let session = Arc::new(Session::local(ws.dir.path()).unwrap().with_log_sink(sink.clone()));
    let task = Task::new("hello", "remote.shout").args(json!({ "message": "disk almost full" }));
    Scheduler::new(Arc::new(router)).run_session(&session, vec![task]).await.unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1, "{records:?}");
    assert_eq!(records[0].level, LogLevel::Warn);
    assert_eq!(records[0].message, "disk almost full");
}

#[tokio::test]
async fn remote_results_are_cached_like_local_ones() {
    let ws = Workspace::new();
    ws.write("src/a.txt", "A");
    let plugin_side = Router::new();
    plugin_side.register("concat", Arc::new(NativeExecutor::new(Concat))).unwrap();
    let scheduler = Scheduler::new(Arc::new(host_router(plugin_side).await));
    let task = || {
        Task::new("copy", "remote.concat")
            .inputs(["src/a.txt"])
            .args(json!({ "output": "a.txt" }))
    };

    let first = scheduler.run_session(&ws.session(), vec![task()]).await.unwrap();
    let second = scheduler.run_session(&ws.session(), vec![task()]).await.unwrap();

    assert_eq!(first.executed, vec![kiln_core::TaskId::from("copy")]);
    assert_eq!(second.skipped, vec![kiln_core::TaskId::from("copy")]);
}
