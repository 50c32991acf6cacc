// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing and scheduling a dynamically growing build.

use crate::prelude::*;

fn docs_task() -> Task {
    Task::new("docs", "text.split")
        .inputs(["src/*.txt"])
        .args(json!({ "executor": "text.concat" }))
}

#[tokio::test]
async fn followups_fan_out_and_the_bundle_waits_for_every_part() {
    let ws = Workspace::new();
    ws.write("src/a.txt", "A");
    ws.write("src/b.txt", "B");

    let scheduler = Scheduler::new(Arc::new(local_router()));
    let report = scheduler.run_session(&ws.session(), vec![docs_task()]).await.unwrap();

    let (executed, skipped) = ids(&report);
    assert_eq!(executed, vec!["docs", "docs.bundle", "docs.part0", "docs.part1"]);
    assert!(skipped.is_empty());
    assert_eq!(report.executed.last().map(|id| id.as_str()), Some("docs.bundle"));
    assert_eq!(ws.output("docs/part0/part.txt"), "A");
    assert_eq!(ws.output("docs/part1/part.txt"), "B");
    assert_eq!(ws.output("docs/bundle/bundle.txt"), "bundle\nAB");
}

#[tokio::test]
async fn a_failed_branch_does_not_stop_the_others() {
    let ws = Workspace::new();
    ws.write("src/a.txt", "A");
    let router = local_router();
    let lint = RecordingExecutor::new().fail_task("lint", "3 warnings");
    router.register("lint", Arc::new(lint)).unwrap();

    let tasks = vec![
        Task::new("lint", "lint"),
        Task::new("publish", "text.concat")
            .depends_on(["lint"])
            .args(json!({ "output": "site.txt" })),
        Task::new("copy", "text.concat").inputs(["src/*.txt"]).args(json!({ "output": "a.txt" })),
    ];
    let scheduler = Scheduler::new(Arc::new(router));
    let err = scheduler.run_session(&ws.session(), tasks).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "2 tasks failed; lint: 3 warnings; publish: dependency lint failed"
    );
    assert_eq!(err.failed_tasks(), vec!["lint", "publish"]);
    let (executed, _) = ids(err.report().unwrap());
    assert_eq!(executed, vec!["copy"]);
    assert_eq!(ws.output("copy/a.txt"), "A");
}

#[tokio::test]
async fn unroutable_executor_fails_only_its_task() {
    let ws = Workspace::new();
    let tasks = vec![
        Task::new("mystery", "video.encode"),
        Task::new("ok", "text.concat").args(json!({ "output": "empty.txt" })),
    ];

    let err = Scheduler::new(Arc::new(local_router()))
        .run_session(&ws.session(), tasks)
        .await
        .unwrap_err();

    let failure = &err.failures()[0];
    assert_eq!(failure.task_id, "mystery");
    assert_eq!(failure.to_string(), "mystery: no executor found for \"video.encode\"");
    assert_eq!(err.report().unwrap().executed, vec![kiln_core::TaskId::from("ok")]);
}

#[tokio::test]
async fn bad_arguments_are_reported_as_decode_errors() {
    let ws = Workspace::new();
    let task = Task::new("t", "text.concat").args(json!({ "output": ["not", "a", "string"] }));

    let err = Scheduler::new(Arc::new(local_router()))
        .run_session(&ws.session(), vec![task])
        .await
        .unwrap_err();

    let failure = &err.failures()[0];
    assert!(
        matches!(failure.error, TaskError::Executor(ExecutorError::Decode(_))),
        "{failure}"
    );
}

#[tokio::test]
async fn failing_session_open_runs_nothing() {
    let ws = Workspace::new();
    let router = local_router();
    let broken = RecordingExecutor::new().fail_open("license server unreachable");
    router.register("cad", Arc::new(broken)).unwrap();

    let err = Scheduler::new(Arc::new(router))
        .run_session(&ws.session(), vec![docs_task()])
        .await
        .unwrap_err();

    assert!(matches!(err, ScheduleError::OpenSession(_)));
    assert_eq!(err.to_string(), "failed to open session: license server unreachable");
    assert!(!ws.output_path("docs").exists());
}

#[tokio::test]
async fn concurrency_ceiling_applies_across_followups() {
    let ws = Workspace::new();
    let leaves =
        (0..8).fold(TaskResult::new(), |r, i| r.followup(Task::new(format!("leaf{i}"), "slow")));
    let slow = RecordingExecutor::new()
        .with_delay(std::time::Duration::from_millis(10))
        .with_result("root", leaves);
    let router = Router::new();
    router.register("slow", Arc::new(slow.clone())).unwrap();

    let report = Scheduler::new(Arc::new(router))
        .with_config(SchedulerConfig::default().max_concurrency(2).cache(false))
        .run_session(&ws.session(), vec![Task::new("root", "slow")])
        .await
        .unwrap();

    assert_eq!(report.completed(), 9);
    assert_eq!(slow.max_in_flight(), 2);
}
