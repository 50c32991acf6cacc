// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental rebuilds driven by saved task state.

use crate::prelude::*;

fn docs_task() -> Task {
    Task::new("docs", "text.split")
        .inputs(["src/*.txt"])
        .args(json!({ "executor": "text.concat" }))
}

fn sources() -> Workspace {
    let ws = Workspace::new();
    ws.write("src/a.txt", "A");
    ws.write("src/b.txt", "B");
    ws
}

async fn build(ws: &Workspace, config: SchedulerConfig) -> (Vec<String>, Vec<String>) {
    let scheduler = Scheduler::new(Arc::new(local_router())).with_config(config);
    let report = scheduler.run_session(&ws.session(), vec![docs_task()]).await.unwrap();
    ids(&report)
}

fn strs(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

const ALL: [&str; 4] = ["docs", "docs.bundle", "docs.part0", "docs.part1"];

#[tokio::test]
async fn unchanged_build_is_skipped_and_replays_followups() {
    let ws = sources();
    build(&ws, SchedulerConfig::default()).await;

    let (executed, skipped) = build(&ws, SchedulerConfig::default()).await;

    assert!(executed.is_empty(), "{executed:?}");
    assert_eq!(skipped, strs(&ALL));
    assert_eq!(ws.output("docs/bundle/bundle.txt"), "bundle\nAB");
}

#[tokio::test]
async fn editing_one_input_reruns_only_what_depends_on_it() {
    let ws = sources();
    build(&ws, SchedulerConfig::default()).await;
    ws.write("src/b.txt", "b2");

    let (executed, skipped) = build(&ws, SchedulerConfig::default()).await;

    assert_eq!(executed, strs(&["docs", "docs.bundle", "docs.part1"]));
    assert_eq!(skipped, strs(&["docs.part0"]));
    assert_eq!(ws.output("docs/bundle/bundle.txt"), "bundle\nAb2");
}

#[tokio::test]
async fn deleted_output_is_rebuilt() {
    let ws = sources();
    build(&ws, SchedulerConfig::default()).await;
    std::fs::remove_file(ws.output_path("docs/part0/part.txt")).unwrap();

    let (executed, skipped) = build(&ws, SchedulerConfig::default()).await;

    assert_eq!(executed, strs(&["docs.part0"]));
    assert_eq!(skipped, strs(&["docs", "docs.bundle", "docs.part1"]));
    assert_eq!(ws.output("docs/part0/part.txt"), "A");
}

#[tokio::test]
async fn new_input_file_reruns_the_splitter() {
    let ws = sources();
    build(&ws, SchedulerConfig::default()).await;
    ws.write("src/c.txt", "C");

    let (executed, skipped) = build(&ws, SchedulerConfig::default()).await;

    assert_eq!(executed, strs(&["docs", "docs.bundle", "docs.part2"]));
    assert_eq!(skipped, strs(&["docs.part0", "docs.part1"]));
    assert_eq!(ws.output("docs/bundle/bundle.txt"), "bundle\nABC");
}

#[tokio::test]
async fn changed_arguments_rerun_the_task() {
    let ws = sources();
    let router = Arc::new(local_router());
    let concat = |header: &str| {
        Task::new("all", "text.concat")
            .inputs(["src/*.txt"])
            .args(json!({ "output": "all.txt", "header": header }))
    };

    let scheduler = Scheduler::new(router);
    scheduler.run_session(&ws.session(), vec![concat("v1 ")]).await.unwrap();
    let same = scheduler.run_session(&ws.session(), vec![concat("v1 ")]).await.unwrap();
    let changed = scheduler.run_session(&ws.session(), vec![concat("v2 ")]).await.unwrap();

    assert_eq!(same.skipped, vec![kiln_core::TaskId::from("all")]);
    assert_eq!(changed.executed, vec![kiln_core::TaskId::from("all")]);
    assert_eq!(ws.output("all/all.txt"), "v2 AB");
}

#[tokio::test]
async fn disabled_cache_always_executes() {
    let ws = sources();
    let config = SchedulerConfig::default().cache(false);
    build(&ws, config.clone()).await;

    let (executed, skipped) = build(&ws, config).await;

    assert_eq!(executed, strs(&ALL));
    assert!(skipped.is_empty());
    assert!(!ws.output_path("docs/.kiln-state.json").exists());
}

#[tokio::test]
async fn state_is_saved_next_to_task_outputs() {
    let ws = sources();
    build(&ws, SchedulerConfig::default()).await;

    let raw = std::fs::read_to_string(ws.output_path("docs/part0/.kiln-state.json")).unwrap();
    let state: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(state["executor"], "text.concat");
    assert_eq!(state["patterns"], json!(["src/a.txt"]));
    assert_eq!(state["inputs"], json!(["src/a.txt"]));
    for key in ["argumentsChecksum", "inputsChecksum", "outputsChecksum", "followupsChecksum"] {
        assert_eq!(state[key].as_str().map(str::len), Some(64), "{key}");
    }
}
