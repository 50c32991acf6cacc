// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::args::RequiredFields;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct ConcatArgs {
    output: String,
}

/// Concatenates every input file into one output.
struct Concat;

#[async_trait]
impl TaskHandler for Concat {
    type Args = ConcatArgs;

    async fn run(&self, ctx: TaskContext, args: ConcatArgs) -> Result<TaskResult, ExecutorError> {
        let mut data = Vec::new();
        for file in ctx.input_files()? {
            data.extend(ctx.read_source(&file)?);
        }
        ctx.logger().info(format!("concatenated {} bytes", data.len()));
        let path = ctx.write_output(&args.output, &data)?;
        Ok(TaskResult::new().output(path))
    }
}

fn session_with_sources() -> Arc<Session> {
    let session = Session::in_memory();
    session.source().write(Path::new("src/a.txt"), b"a").unwrap();
    session.source().write(Path::new("src/b.txt"), b"b").unwrap();
    Arc::new(session)
}

#[tokio::test]
async fn native_executor_decodes_args_and_runs_handler() {
    let session = session_with_sources();
    let executor = NativeExecutor::new(Concat);
    let mut task = Task::new("join", "concat")
        .inputs(["src/*.txt"])
        .args(json!({ "output": "all.txt" }));

    let result = executor.execute(&session, &mut task).await.unwrap();

    assert_eq!(result.outputs, vec![PathBuf::from("join/all.txt")]);
    assert_eq!(session.output().read(Path::new("join/all.txt")).unwrap(), b"ab");
}

#[tokio::test]
async fn native_executor_rejects_undecodable_args() {
    let session = session_with_sources();
    let executor = NativeExecutor::new(Concat);
    let mut task = Task::new("join", "concat").args(json!({ "output": 7 }));

    let err = executor.execute(&session, &mut task).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn validator_runs_before_decode() {
    let session = session_with_sources();
    let executor = NativeExecutor::new(Concat)
        .with_validator(Arc::new(RequiredFields(vec!["output".to_string()])));
    let mut task = Task::new("join", "concat").args(json!({}));

    let err = executor.execute(&session, &mut task).await.unwrap_err();
    match err {
        ExecutorError::Decode(e) => assert_eq!(e.field.as_deref(), Some("output")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn session_hooks_default_to_ok() {
    let session = session_with_sources();
    let executor = NativeExecutor::new(Concat);
    assert!(executor.open_session(&session).await.is_ok());
    assert!(executor.close_session(session.id()).await.is_ok());
}
