// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn failed_message_is_verbatim() {
    let err = ExecutorError::failed("kustomize: accumulating resources: boom");
    assert_eq!(err.to_string(), "kustomize: accumulating resources: boom");
    assert!(err.is_execution_failure());
}

#[test]
fn routing_errors_are_not_execution_failures() {
    let err: ExecutorError = RoutingError::NoExecutorFound { name: "deploy.run".into() }.into();
    assert!(!err.is_execution_failure());
    assert!(err.to_string().contains("deploy.run"));
}

#[test]
fn aggregate_of_none_is_ok() {
    assert!(ExecutorError::aggregate(vec![]).is_ok());
}

#[test]
fn aggregate_of_one_is_that_error() {
    let err = ExecutorError::aggregate(vec![ExecutorError::failed("only")]).unwrap_err();
    assert!(matches!(err, ExecutorError::Failed(ref m) if m == "only"));
}

#[test]
fn aggregate_keeps_every_message() {
    let err = ExecutorError::aggregate(vec![
        ExecutorError::failed("first"),
        ExecutorError::transport("second"),
    ])
    .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("first"));
    assert!(text.contains("second"));
}

#[test]
fn session_error_names_the_session() {
    let err: ExecutorError = SessionError::Unknown(SessionId::from_string("ses-x")).into();
    assert_eq!(err.to_string(), "unknown session: ses-x");
}
