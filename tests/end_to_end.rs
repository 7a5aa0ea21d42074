//! End-to-end runs against a stub orchestrator
//!
//! One wiremock server plays the API server (create + watch), the anonymous execution
//! API and the artifact server.

mod common;

use common::*;
use jobwatch::{
    Error, ExecutionEngine, ExecutionRequest, ExecutionStatus, SubmitMode, WatchError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASIC_AUTH: &str = "Basic YW5hbHlzdEBleGFtcGxlLmNvbTpzM2NyZXQ=";

#[tokio::test]
async fn immediate_success_yields_normalized_parameters() {
    let server = MockServer::start().await;
    mount_create(&server, "t1", "jobwatch-t1abc", "uid-t1").await;
    mount_watch(
        &server,
        EXECUTIONS,
        "jobwatch-t1abc",
        watch_body(&[execution_object(
            "jobwatch-t1abc",
            "uid-t1",
            "Succeeded",
            json!({"parameters": [{"name": "y", "value": 2}]}),
        )]),
    )
    .await;

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::CustomResource)).unwrap();
    let bundle = engine
        .run(ExecutionRequest::new("t1").parameter("x", 1))
        .await
        .unwrap();

    assert_eq!(bundle.status, ExecutionStatus::Succeeded);
    assert_eq!(bundle.parameters.len(), 1);
    assert_eq!(bundle.parameters["y"].name, "y");
    assert_eq!(bundle.parameters["y"].value, 2);
    assert!(bundle.artifacts.is_empty());
}

#[tokio::test]
async fn create_call_carries_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EXECUTIONS))
        .and(body_partial_json(json!({
            "kind": "Execution",
            "spec": {
                "task": "t1",
                "arguments": {"parameters": [{"name": "x", "value": 1}], "artifacts": []},
                "activeDeadlineSeconds": 7200
            }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"metadata": {"name": "jobwatch-a", "uid": "u"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_watch(
        &server,
        EXECUTIONS,
        "jobwatch-a",
        watch_body(&[execution_object("jobwatch-a", "u", "Succeeded", json!({}))]),
    )
    .await;

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::CustomResource)).unwrap();
    engine
        .run(ExecutionRequest::new("t1").parameter("x", 1))
        .await
        .unwrap();
}

#[tokio::test]
async fn one_failed_artifact_leaves_the_other() {
    let server = MockServer::start().await;
    mount_create(&server, "report", "jobwatch-r", "uid-r").await;
    mount_watch(
        &server,
        EXECUTIONS,
        "jobwatch-r",
        watch_body(&[
            execution_object("jobwatch-r", "uid-r", "Running", json!({})),
            execution_object(
                "jobwatch-r",
                "uid-r",
                "Succeeded",
                json!({"artifacts": [
                    {"name": "answer-markdown", "s3": {"key": "r/answer.md"}},
                    {"name": "answer-html", "s3": {"key": "r/answer.html"}}
                ]}),
            ),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/execution/uid-r/artifact/answer-markdown"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Report"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/execution/uid-r/artifact/answer-html"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::CustomResource)).unwrap();
    let bundle = engine.run(ExecutionRequest::new("report")).await.unwrap();

    assert_eq!(bundle.artifacts.len(), 1);
    let markdown = bundle.artifact("answer-markdown").unwrap();
    assert_eq!(markdown.mime_type, "text/markdown");
    assert_eq!(markdown.text(), "# Report");
}

#[tokio::test]
async fn tgz_artifact_is_materialized_with_decoded_text() {
    let server = MockServer::start().await;
    mount_create(&server, "bundle", "jobwatch-b", "uid-b").await;
    mount_watch(
        &server,
        EXECUTIONS,
        "jobwatch-b",
        watch_body(&[execution_object(
            "jobwatch-b",
            "uid-b",
            "Succeeded",
            json!({"artifacts": [{"name": "bundle.tgz"}]}),
        )]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/execution/uid-b/artifact/bundle.tgz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(tgz(&[("hello.txt", "hello")])),
        )
        .mount(&server)
        .await;

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::CustomResource)).unwrap();
    let bundle = engine.run(ExecutionRequest::new("bundle")).await.unwrap();

    let artifact = bundle.artifact("bundle.tgz").unwrap();
    assert_eq!(artifact.mime_type, "application/octet-stream");
    assert_eq!(artifact.text_if_decoded.as_deref(), Some("hello"));
}

#[tokio::test]
async fn rejected_submission_reports_status_and_body() {
    let server = MockServer::start().await;
    let body = r#"{"kind":"Status","status":"Failure","message":"admission webhook denied the request: unknown task"}"#;
    Mock::given(method("POST"))
        .and(path(EXECUTIONS))
        .respond_with(ResponseTemplate::new(400).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::CustomResource)).unwrap();
    let err = engine
        .run(ExecutionRequest::new("missing-task"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    let message = err.to_string();
    assert!(message.contains("status: 400"), "{message}");
    assert!(message.contains(body), "{message}");
}

#[tokio::test]
async fn stream_ending_before_terminal_status_is_a_watch_error() {
    let server = MockServer::start().await;
    mount_create(&server, "stuck", "jobwatch-s", "uid-s").await;
    mount_watch(
        &server,
        EXECUTIONS,
        "jobwatch-s",
        watch_body(&[execution_object("jobwatch-s", "uid-s", "Running", json!({}))]),
    )
    .await;

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::CustomResource)).unwrap();
    let err = engine.run(ExecutionRequest::new("stuck")).await.unwrap_err();

    assert!(
        matches!(err, Error::Watch(WatchError::EndedEarly { events: 1, .. })),
        "{err:?}"
    );
}

#[tokio::test]
async fn batch_runs_in_input_order() {
    let server = MockServer::start().await;
    for (task, name) in [("first", "jobwatch-1"), ("second", "jobwatch-2")] {
        mount_create(&server, task, name, &format!("uid-{name}")).await;
        mount_watch(
            &server,
            EXECUTIONS,
            name,
            watch_body(&[execution_object(
                name,
                &format!("uid-{name}"),
                "Succeeded",
                json!({"parameters": [{"name": "task", "value": task}]}),
            )]),
        )
        .await;
    }

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::CustomResource)).unwrap();
    let results = engine
        .run_all(vec![
            ExecutionRequest::new("first"),
            ExecutionRequest::new("second"),
        ])
        .await;

    let tasks: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().parameters["task"].value.clone())
        .collect();
    assert_eq!(tasks, vec![json!("first"), json!("second")]);
}

#[tokio::test]
async fn anonymous_execution_is_watched_as_a_workflow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workspace/marshall/anonymous/execution"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_partial_json(json!({
            "workspace": "marshall",
            "steps": [[{"name": "gpt-chat", "task": "ask"}]]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "gpt-chat-x7k2p", "workflowUid": "wf-uid"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_watch(
        &server,
        WORKFLOWS,
        "gpt-chat-x7k2p",
        watch_body(&[
            workflow_object("gpt-chat-x7k2p", "wf-uid", "Running", json!({})),
            workflow_object(
                "gpt-chat-x7k2p",
                "wf-uid",
                "Succeeded",
                json!({
                    "parameters": [{"name": "topicId", "value": "42"}],
                    "artifacts": [{"name": "raw-result", "s3": {"key": "gpt/raw.json"}}]
                }),
            ),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/artifacts-by-uid/wf-uid/gpt-chat-x7k2p/raw-result"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string(r#"{"answer":"yes"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = ExecutionEngine::new(config_for(&server, SubmitMode::Anonymous)).unwrap();
    let bundle = engine
        .run(
            ExecutionRequest::new("ask")
                .parameter("prompt", "is it?")
                .output_artifact("raw-result"),
        )
        .await
        .unwrap();

    assert_eq!(bundle.execution.name, "gpt-chat-x7k2p");
    assert_eq!(bundle.parameters["topicId"].value, "42");
    let raw = bundle.artifact("raw-result").unwrap();
    assert_eq!(raw.mime_type, "application/json");
    assert_eq!(raw.file_name, "raw-result.json");
    assert_eq!(raw.text(), r#"{"answer":"yes"}"#);
}
