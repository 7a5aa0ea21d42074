//! Common test utilities for jobwatch integration tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use jobwatch::{Config, Credentials, SubmitMode};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Custom-resource collection on the stub orchestrator
pub const EXECUTIONS: &str = "/apis/netbasequid.canalflow/v1/namespaces/canal-flow/executions";

/// Workflow collection on the stub orchestrator
pub const WORKFLOWS: &str = "/apis/argoproj.io/v1alpha1/namespaces/canal-flow/workflows";

/// Configuration pointing every collaborator at one mock server
pub fn config_for(server: &MockServer, mode: SubmitMode) -> Config {
    let mut config = Config {
        mode,
        credentials: Some(Credentials::new("analyst@example.com", "s3cret")),
        ..Default::default()
    };
    config.orchestrator.api_server = server.uri();
    config.anonymous.base_url = server.uri();
    config.anonymous.workspace = "marshall".to_string();
    config.anonymous.execution_name = "gpt-chat".to_string();
    config.artifacts.base_url = server.uri();
    config.watch.deadline = Duration::from_secs(10);
    config.retry.max_attempts = 0;
    config
}

/// Answer a create call for `task` with the given generated name and UID
#[allow(dead_code)]
pub async fn mount_create(server: &MockServer, task: &str, name: &str, uid: &str) {
    Mock::given(method("POST"))
        .and(path(EXECUTIONS))
        .and(body_partial_json(json!({"spec": {"task": task}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "metadata": {"name": name, "uid": uid, "namespace": "canal-flow"}
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve a watch stream for one resource
#[allow(dead_code)]
pub async fn mount_watch(server: &MockServer, collection: &str, name: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(collection))
        .and(query_param("watch", "true"))
        .and(query_param("fieldSelector", format!("metadata.name={}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}
