//! Orchestrator payload and archive fixtures

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};

/// Build a gzip-compressed tar archive from `(path, content)` entries
pub fn tgz(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .expect("finish tar stream")
        .finish()
        .expect("finish gzip stream")
}

/// `Execution` object with outputs at `status.outputs`
pub fn execution_object(name: &str, uid: &str, phase: &str, outputs: Value) -> Value {
    json!({
        "apiVersion": "netbasequid.canalflow/v1",
        "kind": "Execution",
        "metadata": {"name": name, "uid": uid, "namespace": "canal-flow"},
        "status": {"phase": phase, "outputs": outputs}
    })
}

/// Workflow object with outputs on its root node
pub fn workflow_object(name: &str, uid: &str, phase: &str, outputs: Value) -> Value {
    json!({
        "metadata": {"name": name, "uid": uid},
        "status": {
            "phase": phase,
            "nodes": {name: {"id": name, "outputs": outputs}}
        }
    })
}

/// Newline-delimited watch body with one `MODIFIED` frame per object
pub fn watch_body(objects: &[Value]) -> String {
    objects
        .iter()
        .map(|object| format!("{}\n", json!({"type": "MODIFIED", "object": object})))
        .collect()
}
