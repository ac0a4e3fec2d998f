use inkwell_common::task::{Task, TaskRequest};
use serde_json::json;

#[test]
fn isolated_worker_request_contract_is_stable() {
    let raw = json!({
        "id": "7b0b4a1e-1c55-4e7a-9d6c-2f1b0f6b9a10",
        "task": { "kind": "notify", "message": "doc 42 edited" }
    });

    let request: TaskRequest =
        serde_json::from_value(raw.clone()).expect("contract payload should decode");
    assert_eq!(request.task, Task::notify("doc 42 edited"));
    assert_eq!(serde_json::to_value(&request).expect("request should encode"), raw);
}

#[test]
fn unknown_task_kind_is_rejected() {
    let raw = json!({
        "id": "7b0b4a1e-1c55-4e7a-9d6c-2f1b0f6b9a10",
        "task": { "kind": "shutdown" }
    });

    assert!(serde_json::from_value::<TaskRequest>(raw).is_err());
}
