use proptest::prelude::*;
use sdk::errors::{BridgeErrorExt, EngineError};
use sdk::ipc::{generate_request_id, is_valid_request_id, TaskEntry};
use std::collections::HashSet;

// Hints are static strings and must never echo the error detail, which may
// carry a token or host path.
proptest! {
    #[test]
    fn test_error_user_hint_never_echoes_detail(detail in "[a-zA-Z0-9:/_]{12,40}") {
        let errs = vec![
            EngineError::Config(detail.clone()),
            EngineError::MissingCredential(detail.clone()),
            EngineError::Ipc(detail.clone()),
            EngineError::Unauthorized(detail.clone()),
            EngineError::Network(detail.clone()),
            EngineError::TelegramApi(detail.clone()),
            EngineError::ToolError(detail.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&detail));
        }
    }
}

// Task entries carry arbitrary payload keys at the top level without
// clobbering the envelope fields.
proptest! {
    #[test]
    fn test_task_payload_survives_wire_format(
        key in "[a-z]{1,8}_[a-z]{1,8}",
        value in "\\PC{0,40}",
    ) {
        let mut payload = serde_json::Map::new();
        payload.insert(key.clone(), serde_json::Value::String(value.clone()));
        let task = TaskEntry::new("telegram_add_command", payload);

        let json = serde_json::to_string(&task).unwrap();
        let parsed: TaskEntry = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(&parsed.kind, "telegram_add_command");
        prop_assert_eq!(&parsed.request_id, &task.request_id);
        prop_assert_eq!(parsed.payload_str(&key), Some(value.as_str()));
    }
}

#[test]
fn test_request_ids_do_not_collide() {
    let ids: HashSet<String> = (0..5_000).map(|_| generate_request_id()).collect();
    assert_eq!(ids.len(), 5_000);
    assert!(ids.iter().all(|id| is_valid_request_id(id)));
}
