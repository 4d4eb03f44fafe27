#![no_main]

use libfuzzer_sys::fuzz_target;
use warden_events::{evaluate_trigger, ExecutionContext, RunnerIdentity, UserInputs};

const EVENT_NAMES: [&str; 6] = [
    "issues",
    "issue_comment",
    "pull_request",
    "pull_request_review",
    "pull_request_review_comment",
    "workflow_dispatch",
];

fuzz_target!(|data: &[u8]| {
    let Some((selector, body)) = data.split_first() else {
        return;
    };
    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(body) else {
        return;
    };
    let event_name = EVENT_NAMES[usize::from(*selector) % EVENT_NAMES.len()];
    if let Ok(context) = ExecutionContext::resolve(
        event_name,
        &payload,
        RunnerIdentity {
            actor: "fuzzer".to_string(),
            token_login: Some("warden-bot".to_string()),
            repository_slug: Some("acme/widgets".to_string()),
        },
        UserInputs::default(),
    ) {
        assert_eq!(context.kind().as_str(), event_name);
        let _ = evaluate_trigger(&context);
    }
});
