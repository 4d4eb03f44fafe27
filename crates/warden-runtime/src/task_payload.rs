//! The object handed to the external agent invoker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeTask {
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Serializes as `{"task": "..."}` or `{"mergeTask": {"branch": "..."}}`.
pub enum TaskPayload {
    Task(String),
    MergeTask(MergeTask),
}

impl TaskPayload {
    pub fn merge(branch: impl Into<String>) -> Self {
        Self::MergeTask(MergeTask {
            branch: branch.into(),
        })
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::TaskPayload;

    #[test]
    fn unit_task_payload_wire_shapes() {
        assert_eq!(
            serde_json::to_value(TaskPayload::Task("fix it".to_string())).expect("json"),
            json!({ "task": "fix it" })
        );
        assert_eq!(
            serde_json::to_value(TaskPayload::merge("feature/x")).expect("json"),
            json!({ "mergeTask": { "branch": "feature/x" } })
        );
    }

    #[test]
    fn regression_merge_task_parses_back_from_invoker_string() {
        let parsed: TaskPayload =
            serde_json::from_str(r#"{"mergeTask":{"branch":"main"}}"#).expect("payload");
        assert_eq!(parsed, TaskPayload::merge("main"));
    }
}
