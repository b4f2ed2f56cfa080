//! Task models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorResponse;

/// Kind of long-running operation backing a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Clone,
    Fetch,
    Push,
}

/// Task lifecycle; terminal arms carry their own payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TaskState {
    Waiting,
    Running,
    Succeeded {
        #[serde(rename = "result")]
        result_location: String,
    },
    Failed {
        error: ErrorResponse,
    },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded { .. } | TaskState::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub location: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: TaskState,
}

/// Body of a cancel response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(state: TaskState) -> Task {
        Task {
            id: "abc".to_string(),
            kind: TaskKind::Clone,
            location: "/task/abc".to_string(),
            created_at: Utc::now(),
            state,
        }
    }

    #[test]
    fn test_running_task_has_no_result_or_error() {
        let json = serde_json::to_value(task(TaskState::Running)).unwrap();
        assert_eq!(json["state"], "running");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_succeeded_task_carries_result_location() {
        let json = serde_json::to_value(task(TaskState::Succeeded {
            result_location: "/clone/demo".to_string(),
        }))
        .unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["result"], "/clone/demo");
        assert_eq!(json["kind"], "clone");
    }

    #[test]
    fn test_failed_task_carries_error() {
        let json = serde_json::to_value(task(TaskState::Failed {
            error: ErrorResponse {
                code: "NETWORK_ERROR".to_string(),
                message: "Network failure: down".to_string(),
                details: None,
            },
        }))
        .unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error"]["code"], "NETWORK_ERROR");
        assert!(json.get("result").is_none());
    }
}
