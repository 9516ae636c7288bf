//! Transient user notifications published by the state holder.

use serde::{Deserialize, Serialize};

use crate::error::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn task_added() -> Self {
        Self::success("Task added", "Your task has been created")
    }

    pub fn task_deleted() -> Self {
        Self::success("Task deleted", "Your task has been removed")
    }

    pub fn failed(op: Operation) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Error".to_string(),
            description: op.failure_message().to_string(),
        }
    }

    fn success(title: &str, description: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}
