//! Error types for the task store and the state holder.

use std::fmt;

use sea_orm::DbErr;
use thiserror::Error;

/// Failure reported by a [`RemoteStore`](crate::RemoteStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),

    #[error("task with id {0} not found")]
    NotFound(String),

    /// Any other backend failure (transport, injected test failures, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The four operations the state holder performs against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Create,
    Toggle,
    Delete,
}

impl Operation {
    /// Human-readable message shown to the user when the operation fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Fetch => "Failed to load tasks",
            Operation::Create => "Failed to add task",
            Operation::Toggle => "Failed to update task",
            Operation::Delete => "Failed to delete task",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Fetch => "fetch tasks",
            Operation::Create => "create task",
            Operation::Toggle => "toggle task",
            Operation::Delete => "delete task",
        })
    }
}

/// Outcome of a failed [`TaskState`](crate::TaskState) operation.
///
/// By the time a caller sees this the failure has already been logged and
/// published as a notice, and the local list is exactly as it was before the
/// call.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{op} failed: {source}")]
    RemoteOperationFailed {
        op: Operation,
        #[source]
        source: StoreError,
    },

    #[error("task title must not be empty")]
    EmptyTitle,
}

impl TaskError {
    pub fn remote(op: Operation, source: StoreError) -> Self {
        TaskError::RemoteOperationFailed { op, source }
    }
}

/// Invalid value in the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
