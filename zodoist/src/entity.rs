//! The `tasks` table.
//!
//! [`Model`] (re-exported as [`Task`]) is both the sea-orm entity backing
//! [`TaskDb`](crate::TaskDb) and the record the state holder keeps in memory.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Date>,
    pub completed: bool,
    /// Set iff `completed` is true.
    pub completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A validated insert payload.
///
/// Built by [`TaskDraft::validate`](crate::form::TaskDraft::validate): the
/// title is trimmed and non-empty, an empty description is `None` and the due
/// date carries no time of day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Date>,
}

/// The only mutation a task accepts after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    pub completed: bool,
    pub completed_at: Option<DateTimeUtc>,
}

impl Completion {
    /// Derive `completed_at` from the target state.
    pub fn at(completed: bool, now: DateTimeUtc) -> Self {
        Self {
            completed,
            completed_at: completed.then_some(now),
        }
    }
}
