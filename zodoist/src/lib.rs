//! # Zodoist
//!
//! Core of a personal task manager. Tasks live in a table store reached
//! through [`RemoteStore`]; a session keeps its copy of the list in a
//! [`TaskState`], which only changes after the store confirmed a write and
//! resynchronizes from scratch whenever the store reports a change.
//!
//! ## Quick start
//!
//! ```ignore
//! use zodoist::{TaskDbBuilder, TaskDraft, TaskState, View};
//!
//! let db = TaskDbBuilder::new("sqlite::memory:").build().await?;
//! let tasks = TaskState::new(db).mount().await;
//!
//! tasks.create(&TaskDraft::new("Buy milk").due(chrono::Local::now())).await?;
//! let today = tasks.view(View::Today);
//! ```
//!
//! ## Key types
//!
//! - [`TaskDb`] — SeaORM connection wrapper that owns the `tasks` table and
//!   broadcasts a [`ChangeNotification`] after every write
//! - [`TaskState`] — observable state holder (fetch/create/toggle/delete)
//! - [`View`] / [`ViewCounts`] — Inbox, Today, Upcoming and Completed
//! - [`Composer`] — task-creation form state

pub mod clock;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod form;
pub mod messages;
pub mod notice;
pub mod state;
pub mod store;
pub mod view;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use connection::{TaskDb, TaskDbBuilder};
pub use entity::{Completion, Model as Task, NewTask};
pub use error::{ConfigError, Operation, StoreError, TaskError};
pub use form::{Composer, IntoDueDate, TaskDraft};
pub use messages::{ChangeNotification, WriteKind};
pub use notice::{Notice, NoticeLevel};
pub use state::{Mounted, Snapshot, TaskState};
pub use store::RemoteStore;
pub use view::{CountsMemo, View, ViewContext, ViewCounts, due_label, filter, is_overdue};

// Re-export sea-orm for callers that write to the task table directly.
pub use sea_orm;
