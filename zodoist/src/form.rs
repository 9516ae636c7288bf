//! Task-creation input: normalization, validation and form state.
//!
//! The modal and the inline form share the same rules, so both are driven by
//! [`Composer`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

use crate::entity::NewTask;
use crate::error::TaskError;

/// Something that can be reduced to a calendar date.
///
/// Zoned values use their own offset: 2026-03-04T23:30-05:00 is March 4.
pub trait IntoDueDate {
    fn into_due_date(self) -> NaiveDate;
}

impl IntoDueDate for NaiveDate {
    fn into_due_date(self) -> NaiveDate {
        self
    }
}

impl IntoDueDate for NaiveDateTime {
    fn into_due_date(self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> IntoDueDate for DateTime<Tz> {
    fn into_due_date(self) -> NaiveDate {
        self.date_naive()
    }
}

/// Raw user input for a new task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn due(mut self, due: impl IntoDueDate) -> Self {
        self.due_date = Some(due.into_due_date());
        self
    }

    pub fn is_submittable(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Trim the fields and turn them into an insert payload.
    pub fn validate(&self) -> Result<NewTask, TaskError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        let description = self.description.trim();
        Ok(NewTask {
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            due_date: self.due_date,
        })
    }
}

/// Form state for one task-creation entry point.
///
/// A submission is single-flight: while one is outstanding,
/// [`begin_submit`](Composer::begin_submit) returns `None`.
#[derive(Debug, Clone)]
pub struct Composer {
    draft: TaskDraft,
    default_due: Option<NaiveDate>,
    submitting: bool,
}

impl Composer {
    /// A fresh form whose due date defaults to `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self::with_default_due(Some(today))
    }

    pub fn with_default_due(default_due: Option<NaiveDate>) -> Self {
        Self {
            draft: TaskDraft {
                due_date: default_due,
                ..Default::default()
            },
            default_due,
            submitting: false,
        }
    }

    pub fn draft(&self) -> &TaskDraft {
        &self.draft
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn set_due(&mut self, due: Option<impl IntoDueDate>) {
        self.draft.due_date = due.map(IntoDueDate::into_due_date);
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.draft.is_submittable()
    }

    /// Mark a submission in flight and hand out the normalized payload.
    ///
    /// Returns `None` (and changes nothing) when the title is blank or another
    /// submission has not finished yet.
    pub fn begin_submit(&mut self) -> Option<NewTask> {
        if self.submitting {
            return None;
        }
        let task = self.draft.validate().ok()?;
        self.submitting = true;
        Some(task)
    }

    /// End the in-flight submission and reset the fields.
    pub fn finish_submit(&mut self) {
        self.submitting = false;
        self.reset();
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.draft = TaskDraft {
            due_date: self.default_due,
            ..Default::default()
        };
    }
}
