//! Task views and the counts shown next to them.
//!
//! Inbox holds every open task. Today and Upcoming are date-based lenses over
//! the same open set, so a task due today is listed in both Inbox and Today.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Inbox,
    Today,
    Upcoming,
    Completed,
}

impl View {
    /// Navigation order.
    pub const ALL: [View; 4] = [View::Inbox, View::Today, View::Upcoming, View::Completed];

    pub fn name(self) -> &'static str {
        match self {
            View::Inbox => "inbox",
            View::Today => "today",
            View::Upcoming => "upcoming",
            View::Completed => "completed",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Inbox => "Inbox",
            View::Today => "Today",
            View::Upcoming => "Upcoming",
            View::Completed => "Completed",
        }
    }

    pub fn empty_text(self) -> &'static str {
        match self {
            View::Inbox => "Your inbox is empty",
            View::Today => "No tasks for today",
            View::Upcoming => "No upcoming tasks",
            View::Completed => "No completed tasks yet",
        }
    }

    /// Whether the view offers the inline add-task form.
    pub fn accepts_new_tasks(self) -> bool {
        self != View::Completed
    }

    pub fn matches(self, task: &Task, ctx: &ViewContext) -> bool {
        match self {
            View::Inbox => !task.completed,
            View::Today => !task.completed && task.due_date == Some(ctx.today),
            View::Upcoming => {
                !task.completed
                    && task
                        .due_date
                        .is_some_and(|due| due.and_time(NaiveTime::MIN) > ctx.now)
            }
            View::Completed => task.completed,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view {0:?} (expected inbox, today, upcoming or completed)")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

/// The user's local "now", captured once per evaluation so every predicate
/// sees the same moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewContext {
    pub today: NaiveDate,
    pub now: NaiveDateTime,
}

impl ViewContext {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            today: now.date(),
            now,
        }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.now().naive_local())
    }
}

/// Tasks of `tasks` that belong in `view`, in their original order.
pub fn filter<'a>(tasks: &'a [Task], view: View, ctx: &ViewContext) -> Vec<&'a Task> {
    tasks.iter().filter(|t| view.matches(t, ctx)).collect()
}

/// An open task whose due date's local midnight has already passed.
///
/// A task due today counts as overdue for all of today except its first
/// instant, mirroring how Upcoming compares that same midnight against now.
pub fn is_overdue(task: &Task, ctx: &ViewContext) -> bool {
    !task.completed
        && task
            .due_date
            .is_some_and(|due| due.and_time(NaiveTime::MIN) < ctx.now)
}

/// "Today", "Tomorrow", or a short month-day label such as "Mar 4".
pub fn due_label(due: NaiveDate, ctx: &ViewContext) -> String {
    if due == ctx.today {
        "Today".to_string()
    } else if ctx.today.checked_add_days(Days::new(1)) == Some(due) {
        "Tomorrow".to_string()
    } else {
        format!("{} {}", due.format("%b"), due.day())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCounts {
    pub inbox: usize,
    pub today: usize,
    pub upcoming: usize,
    pub completed: usize,
}

impl ViewCounts {
    pub fn compute(tasks: &[Task], ctx: &ViewContext) -> Self {
        let count = |view: View| tasks.iter().filter(|t| view.matches(t, ctx)).count();
        Self {
            inbox: count(View::Inbox),
            today: count(View::Today),
            upcoming: count(View::Upcoming),
            completed: count(View::Completed),
        }
    }

    pub fn get(&self, view: View) -> usize {
        match view {
            View::Inbox => self.inbox,
            View::Today => self.today,
            View::Upcoming => self.upcoming,
            View::Completed => self.completed,
        }
    }
}

/// Observer-side cache of [`ViewCounts`].
///
/// Recomputes only when the snapshot version or the local date changes.
#[derive(Debug, Default)]
pub struct CountsMemo {
    key: Option<(u64, NaiveDate)>,
    counts: ViewCounts,
}

impl CountsMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, version: u64, tasks: &[Task], ctx: &ViewContext) -> ViewCounts {
        let key = (version, ctx.today);
        if self.key != Some(key) {
            self.counts = ViewCounts::compute(tasks, ctx);
            self.key = Some(key);
        }
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx() -> ViewContext {
        ViewContext::new(date(2026, 3, 4).and_hms_opt(15, 30, 0).unwrap())
    }

    fn task(id: &str, due: Option<NaiveDate>, completed: bool) -> Task {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            due_date: due,
            completed,
            completed_at: completed.then_some(created),
            created_at: created,
            updated_at: created,
        }
    }

    fn ids(tasks: Vec<&Task>) -> Vec<&str> {
        tasks.into_iter().map(|t| t.id.as_str()).collect()
    }

    fn sample() -> Vec<Task> {
        vec![
            task("no-date", None, false),
            task("yesterday", Some(date(2026, 3, 3)), false),
            task("today", Some(date(2026, 3, 4)), false),
            task("tomorrow", Some(date(2026, 3, 5)), false),
            task("later", Some(date(2026, 4, 20)), false),
            task("done-today", Some(date(2026, 3, 4)), true),
            task("done", None, true),
        ]
    }

    #[test]
    fn test_inbox_is_every_open_task() {
        let tasks = sample();
        assert_eq!(
            ids(filter(&tasks, View::Inbox, &ctx())),
            ["no-date", "yesterday", "today", "tomorrow", "later"]
        );
    }

    #[test]
    fn test_today_and_upcoming() {
        let tasks = sample();
        assert_eq!(ids(filter(&tasks, View::Today, &ctx())), ["today"]);
        assert_eq!(
            ids(filter(&tasks, View::Upcoming, &ctx())),
            ["tomorrow", "later"]
        );
    }

    #[test]
    fn test_completed_is_disjoint_from_inbox() {
        let tasks = sample();
        let completed = ids(filter(&tasks, View::Completed, &ctx()));
        let inbox = ids(filter(&tasks, View::Inbox, &ctx()));
        assert_eq!(completed, ["done-today", "done"]);
        assert!(completed.iter().all(|id| !inbox.contains(id)));
        assert_eq!(completed.len() + inbox.len(), tasks.len());
    }

    #[test]
    fn test_task_due_today_is_in_inbox_and_today_never_upcoming() {
        let tasks = vec![task("t", Some(date(2026, 3, 4)), false)];
        let c = ctx();
        assert!(View::Inbox.matches(&tasks[0], &c));
        assert!(View::Today.matches(&tasks[0], &c));
        assert!(!View::Upcoming.matches(&tasks[0], &c));

        // Even at the very first instant of the day.
        let midnight = ViewContext::new(date(2026, 3, 4).and_time(NaiveTime::MIN));
        assert!(!View::Upcoming.matches(&tasks[0], &midnight));
    }

    #[test]
    fn test_overdue() {
        let c = ctx();
        assert!(is_overdue(&task("a", Some(date(2026, 3, 3)), false), &c));
        assert!(!is_overdue(&task("b", Some(date(2026, 3, 3)), true), &c));
        assert!(!is_overdue(&task("d", None, false), &c));
        assert!(!is_overdue(&task("e", Some(date(2026, 3, 5)), false), &c));
    }

    #[test]
    fn test_task_due_today_is_overdue_once_the_day_started() {
        let due_today = task("c", Some(date(2026, 3, 4)), false);
        assert!(is_overdue(&due_today, &ctx()));

        let midnight = ViewContext::new(date(2026, 3, 4).and_time(NaiveTime::MIN));
        assert!(!is_overdue(&due_today, &midnight));

        let just_after = ViewContext::new(date(2026, 3, 4).and_hms_opt(0, 0, 1).unwrap());
        assert!(is_overdue(&due_today, &just_after));
    }

    #[test]
    fn test_counts_match_filters() {
        let tasks = sample();
        let c = ctx();
        let counts = ViewCounts::compute(&tasks, &c);
        assert_eq!(
            counts,
            ViewCounts {
                inbox: 5,
                today: 1,
                upcoming: 2,
                completed: 2
            }
        );
        for view in View::ALL {
            assert_eq!(counts.get(view), filter(&tasks, view, &c).len());
        }
    }

    #[test]
    fn test_counts_memo_recomputes_on_version_or_day_change() {
        let mut memo = CountsMemo::new();
        let mut tasks = sample();
        let c = ctx();
        assert_eq!(memo.get(1, &tasks, &c).inbox, 5);

        // Same version: the cached value is returned even if the slice differs.
        tasks.push(task("new", None, false));
        assert_eq!(memo.get(1, &tasks, &c).inbox, 5);
        assert_eq!(memo.get(2, &tasks, &c).inbox, 6);

        // Next day: yesterday's "tomorrow" task moves into Today.
        let next_day = ViewContext::new(date(2026, 3, 5).and_hms_opt(8, 0, 0).unwrap());
        let counts = memo.get(2, &tasks, &next_day);
        assert_eq!(counts.today, 1);
        assert_eq!(counts.upcoming, 1);
    }

    #[test]
    fn test_due_label() {
        let c = ctx();
        assert_eq!(due_label(date(2026, 3, 4), &c), "Today");
        assert_eq!(due_label(date(2026, 3, 5), &c), "Tomorrow");
        assert_eq!(due_label(date(2026, 3, 9), &c), "Mar 9");
        assert_eq!(due_label(date(2026, 12, 25), &c), "Dec 25");
    }

    #[test]
    fn test_view_parsing_and_metadata() {
        assert_eq!("Today".parse::<View>().unwrap(), View::Today);
        assert_eq!(" upcoming ".parse::<View>().unwrap(), View::Upcoming);
        assert!("archive".parse::<View>().is_err());
        assert_eq!(View::default(), View::Inbox);
        assert!(!View::Completed.accepts_new_tasks());
        assert!(View::ALL[..3].iter().all(|v| v.accepts_new_tasks()));
        assert_eq!(View::Inbox.empty_text(), "Your inbox is empty");
        assert_eq!(View::Completed.to_string(), "completed");
    }
}
