//! The task state holder.
//!
//! [`TaskState`] is the single owner of the session's task list. It mediates
//! every read and write against a [`RemoteStore`], applies a change to the
//! local list only after the store confirmed it, and publishes:
//!
//! - [`Snapshot`]s through a `watch` channel ([`TaskState::subscribe`]), and
//! - [`Notice`]s through a `broadcast` channel ([`TaskState::notices`]).
//!
//! Failures never escape as anything but a logged error, an error notice and
//! an `Err` the caller is free to ignore.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_CHANNEL_CAPACITY;
use crate::entity::{Completion, NewTask};
use crate::error::{Operation, StoreError, TaskError};
use crate::form::TaskDraft;
use crate::notice::Notice;
use crate::store::RemoteStore;
use crate::view::{View, ViewContext, ViewCounts};
use crate::Task;

/// An immutable view of the task list at one version.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Newest-created first.
    pub tasks: Arc<Vec<Task>>,
    /// Bumped on every change to `tasks` or `loading`.
    pub version: u64,
    /// True until the first fetch finished, successfully or not.
    pub loading: bool,
    /// Ticket of the last fetch result or confirmed mutation applied.
    last_ticket: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tasks: Arc::new(Vec::new()),
            version: 0,
            loading: true,
            last_ticket: 0,
        }
    }
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filter(&self, view: View, ctx: &ViewContext) -> Vec<&Task> {
        crate::view::filter(&self.tasks, view, ctx)
    }

    pub fn counts(&self, ctx: &ViewContext) -> ViewCounts {
        ViewCounts::compute(&self.tasks, ctx)
    }
}

pub struct TaskState<S> {
    store: S,
    clock: Arc<dyn Clock>,
    snapshot: watch::Sender<Snapshot>,
    notices: broadcast::Sender<Notice>,
    // Fetches draw a ticket when they start, mutations when they are
    // confirmed. A fetch result older than the last applied ticket is stale.
    tickets: AtomicU64,
}

impl<S: RemoteStore> TaskState<S> {
    pub fn new(store: S) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        let (notices, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            store,
            clock: Arc::new(SystemClock),
            snapshot,
            notices,
            tickets: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_notice_capacity(mut self, capacity: usize) -> Self {
        self.notices = broadcast::channel(capacity.max(1)).0;
        self
    }

    /// Initial load plus resynchronization on every change notification.
    ///
    /// The store subscription is taken before the first fetch so that no
    /// change between the two is missed. The returned [`Mounted`] stops the
    /// listener when dropped.
    pub async fn mount(self) -> Mounted<S> {
        let state = Arc::new(self);
        let listener = state.spawn_resync();
        // Failure is already reported through the notice channel.
        let _ = state.fetch_all().await;
        Mounted { state, listener }
    }

    /// Spawn the listener that answers each change notification with a full
    /// [`fetch_all`](Self::fetch_all).
    ///
    /// Notifications that pile up while a fetch is running are coalesced into
    /// the next fetch.
    pub fn spawn_resync(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.store.subscribe();
        let state = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => {
                        log::debug!(
                            "{:?} on {}, resynchronizing",
                            notification.kind,
                            notification.table
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Missed {skipped} change notifications, resynchronizing");
                    }
                    Err(RecvError::Closed) => break,
                }

                let mut closed = false;
                loop {
                    match rx.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Closed) => {
                            closed = true;
                            break;
                        }
                    }
                }

                let _ = state.fetch_all().await;
                if closed {
                    break;
                }
            }
            log::debug!("Change notification channel closed, resync listener stopped");
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The current moment as seen by view predicates.
    pub fn context(&self) -> ViewContext {
        ViewContext::from_clock(self.clock.as_ref())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Observe snapshots. The receiver sees every version change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Tasks in `view` right now, newest first.
    pub fn view(&self, view: View) -> Vec<Task> {
        let ctx = self.context();
        self.snapshot
            .borrow()
            .filter(view, &ctx)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> ViewCounts {
        let ctx = self.context();
        self.snapshot.borrow().counts(&ctx)
    }

    /// Replace the local list with the store's, newest first.
    ///
    /// The result is dropped if a newer fetch or a confirmed mutation has been
    /// applied since this fetch started.
    pub async fn fetch_all(&self) -> Result<(), TaskError> {
        let ticket = self.next_ticket();
        match self.store.select_all().await {
            Ok(tasks) => {
                let count = tasks.len();
                let mut applied = false;
                self.snapshot.send_if_modified(|snap| {
                    let was_loading = std::mem::replace(&mut snap.loading, false);
                    if ticket < snap.last_ticket {
                        if was_loading {
                            snap.version += 1;
                        }
                        return was_loading;
                    }
                    snap.tasks = Arc::new(tasks);
                    snap.last_ticket = ticket;
                    snap.version += 1;
                    applied = true;
                    true
                });
                if applied {
                    log::debug!("Loaded {count} tasks");
                } else {
                    log::debug!("Discarded stale fetch result ({count} tasks)");
                }
                Ok(())
            }
            Err(e) => {
                self.snapshot.send_if_modified(|snap| {
                    let was_loading = std::mem::replace(&mut snap.loading, false);
                    if was_loading {
                        snap.version += 1;
                    }
                    was_loading
                });
                Err(self.report(Operation::Fetch, e))
            }
        }
    }

    /// Validate and insert a task, then put it at the top of the list.
    ///
    /// A blank title is rejected with [`TaskError::EmptyTitle`] without
    /// touching the store.
    pub async fn create(&self, draft: &TaskDraft) -> Result<Task, TaskError> {
        let new_task = match draft.validate() {
            Ok(task) => task,
            Err(e) => {
                log::debug!("Rejected task draft: {e}");
                return Err(e);
            }
        };
        self.create_task(new_task).await
    }

    /// Insert an already validated payload (see [`Composer::begin_submit`]).
    ///
    /// [`Composer::begin_submit`]: crate::form::Composer::begin_submit
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, TaskError> {
        let task = self
            .store
            .insert(new_task)
            .await
            .map_err(|e| self.report(Operation::Create, e))?;

        let ticket = self.next_ticket();
        let inserted = task.clone();
        self.snapshot.send_modify(|snap| {
            let tasks = Arc::make_mut(&mut snap.tasks);
            // A resync may already have picked the new row up.
            tasks.retain(|t| t.id != inserted.id);
            tasks.insert(0, inserted);
            snap.last_ticket = snap.last_ticket.max(ticket);
            snap.version += 1;
        });
        log::info!("Created task {}", task.id);
        let _ = self.notices.send(Notice::task_added());
        Ok(task)
    }

    /// Mark a task completed or open.
    ///
    /// `completed_at` is set to now when completing and cleared when
    /// reopening. Asking for the state the local record already has is a
    /// no-op.
    pub async fn toggle(&self, id: &str, completed: bool) -> Result<(), TaskError> {
        let unchanged = self
            .snapshot
            .borrow()
            .get(id)
            .is_some_and(|t| t.completed == completed);
        if unchanged {
            log::debug!("Task {id} already has completed={completed}");
            return Ok(());
        }

        let completion = Completion::at(completed, self.clock.now_utc());
        let task = self
            .store
            .update_completion(id, completion)
            .await
            .map_err(|e| self.report(Operation::Toggle, e))?;

        let ticket = self.next_ticket();
        self.snapshot.send_if_modified(|snap| {
            snap.last_ticket = snap.last_ticket.max(ticket);
            let Some(pos) = snap.tasks.iter().position(|t| t.id == task.id) else {
                return false;
            };
            Arc::make_mut(&mut snap.tasks)[pos] = task;
            snap.version += 1;
            true
        });
        log::info!("Set task {id} completed={completed}");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), TaskError> {
        self.store
            .delete(id)
            .await
            .map_err(|e| self.report(Operation::Delete, e))?;

        let ticket = self.next_ticket();
        self.snapshot.send_if_modified(|snap| {
            snap.last_ticket = snap.last_ticket.max(ticket);
            let Some(pos) = snap.tasks.iter().position(|t| t.id == id) else {
                return false;
            };
            Arc::make_mut(&mut snap.tasks).remove(pos);
            snap.version += 1;
            true
        });
        log::info!("Deleted task {id}");
        let _ = self.notices.send(Notice::task_deleted());
        Ok(())
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn report(&self, op: Operation, source: StoreError) -> TaskError {
        log::error!("Error trying to {op}: {source}");
        let _ = self.notices.send(Notice::failed(op));
        TaskError::remote(op, source)
    }
}

/// A [`TaskState`] with its resynchronization listener running.
pub struct Mounted<S> {
    state: Arc<TaskState<S>>,
    listener: JoinHandle<()>,
}

impl<S> Mounted<S> {
    pub fn state(&self) -> &Arc<TaskState<S>> {
        &self.state
    }

    /// Stop listening for change notifications and hand the state back.
    pub fn unmount(self) -> Arc<TaskState<S>> {
        self.listener.abort();
        Arc::clone(&self.state)
    }
}

impl<S> Deref for Mounted<S> {
    type Target = TaskState<S>;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl<S> Drop for Mounted<S> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
