#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tokio::sync::{Notify, broadcast, watch};
use zodoist::{
    ChangeNotification, Completion, FixedClock, NewTask, Operation, RemoteStore, Snapshot,
    StoreError, Task, WriteKind,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2026-03-04 15:30, the "now" of every state test.
pub fn clock() -> FixedClock {
    FixedClock::at(date(2026, 3, 4).and_hms_opt(15, 30, 0).unwrap())
}

pub fn today() -> NaiveDate {
    date(2026, 3, 4)
}

/// In-memory [`RemoteStore`] with call counting, failure injection and a
/// gate for holding a fetch in flight.
pub struct ScriptedStore {
    rows: Mutex<Vec<Task>>,
    failing: Mutex<HashSet<Operation>>,
    selects: AtomicUsize,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    seq: AtomicUsize,
    change_tx: Mutex<Option<broadcast::Sender<ChangeNotification>>>,
    fetch_gate: Mutex<Option<Arc<Notify>>>,
    pub fetch_started: Notify,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        let (change_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            selects: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            seq: AtomicUsize::new(0),
            change_tx: Mutex::new(Some(change_tx)),
            fetch_gate: Mutex::new(None),
            fetch_started: Notify::new(),
        })
    }

    /// A store pre-populated with tasks, oldest first in `titles`.
    pub fn with_tasks(titles: &[(&str, Option<NaiveDate>)]) -> Arc<Self> {
        let store = Self::new();
        for (title, due) in titles {
            store.put(title, *due);
        }
        store
    }

    pub fn fail(&self, op: Operation) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn calls(&self, op: Operation) -> usize {
        match op {
            Operation::Fetch => self.selects.load(Ordering::SeqCst),
            Operation::Create => self.inserts.load(Ordering::SeqCst),
            Operation::Toggle => self.updates.load(Ordering::SeqCst),
            Operation::Delete => self.deletes.load(Ordering::SeqCst),
        }
    }

    pub fn rows(&self) -> Vec<Task> {
        self.rows.lock().unwrap().clone()
    }

    pub fn find(&self, id: &str) -> Option<Task> {
        self.rows.lock().unwrap().iter().find(|t| t.id == id).cloned()
    }

    /// Insert a row without counting it or notifying anyone.
    pub fn put(&self, title: &str, due: Option<NaiveDate>) -> Task {
        let task = self.make(NewTask {
            title: title.to_string(),
            description: None,
            due_date: due,
        });
        self.rows.lock().unwrap().insert(0, task.clone());
        task
    }

    /// A write by another session: insert a row and notify subscribers.
    pub fn external_insert(&self, title: &str) -> Task {
        let task = self.put(title, None);
        self.notify(WriteKind::Insert);
        task
    }

    pub fn notify(&self, kind: WriteKind) {
        if let Some(tx) = self.change_tx.lock().unwrap().as_ref() {
            let _ = tx.send(ChangeNotification {
                table: "tasks".to_string(),
                kind,
            });
        }
    }

    /// Drop the change sender, closing every subscriber's channel.
    pub fn close_changes(&self) {
        self.change_tx.lock().unwrap().take();
    }

    /// Make the next `select_all` read the rows, then wait for the returned
    /// gate before answering.
    pub fn hold_next_fetch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.fetch_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn check(&self, op: Operation) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Unavailable(format!("{op} is scripted to fail")));
        }
        Ok(())
    }

    fn make(&self, new: NewTask) -> Task {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) as i64;
        let created = base_time() + chrono::Duration::seconds(n);
        Task {
            id: format!("task-{n}"),
            title: new.title,
            description: new.description,
            due_date: new.due_date,
            completed: false,
            completed_at: None,
            created_at: created,
            updated_at: created,
        }
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

#[async_trait::async_trait]
impl RemoteStore for ScriptedStore {
    async fn select_all(&self) -> Result<Vec<Task>, StoreError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.check(Operation::Fetch)?;
        let rows = self.rows();
        let gate = self.fetch_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            self.fetch_started.notify_one();
            gate.notified().await;
        }
        Ok(rows)
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check(Operation::Create)?;
        let task = self.make(task);
        self.rows.lock().unwrap().insert(0, task.clone());
        self.notify(WriteKind::Insert);
        Ok(task)
    }

    async fn update_completion(
        &self,
        id: &str,
        completion: Completion,
    ) -> Result<Task, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check(Operation::Toggle)?;
        let updated = {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            row.completed = completion.completed;
            row.completed_at = completion.completed_at;
            row.updated_at = completion.completed_at.unwrap_or(row.updated_at);
            row.clone()
        };
        self.notify(WriteKind::Update);
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check(Operation::Delete)?;
        {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|t| t.id != id);
            if rows.len() == before {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        self.notify(WriteKind::Delete);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        match self.change_tx.lock().unwrap().as_ref() {
            Some(tx) => tx.subscribe(),
            // Already closed: hand out a receiver whose sender is gone.
            None => broadcast::channel(1).1,
        }
    }
}

/// Wait (up to a second) for a snapshot satisfying `pred`.
pub async fn wait_for<F>(rx: &mut watch::Receiver<Snapshot>, pred: F) -> Snapshot
where
    F: FnMut(&Snapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("state dropped")
        .clone()
}
