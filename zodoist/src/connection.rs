use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    EntityName, ExecResult, QueryResult, Schema, Statement,
};
use tokio::sync::broadcast;

use crate::config::{Config, DEFAULT_CHANNEL_CAPACITY};
use crate::entity;
use crate::messages::{ChangeNotification, WriteKind};

/// A SeaORM connection wrapper that owns the `tasks` table and broadcasts a
/// [`ChangeNotification`] after every successful write to it.
///
/// Writes are detected at the statement level, so any code that executes
/// statements through this connection (the [`RemoteStore`](crate::RemoteStore)
/// impl, plain SeaORM calls, raw SQL) produces notifications.
pub struct TaskDb {
    inner: DatabaseConnection,
    change_tx: broadcast::Sender<ChangeNotification>,
    table: String,
}

impl TaskDb {
    /// Get a reference to the underlying SeaORM connection.
    /// Statements executed on it bypass change notification.
    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }

    /// Name of the watched table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get a handle to the change notification broadcast channel.
    pub fn change_rx(&self) -> broadcast::Receiver<ChangeNotification> {
        self.change_tx.subscribe()
    }

    /// Broadcast a change notification on behalf of a writer that bypassed
    /// this connection.
    pub fn notify_change(&self, notification: ChangeNotification) {
        let _ = self.change_tx.send(notification);
    }

    /// After a successful statement, notify subscribers if it wrote to the
    /// watched table.
    fn dispatch_change(&self, sql: &str) {
        let Some((kind, table)) = WriteKind::classify(sql) else {
            return;
        };
        if table != self.table {
            return;
        }
        log::debug!(
            "{kind:?} on {table}, notifying {} subscriber(s)",
            self.change_tx.receiver_count()
        );
        // No receivers is not an error: nobody is mounted yet.
        let _ = self.change_tx.send(ChangeNotification { table, kind });
    }
}

impl ConnectionTrait for TaskDb {
    fn get_database_backend(&self) -> DatabaseBackend {
        self.inner.get_database_backend()
    }

    fn execute_raw<'life0, 'async_trait>(
        &'life0 self,
        stmt: Statement,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ExecResult, DbErr>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let sql = stmt.to_string();
        Box::pin(async move {
            let result = self.inner.execute_raw(stmt).await?;
            self.dispatch_change(&sql);
            Ok(result)
        })
    }

    fn execute_unprepared<'life0, 'life1, 'async_trait>(
        &'life0 self,
        sql: &'life1 str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ExecResult, DbErr>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let result = self.inner.execute_unprepared(sql).await?;
            self.dispatch_change(sql);
            Ok(result)
        })
    }

    fn query_one_raw<'life0, 'async_trait>(
        &'life0 self,
        stmt: Statement,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<QueryResult>, DbErr>>
                + Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        // INSERT/UPDATE ... RETURNING go through the query paths.
        let sql = stmt.to_string();
        Box::pin(async move {
            let result = self.inner.query_one_raw(stmt).await?;
            self.dispatch_change(&sql);
            Ok(result)
        })
    }

    fn query_all_raw<'life0, 'async_trait>(
        &'life0 self,
        stmt: Statement,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Vec<QueryResult>, DbErr>>
                + Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let sql = stmt.to_string();
        Box::pin(async move {
            let result = self.inner.query_all_raw(stmt).await?;
            self.dispatch_change(&sql);
            Ok(result)
        })
    }
}

/// Builder for [`TaskDb`].
pub struct TaskDbBuilder {
    database_url: String,
    channel_capacity: usize,
}

impl TaskDbBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            database_url: url.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.database_url).with_channel_capacity(config.channel_capacity)
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Connect and create the `tasks` table if it does not exist yet.
    pub async fn build(self) -> Result<TaskDb, DbErr> {
        let opts = ConnectOptions::new(&self.database_url);
        let inner = Database::connect(opts).await?;

        let backend = inner.get_database_backend();
        let create_stmt = Schema::new(backend)
            .create_table_from_entity(entity::Entity)
            .if_not_exists()
            .to_owned();
        inner.execute_raw(backend.build(&create_stmt)).await?;

        let (change_tx, _) = broadcast::channel::<ChangeNotification>(self.channel_capacity);
        let table = entity::Entity.table_name().to_string();
        log::info!("Task store ready (table {table}, backend {backend:?})");

        Ok(TaskDb {
            inner,
            change_tx,
            table,
        })
    }
}
