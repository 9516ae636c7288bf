//! The remote store contract and its SeaORM implementation.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, QueryOrder, Set};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::connection::TaskDb;
use crate::entity::{self, Completion, NewTask};
use crate::error::StoreError;
use crate::messages::ChangeNotification;
use crate::Task;

/// Everything the state holder needs from the backend.
///
/// The store owns identity and timestamps: `insert` assigns `id`,
/// `created_at` and `updated_at`, and `update_completion` refreshes
/// `updated_at`.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// All tasks, newest `created_at` first.
    async fn select_all(&self) -> Result<Vec<Task>, StoreError>;

    /// Insert one task and return the stored record.
    async fn insert(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Set `completed`/`completed_at` on one task and return the stored record.
    async fn update_completion(&self, id: &str, completion: Completion)
    -> Result<Task, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Subscribe to change notifications for the task table.
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification>;
}

#[async_trait::async_trait]
impl RemoteStore for TaskDb {
    async fn select_all(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = entity::Entity::find()
            .order_by_desc(entity::Column::CreatedAt)
            .all(self)
            .await?;
        Ok(tasks)
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let row = entity::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            title: Set(task.title),
            description: Set(task.description),
            due_date: Set(task.due_date),
            completed: Set(false),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(row.insert(self).await?)
    }

    async fn update_completion(
        &self,
        id: &str,
        completion: Completion,
    ) -> Result<Task, StoreError> {
        let row = entity::ActiveModel {
            id: Set(id.to_string()),
            completed: Set(completion.completed),
            completed_at: Set(completion.completed_at),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        match row.update(self).await {
            Ok(task) => Ok(task),
            Err(DbErr::RecordNotUpdated) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = entity::Entity::delete_by_id(id.to_string())
            .exec(self)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.change_rx()
    }
}

#[async_trait::async_trait]
impl<S: RemoteStore> RemoteStore for Arc<S> {
    async fn select_all(&self) -> Result<Vec<Task>, StoreError> {
        (**self).select_all().await
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        (**self).insert(task).await
    }

    async fn update_completion(
        &self,
        id: &str,
        completion: Completion,
    ) -> Result<Task, StoreError> {
        (**self).update_completion(id, completion).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete(id).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        (**self).subscribe()
    }
}
