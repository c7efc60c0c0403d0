use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::mirror::{PendingKind, PendingLedger, PendingOperation};
use crate::models::{NewTaskRequest, TaskDocument, TaskStatus};
use crate::remote::RemoteStore;

/// Per-user task board over the remote task collection, with the same
/// optimistic-write-and-rollback behaviour as the course mirror.
pub struct TaskBoard {
    remote: Arc<dyn RemoteStore>,
    tasks: RwLock<HashMap<String, Vec<TaskDocument>>>,
    pending: Mutex<PendingLedger>,
}

impl TaskBoard {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            tasks: RwLock::new(HashMap::new()),
            pending: Mutex::new(PendingLedger::default()),
        }
    }

    /// Refreshes from the remote store; falls back to the cached board when
    /// the remote is unreachable.
    pub async fn list(&self, owner_id: &str) -> Vec<TaskDocument> {
        match self.remote.fetch_tasks(owner_id).await {
            Ok(mut fetched) => {
                fetched.retain(|t| t.owner_id == owner_id);
                fetched.sort_by_key(|t| t.created_at);
                self.tasks
                    .write()
                    .await
                    .insert(owner_id.to_string(), fetched.clone());
                fetched
            }
            Err(e) => {
                warn!("failed to fetch tasks for {}: {}", owner_id, e);
                self.cached(owner_id).await
            }
        }
    }

    pub async fn cached(&self, owner_id: &str) -> Vec<TaskDocument> {
        self.tasks
            .read()
            .await
            .get(owner_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn pending(&self) -> Vec<PendingOperation> {
        self.pending.lock().await.list()
    }

    /// Loads the owner's board from the remote store when `id` is not cached,
    /// e.g. after a restart.
    async fn ensure_cached(&self, owner_id: &str, id: &str) {
        let cached = self
            .tasks
            .read()
            .await
            .get(owner_id)
            .is_some_and(|board| board.iter().any(|t| t.id == id));
        if !cached {
            debug!("task {} not cached, loading board for {}", id, owner_id);
            self.list(owner_id).await;
        }
    }

    pub async fn create(&self, req: NewTaskRequest) -> Result<TaskDocument, AppError> {
        let text = req.text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::BadRequest("task text is required".to_string()));
        }

        let now = Utc::now();
        let task = TaskDocument {
            id: Uuid::new_v4().to_string(),
            owner_id: req.owner_id,
            text,
            status: TaskStatus::Todo,
            created_at: now,
            updated_at: now,
        };

        self.tasks
            .write()
            .await
            .entry(task.owner_id.clone())
            .or_default()
            .push(task.clone());
        let op = self.pending.lock().await.begin(&task.id, PendingKind::CreateTask);

        let result = self.remote.insert_task(&task).await;
        self.pending.lock().await.settle(op);

        if let Err(e) = result {
            if let Some(board) = self.tasks.write().await.get_mut(&task.owner_id) {
                board.retain(|t| t.id != task.id);
            }
            warn!("create task {} rejected, rolled back: {}", task.id, e);
            return Err(e);
        }

        info!("created task {} for {}", task.id, task.owner_id);
        Ok(task)
    }

    pub async fn move_to(
        &self,
        owner_id: &str,
        id: &str,
        status: TaskStatus,
    ) -> Result<TaskDocument, AppError> {
        self.ensure_cached(owner_id, id).await;
        let (updated, previous) = {
            let mut tasks = self.tasks.write().await;
            let task = tasks
                .get_mut(owner_id)
                .and_then(|board| board.iter_mut().find(|t| t.id == id))
                .ok_or(AppError::NotFound)?;
            let previous = (task.status, task.updated_at);
            task.status = status;
            task.updated_at = Utc::now();
            (task.clone(), previous)
        };
        let op = self.pending.lock().await.begin(id, PendingKind::MoveTask);

        let result = self.remote.update_task_status(&updated).await;
        self.pending.lock().await.settle(op);

        if let Err(e) = result {
            let mut tasks = self.tasks.write().await;
            if let Some(task) = tasks
                .get_mut(owner_id)
                .and_then(|board| board.iter_mut().find(|t| t.id == id))
            {
                task.status = previous.0;
                task.updated_at = previous.1;
            }
            warn!("move task {} rejected, rolled back: {}", id, e);
            return Err(e);
        }

        Ok(updated)
    }

    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<(), AppError> {
        self.ensure_cached(owner_id, id).await;
        let (index, removed) = {
            let mut tasks = self.tasks.write().await;
            let board = tasks.get_mut(owner_id).ok_or(AppError::NotFound)?;
            let index = board
                .iter()
                .position(|t| t.id == id)
                .ok_or(AppError::NotFound)?;
            (index, board.remove(index))
        };
        let op = self.pending.lock().await.begin(id, PendingKind::DeleteTask);

        let result = self.remote.delete_task(id).await;
        self.pending.lock().await.settle(op);

        if let Err(e) = result {
            let mut tasks = self.tasks.write().await;
            let board = tasks.entry(owner_id.to_string()).or_default();
            let index = index.min(board.len());
            board.insert(index, removed);
            warn!("delete task {} rejected, restored: {}", id, e);
            return Err(e);
        }

        Ok(())
    }
}
