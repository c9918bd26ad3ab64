use crate::domain_model::{NewTask, PageRequest, Task, TaskFilter, TaskId, TaskPage, TaskPatch, UserId};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Also returned when the task exists but belongs to someone else.
    #[error("task not found")]
    NotFound,
    #[error("invalid task: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait TaskService: Send + Sync {
    async fn list(
        &self,
        owner: UserId,
        filter: TaskFilter,
        page: PageRequest,
    ) -> Result<TaskPage, TaskError>;
    async fn create(&self, owner: UserId, input: NewTask) -> Result<Task, TaskError>;
    async fn update(&self, owner: UserId, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError>;
    async fn delete(&self, owner: UserId, id: TaskId) -> Result<(), TaskError>;
}
