use crate::application_port::*;
use crate::domain_model::*;

/// Every lookup is scoped by owner. A task owned by someone else is
/// indistinguishable from one that does not exist.
#[async_trait::async_trait]
pub trait TaskRepo: Send + Sync {
    async fn insert(&self, task: &Task) -> Result<(), TaskError>;

    async fn find_owned(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, TaskError>;

    async fn update(&self, task: &Task) -> Result<(), TaskError>;

    /// Returns false when nothing owned by `owner` matched.
    async fn delete_owned(&self, owner: UserId, id: TaskId) -> Result<bool, TaskError>;

    /// Newest first. Returns the requested page and the total match count.
    async fn list(
        &self,
        owner: UserId,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), TaskError>;
}
