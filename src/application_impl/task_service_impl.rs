use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

pub struct RealTaskService {
    task_repo: Arc<dyn TaskRepo>,
    clock: Arc<dyn Clock>,
}

impl RealTaskService {
    pub fn new(task_repo: Arc<dyn TaskRepo>, clock: Arc<dyn Clock>) -> Self {
        Self { task_repo, clock }
    }

    fn validate_title(title: &str) -> Result<(), TaskError> {
        if title.trim().is_empty() {
            return Err(TaskError::Validation("title must not be empty".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskService for RealTaskService {
    async fn list(
        &self,
        owner: UserId,
        filter: TaskFilter,
        page: PageRequest,
    ) -> Result<TaskPage, TaskError> {
        let (tasks, total) = self.task_repo.list(owner, &filter, page).await?;
        Ok(TaskPage {
            tasks,
            pagination: Pagination::new(page, total),
        })
    }

    async fn create(&self, owner: UserId, input: NewTask) -> Result<Task, TaskError> {
        Self::validate_title(&input.title)?;

        let now = self.clock.now();
        let task = Task {
            id: TaskId::new(),
            user_id: owner,
            title: input.title,
            description: input.description,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.task_repo.insert(&task).await?;
        debug!(task_id = %task.id, user_id = %owner, "task created");
        Ok(task)
    }

    async fn update(&self, owner: UserId, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        if let Some(title) = &patch.title {
            Self::validate_title(title)?;
        }

        let mut task = self
            .task_repo
            .find_owned(owner, id)
            .await?
            .ok_or(TaskError::NotFound)?;
        patch.apply(&mut task, self.clock.now());
        self.task_repo.update(&task).await?;
        Ok(task)
    }

    async fn delete(&self, owner: UserId, id: TaskId) -> Result<(), TaskError> {
        if !self.task_repo.delete_owned(owner, id).await? {
            return Err(TaskError::NotFound);
        }
        debug!(task_id = %id, user_id = %owner, "task deleted");
        Ok(())
    }
}
