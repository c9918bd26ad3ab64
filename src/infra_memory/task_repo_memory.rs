use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryTaskRepo {
    tasks: DashMap<TaskId, Task>,
}

impl MemoryTaskRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TaskRepo for MemoryTaskRepo {
    async fn insert(&self, task: &Task) -> Result<(), TaskError> {
        self.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_owned(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, TaskError> {
        Ok(self
            .tasks
            .get(&id)
            .filter(|entry| entry.user_id == owner)
            .map(|entry| entry.value().clone()))
    }

    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        match self.tasks.get_mut(&task.id) {
            Some(mut entry) if entry.user_id == task.user_id => {
                *entry = task.clone();
                Ok(())
            }
            _ => Err(TaskError::NotFound),
        }
    }

    async fn delete_owned(&self, owner: UserId, id: TaskId) -> Result<bool, TaskError> {
        Ok(self
            .tasks
            .remove_if(&id, |_, task| task.user_id == owner)
            .is_some())
    }

    async fn list(
        &self,
        owner: UserId,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), TaskError> {
        let mut matching: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| entry.user_id == owner && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let tasks = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((tasks, total))
    }
}
