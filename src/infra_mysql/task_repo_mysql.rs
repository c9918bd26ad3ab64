use super::util::escape_like;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

pub struct MySqlTaskRepo {
    pool: MySqlPool,
}

impl MySqlTaskRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlTaskRepo { pool }
    }

    fn store_err(e: sqlx::Error) -> TaskError {
        TaskError::Store(e.to_string())
    }

    fn row_to_task(row: MySqlRow) -> Result<Task, TaskError> {
        let id: TaskId = row.try_get("task_id").map_err(Self::store_err)?;
        let user_id: UserId = row.try_get("user_id").map_err(Self::store_err)?;
        let title: String = row.try_get("title").map_err(Self::store_err)?;
        let description: Option<String> = row.try_get("description").map_err(Self::store_err)?;
        let status: String = row.try_get("status").map_err(Self::store_err)?;
        let status = status.parse::<TaskStatus>().map_err(TaskError::Store)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(Self::store_err)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(Self::store_err)?;

        Ok(Task {
            id,
            user_id,
            title,
            description,
            status,
            created_at,
            updated_at,
        })
    }

    fn push_where<'a>(qb: &mut QueryBuilder<'a, MySql>, owner: UserId, filter: &'a TaskFilter) {
        qb.push(" WHERE user_id = ").push_bind(owner);
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            qb.push(" AND title LIKE CONCAT('%', ")
                .push_bind(escape_like(search))
                .push(", '%')");
        }
    }
}

#[async_trait::async_trait]
impl TaskRepo for MySqlTaskRepo {
    async fn insert(&self, task: &Task) -> Result<(), TaskError> {
        sqlx::query(
            r#"
INSERT INTO task (task_id, user_id, title, description, status, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::store_err)?;

        Ok(())
    }

    async fn find_owned(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, TaskError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT task_id, user_id, title, description, status, created_at, updated_at
FROM task
WHERE task_id = ? AND user_id = ?
"#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::store_err)?;

        row_opt.map(Self::row_to_task).transpose()
    }

    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        let result = sqlx::query(
            r#"
UPDATE task
SET title = ?, description = ?, status = ?, updated_at = ?
WHERE task_id = ? AND user_id = ?
"#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.updated_at)
        .bind(task.id)
        .bind(task.user_id)
        .execute(&self.pool)
        .await
        .map_err(Self::store_err)?;

        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound);
        }
        Ok(())
    }

    async fn delete_owned(&self, owner: UserId, id: TaskId) -> Result<bool, TaskError> {
        let result = sqlx::query("DELETE FROM task WHERE task_id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(Self::store_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        owner: UserId,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), TaskError> {
        let mut count_qb: QueryBuilder<MySql> = QueryBuilder::new("SELECT COUNT(*) FROM task");
        Self::push_where(&mut count_qb, owner, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(Self::store_err)?;

        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
            "SELECT task_id, user_id, title, description, status, created_at, updated_at FROM task",
        );
        Self::push_where(&mut qb, owner, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(u64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(Self::store_err)?;

        let tasks = rows
            .into_iter()
            .map(Self::row_to_task)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((tasks, total.max(0) as u64))
    }
}
