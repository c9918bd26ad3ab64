use super::error::ClientError;
use super::interceptor::{AuthInterceptor, RefreshPolicy};
use super::session::Session;
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::domain_model::{PublicUser, Task, TaskId, TaskPage, TaskPatch, TaskStatus, UserId};
use crate::logger::*;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginReply {
    access_token: String,
    refresh_token: String,
    user: PublicUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterReply {
    user_id: UserId,
}

/// Search, filter and pagination for the task list.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
}

impl TaskQuery {
    fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.clone()));
        }
        pairs
    }
}

/// Typed access to the task API for one session.
///
/// Auth endpoints go straight to the transport; everything under `/tasks` goes
/// through the [`AuthInterceptor`].
#[derive(Clone)]
pub struct ApiClient {
    interceptor: AuthInterceptor,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>, policy: RefreshPolicy) -> Self {
        Self {
            interceptor: AuthInterceptor::new(transport, session, policy),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        self.interceptor.session()
    }

    async fn send_unauthenticated(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        self.interceptor.transport().send(request).await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<UserId, ClientError> {
        let body = json!({ "email": email, "password": password, "name": name });
        let reply: RegisterReply = self
            .send_unauthenticated(HttpRequest::post("/auth/register", body))
            .await?
            .into_result()?;
        Ok(reply.user_id)
    }

    /// Exchanges credentials for a token pair and stores it in the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let body = json!({ "email": email, "password": password });
        let reply: LoginReply = self
            .send_unauthenticated(HttpRequest::post("/auth/login", body))
            .await?
            .into_result()?;
        self.session().store(reply.access_token, reply.refresh_token);
        info!(user_id = %reply.user.id, "logged in");
        Ok(reply.user)
    }

    /// Clears the session. The server is asked to revoke the refresh token,
    /// but local state is dropped even if that call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let refresh_token = self.session().refresh_token();
        self.session().clear();
        let Some(refresh_token) = refresh_token else {
            return Ok(());
        };
        let body = json!({ "refreshToken": refresh_token });
        let _: serde_json::Value = self
            .send_unauthenticated(HttpRequest::post("/auth/logout", body))
            .await?
            .into_result()?;
        Ok(())
    }

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, ClientError> {
        let request = HttpRequest::get("/tasks").query(query.to_pairs());
        self.interceptor.execute(request).await?.into_result()
    }

    pub async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, ClientError> {
        let body = json!({ "title": title, "description": description });
        self.interceptor
            .execute(HttpRequest::post("/tasks", body))
            .await?
            .into_result()
    }

    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ClientError> {
        let body = serde_json::to_value(patch).map_err(|e| ClientError::Decode(e.to_string()))?;
        let request = HttpRequest::new(Method::PATCH, format!("/tasks/{id}")).json(body);
        self.interceptor.execute(request).await?.into_result()
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), ClientError> {
        let request = HttpRequest::new(Method::DELETE, format!("/tasks/{id}"));
        let _: serde_json::Value = self.interceptor.execute(request).await?.into_result()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_query_skips_empty_parameters() {
        let query = TaskQuery {
            page: Some(2),
            limit: None,
            status: Some(TaskStatus::InProgress),
            search: Some(String::new()),
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("status".to_string(), "IN_PROGRESS".to_string()),
            ]
        );
    }
}
