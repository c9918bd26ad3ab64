use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reject;

// region auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = LoginResponse {
        access_token: login_result.tokens.access_token.0,
        refresh_token: login_result.tokens.refresh_token.0,
        user: login_result.user,
    };
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: UserId,
}

pub async fn register(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let register_input = RegisterInput {
        email: body.email,
        password: body.password,
        name: body.name,
    };
    let user_id = auth_service
        .register(register_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = RegisterResponse {
        message: "User created successfully".to_string(),
        user_id,
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let refresh_token = body
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| reject::custom(ApiErrorCode::MissingRefreshToken))?;

    let result = auth_service
        .refresh(&refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    debug!(user_id = %result.user_id, "access token refreshed");

    Ok(warp::reply::json(&RefreshResponse {
        access_token: result.access_token.0,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn logout(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if let Some(refresh_token) = body.refresh_token.filter(|t| !t.is_empty()) {
        auth_service
            .logout(&refresh_token)
            .await
            .map_err(ApiErrorCode::from)
            .map_err(reject::custom)?;
    }
    Ok(warp::reply::json(&MessageResponse {
        message: "Logged out".to_string(),
    }))
}

// endregion

// region tasks

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl TaskListQuery {
    /// Empty parameters mean "no filter".
    fn into_parts(self) -> Result<(TaskFilter, PageRequest), ApiErrorCode> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<TaskStatus>())
            .transpose()
            .map_err(ApiErrorCode::InvalidData)?;
        let search = self.search.filter(|s| !s.is_empty());
        Ok((
            TaskFilter { status, search },
            PageRequest::new(self.page, self.limit),
        ))
    }
}

pub async fn list_tasks(
    user_id: UserId,
    query: TaskListQuery,
    task_service: Arc<dyn TaskService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (filter, page) = query.into_parts().map_err(reject::custom)?;
    let task_page = task_service
        .list(user_id, filter, page)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&task_page))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

pub async fn create_task(
    user_id: UserId,
    body: CreateTaskRequest,
    task_service: Arc<dyn TaskService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = NewTask {
        title: body.title,
        description: body.description,
    };
    let task = task_service
        .create(user_id, input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&task),
        StatusCode::CREATED,
    ))
}

/// Unparsable ids are reported the same way as unknown ones.
fn parse_task_id(id: &str) -> Result<TaskId, warp::Rejection> {
    id.parse::<TaskId>()
        .map_err(|_| reject::custom(ApiErrorCode::TaskNotFound))
}

pub async fn update_task(
    id: String,
    user_id: UserId,
    body: TaskPatch,
    task_service: Arc<dyn TaskService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let task_id = parse_task_id(&id)?;
    let task = task_service
        .update(user_id, task_id, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&task))
}

pub async fn delete_task(
    id: String,
    user_id: UserId,
    task_service: Arc<dyn TaskService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let task_id = parse_task_id(&id)?;
    task_service
        .delete(user_id, task_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

// endregion
