use crate::application_port::*;
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorBody {
        error: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(code) = err.find::<ApiErrorCode>() {
        return Ok(error_reply(code.status(), code.to_string()));
    }
    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Not found"));
    }
    if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<reject::InvalidQuery>().is_some()
    {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid data"));
    }
    if err.find::<reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    warn!("unhandled rejection: {:?}", err);
    Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Server error"))
}

#[derive(Debug, Clone, Error)]
pub enum ApiErrorCode {
    #[error("Access denied. No token provided.")]
    MissingToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Refresh token required")]
    MissingRefreshToken,
    #[error("Invalid or expired refresh token")]
    RefreshRejected,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User already exists")]
    UserExists,
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Server error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    /// Only `401` tells a client that refreshing may help.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::MissingToken
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::MissingRefreshToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InvalidToken | ApiErrorCode::RefreshRejected => StatusCode::FORBIDDEN,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::UserExists
            | ApiErrorCode::InvalidData(_) => StatusCode::BAD_REQUEST,
            ApiErrorCode::TaskNotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated => ApiErrorCode::MissingToken,
            AuthError::ExpiredToken => ApiErrorCode::TokenExpired,
            AuthError::InvalidToken => ApiErrorCode::InvalidToken,
            AuthError::RefreshRejected => ApiErrorCode::RefreshRejected,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::UserExists => ApiErrorCode::UserExists,
            AuthError::Validation(e) => ApiErrorCode::InvalidData(e),
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<TaskError> for ApiErrorCode {
    fn from(error: TaskError) -> Self {
        match error {
            TaskError::NotFound => ApiErrorCode::TaskNotFound,
            TaskError::Validation(e) => ApiErrorCode::InvalidData(e),
            TaskError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}
