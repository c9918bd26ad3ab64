use super::error::*;
use super::handler;
use crate::application_port::AuthService;
use crate::domain_model::UserId;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    auth_routes(server.clone()).or(task_routes(server))
}

fn auth_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path!("auth" / "login"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let register = warp::post()
        .and(warp::path!("auth" / "register"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let refresh = warp::post()
        .and(warp::path!("auth" / "refresh"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path!("auth" / "logout"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    login.or(register).or(refresh).or(logout)
}

/// Every task route verifies the bearer token before touching the body or
/// the store.
fn task_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let list = warp::get()
        .and(warp::path!("tasks"))
        .and(with_verification(server.auth_service.clone()))
        .and(warp::query::<handler::TaskListQuery>())
        .and(with(server.task_service.clone()))
        .and_then(handler::list_tasks);

    let create = warp::post()
        .and(warp::path!("tasks"))
        .and(with_verification(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.task_service.clone()))
        .and_then(handler::create_task);

    let update = warp::patch()
        .and(warp::path!("tasks" / String))
        .and(with_verification(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.task_service.clone()))
        .and_then(handler::update_task);

    let delete = warp::delete()
        .and(warp::path!("tasks" / String))
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.task_service.clone()))
        .and_then(handler::delete_task);

    list.or(create).or(update).or(delete)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        move |header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let token = header
                    .as_deref()
                    .and_then(bearer_token)
                    .ok_or_else(|| reject::custom(ApiErrorCode::MissingToken))?;
                let user_id = auth_service
                    .verify_token(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok::<UserId, warp::Rejection>(user_id)
            }
        },
    )
}

/// The credential of an `Authorization: Bearer <token>` header. The scheme
/// name is matched case-insensitively.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
