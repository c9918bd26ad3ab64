//! Drives the real client against a warp server on an ephemeral port, with a
//! manual clock standing in for wall time on the server side.

use chrono::{Duration as ChronoDuration, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tasklane::api;
use tasklane::application_impl::{JwtConfig, ManualClock};
use tasklane::application_port::Clock;
use tasklane::client::*;
use tasklane::domain_model::{TaskPatch, TaskStatus};
use tasklane::server::Server;
use warp::Filter;

struct TestServer {
    address: SocketAddr,
    clock: Arc<ManualClock>,
}

impl TestServer {
    fn spawn(revocation: bool) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let server_clock: Arc<dyn Clock> = clock.clone();
        let server = Arc::new(Server::in_memory(
            JwtConfig::with_key("lifecycle-test-key"),
            server_clock,
            revocation,
        ));
        let routes = api::routes(server).recover(api::recover_error);
        let (address, serving) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serving);
        Self { address, clock }
    }

    fn client(&self, policy: RefreshPolicy) -> ApiClient {
        self.client_with_session(Arc::new(Session::new()), policy)
    }

    fn client_with_session(&self, session: Arc<Session>, policy: RefreshPolicy) -> ApiClient {
        let transport = ReqwestTransport::new(
            &format!("http://{}", self.address),
            Duration::from_secs(5),
        )
        .unwrap();
        ApiClient::new(Arc::new(transport), session, policy)
    }

    fn advance(&self, by: ChronoDuration) {
        self.clock.advance(by);
    }
}

async fn signed_in(server: &TestServer, email: &str, policy: RefreshPolicy) -> ApiClient {
    let client = server.client(policy);
    client.register(email, "secret-pw", Some("Test")).await.unwrap();
    client.login(email, "secret-pw").await.unwrap();
    client
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_transparently() {
    let server = TestServer::spawn(false);
    let client = signed_in(&server, "ada@example.com", RefreshPolicy::Independent).await;
    client.create_task("write tests", None).await.unwrap();
    let first_access = client.session().access_token().unwrap();

    server.advance(ChronoDuration::minutes(16));

    let page = client.list_tasks(&TaskQuery::default()).await.unwrap();
    assert_eq!(page.tasks.len(), 1);
    assert_eq!(page.tasks[0].title, "write tests");
    assert_ne!(client.session().access_token().unwrap(), first_access);
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn test_expired_refresh_token_forces_logout() {
    let server = TestServer::spawn(false);
    let client = signed_in(&server, "bob@example.com", RefreshPolicy::Independent).await;

    server.advance(ChronoDuration::days(7));

    let err = client.list_tasks(&TaskQuery::default()).await.unwrap_err();
    assert_eq!(err, ClientError::ReauthenticationRequired);
    assert!(!client.session().is_authenticated());
    assert!(client.session().refresh_token().is_none());
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let server = TestServer::spawn(true);
    let client = signed_in(&server, "cy@example.com", RefreshPolicy::Independent).await;
    let access = client.session().access_token().unwrap();
    let refresh = client.session().refresh_token().unwrap();

    client.logout().await.unwrap();
    assert!(!client.session().is_authenticated());

    // A copy of the old pair still works until the access token runs out.
    let stolen = server.client_with_session(
        Arc::new(Session::with_tokens(access, refresh)),
        RefreshPolicy::Independent,
    );
    stolen.list_tasks(&TaskQuery::default()).await.unwrap();

    server.advance(ChronoDuration::minutes(15));
    let err = stolen.list_tasks(&TaskQuery::default()).await.unwrap_err();
    assert_eq!(err, ClientError::ReauthenticationRequired);
}

#[tokio::test]
async fn test_foreign_task_looks_missing() {
    let server = TestServer::spawn(false);
    let owner = signed_in(&server, "owner@example.com", RefreshPolicy::Independent).await;
    let other = signed_in(&server, "other@example.com", RefreshPolicy::Independent).await;
    let task = owner.create_task("mine", Some("hands off")).await.unwrap();

    let patch = TaskPatch {
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };
    let err = other.update_task(task.id, &patch).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 404, .. }));
    let err = other.delete_task(task.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 404, .. }));

    let updated = owner.update_task(task.id, &patch).await.unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
    owner.delete_task(task.id).await.unwrap();
    assert_eq!(owner.list_tasks(&TaskQuery::default()).await.unwrap().pagination.total, 0);
}

#[tokio::test]
async fn test_concurrent_expiry_with_coalesced_refresh() {
    let server = TestServer::spawn(false);
    let client = signed_in(&server, "dee@example.com", RefreshPolicy::Coalesced).await;
    for title in ["a", "b", "c"] {
        client.create_task(title, None).await.unwrap();
    }

    server.advance(ChronoDuration::minutes(20));

    let all_query = TaskQuery::default();
    let search_query = TaskQuery {
        search: Some("B".to_string()),
        ..Default::default()
    };
    let (all, filtered) = tokio::join!(
        client.list_tasks(&all_query),
        client.list_tasks(&search_query)
    );
    assert_eq!(all.unwrap().pagination.total, 3);
    let filtered = filtered.unwrap();
    assert_eq!(filtered.tasks.len(), 1);
    assert_eq!(filtered.tasks[0].title, "b");
}

#[tokio::test]
async fn test_bad_credentials_are_reported_as_is() {
    let server = TestServer::spawn(false);
    let client = signed_in(&server, "eve@example.com", RefreshPolicy::Independent).await;
    client.session().clear();

    let err = client.login("eve@example.com", "wrong-pw").await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 400, .. }));
    assert!(!client.session().is_authenticated());
}
