use super::error::ClientError;
use super::session::Session;
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::logger::*;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Where one logical request is in its attempt/refresh/retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// First send with whatever access token is stored.
    Attempt,
    /// The first attempt got a 401; asking for a new access token.
    Refreshing,
    /// One resend with the fresh token. Terminates whatever the outcome.
    Retry,
    Done,
    /// The refresh token was rejected; stored tokens are gone.
    LoggedOut,
}

/// What concurrent requests do when they all find the access token expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Every failing request runs its own refresh; the last one to finish
    /// leaves its token in the session.
    #[default]
    Independent,
    /// Requests on the same session share one in-flight refresh.
    Coalesced,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshReply {
    access_token: String,
}

/// Attaches the session's access token to outgoing requests and performs at
/// most one transparent refresh-and-retry per logical request.
#[derive(Clone)]
pub struct AuthInterceptor {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    policy: RefreshPolicy,
}

impl AuthInterceptor {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>, policy: RefreshPolicy) -> Self {
        Self {
            transport,
            session,
            policy,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Runs the request through the state machine. Any response that is not a
    /// first 401 comes back unchanged; a rejected refresh surfaces as
    /// `ClientError::ReauthenticationRequired`.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut state = RequestState::Attempt;
        let mut last_response: Option<HttpResponse> = None;
        let mut fresh_token: Option<String> = None;

        loop {
            trace!(?state, path = %request.path, "request state");
            state = match state {
                RequestState::Attempt => {
                    let attempt = request.clone().bearer(self.session.access_token());
                    let response = self.transport.send(attempt).await?;
                    let next = if response.status == 401 {
                        RequestState::Refreshing
                    } else {
                        RequestState::Done
                    };
                    last_response = Some(response);
                    next
                }
                RequestState::Refreshing => match self.refresh_access_token().await {
                    Ok(token) => {
                        fresh_token = Some(token);
                        RequestState::Retry
                    }
                    Err(ClientError::ReauthenticationRequired) => RequestState::LoggedOut,
                    Err(e) => return Err(e),
                },
                RequestState::Retry => {
                    let retry = request.clone().bearer(fresh_token.take());
                    last_response = Some(self.transport.send(retry).await?);
                    RequestState::Done
                }
                RequestState::Done => {
                    return last_response.ok_or_else(|| {
                        ClientError::Transport("request finished without a response".to_string())
                    });
                }
                RequestState::LoggedOut => {
                    info!("refresh rejected, clearing session");
                    self.session.clear();
                    return Err(ClientError::ReauthenticationRequired);
                }
            };
        }
    }

    async fn refresh_access_token(&self) -> Result<String, ClientError> {
        match self.policy {
            RefreshPolicy::Independent => {
                refresh_once(self.transport.clone(), self.session.clone()).await
            }
            RefreshPolicy::Coalesced => {
                let refresh = self.session.join_or_start_refresh(|| {
                    refresh_once(self.transport.clone(), self.session.clone())
                        .boxed()
                        .shared()
                });
                let result = refresh.clone().await;
                self.session.finish_refresh(&refresh);
                result
            }
        }
    }
}

/// One call to the refresh endpoint. A missing or rejected refresh token
/// yields `ReauthenticationRequired`; a transport failure is passed on as is.
async fn refresh_once(
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
) -> Result<String, ClientError> {
    let Some(refresh_token) = session.refresh_token() else {
        debug!("no refresh token stored");
        return Err(ClientError::ReauthenticationRequired);
    };

    let body = serde_json::to_value(RefreshBody {
        refresh_token: &refresh_token,
    })
    .map_err(|e| ClientError::Decode(e.to_string()))?;
    let response = transport
        .send(HttpRequest::post(REFRESH_PATH, body))
        .await?;

    if !response.is_success() {
        debug!(status = response.status, "refresh rejected");
        return Err(ClientError::ReauthenticationRequired);
    }

    let reply: RefreshReply = response.json()?;
    session.set_access_token(reply.access_token.clone());
    debug!("access token refreshed");
    Ok(reply.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    const STALE: &str = "stale-access";
    const REFRESH: &str = "good-refresh";

    /// A pretend backend: protected paths accept only tokens it minted, the
    /// refresh endpoint mints `access-N` for the one refresh token it knows.
    struct FakeBackend {
        api_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        valid_access: Mutex<HashSet<String>>,
        accept_refresh: bool,
        always_unauthorized: bool,
        refresh_unreachable: bool,
        status_override: Option<u16>,
        stale_barrier: Option<Barrier>,
        refresh_delay: Duration,
    }

    impl FakeBackend {
        fn new() -> Self {
            FakeBackend {
                api_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                valid_access: Mutex::new(HashSet::new()),
                accept_refresh: true,
                always_unauthorized: false,
                refresh_unreachable: false,
                status_override: None,
                stale_barrier: None,
                refresh_delay: Duration::ZERO,
            }
        }

        fn api_calls(&self) -> usize {
            self.api_calls.load(Ordering::SeqCst)
        }

        fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    fn reply(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeBackend {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
            if request.path == REFRESH_PATH {
                let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if !self.refresh_delay.is_zero() {
                    tokio::time::sleep(self.refresh_delay).await;
                }
                if self.refresh_unreachable {
                    return Err(ClientError::Transport("connection refused".to_string()));
                }
                let presented = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("refreshToken"))
                    .and_then(|t| t.as_str());
                if !self.accept_refresh || presented != Some(REFRESH) {
                    return Ok(reply(403, json!({ "error": "Invalid or expired refresh token" })));
                }
                let token = format!("access-{n}");
                self.valid_access.lock().unwrap().insert(token.clone());
                return Ok(reply(200, json!({ "accessToken": token })));
            }

            self.api_calls.fetch_add(1, Ordering::SeqCst);
            if request.bearer.as_deref() == Some(STALE) {
                if let Some(barrier) = &self.stale_barrier {
                    barrier.wait().await;
                }
            }
            if let Some(status) = self.status_override {
                return Ok(reply(status, json!({ "error": "nope" })));
            }
            let authorized = request
                .bearer
                .as_ref()
                .is_some_and(|t| self.valid_access.lock().unwrap().contains(t));
            if self.always_unauthorized || !authorized {
                return Ok(reply(401, json!({ "error": "Token expired" })));
            }
            Ok(reply(200, json!({ "ok": true, "bearer": request.bearer })))
        }
    }

    fn interceptor(backend: Arc<FakeBackend>, policy: RefreshPolicy) -> AuthInterceptor {
        AuthInterceptor::new(
            backend,
            Arc::new(Session::with_tokens(STALE, REFRESH)),
            policy,
        )
    }

    fn list_tasks() -> HttpRequest {
        HttpRequest::new(Method::GET, "/tasks")
    }

    #[tokio::test]
    async fn test_expired_access_token_is_refreshed_transparently() {
        let backend = Arc::new(FakeBackend::new());
        let client = interceptor(backend.clone(), RefreshPolicy::Independent);

        let response = client.execute(list_tasks()).await.unwrap();

        assert_eq!(response.status, 200);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["bearer"], "access-1");
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(backend.api_calls(), 2);
        assert_eq!(client.session().access_token().as_deref(), Some("access-1"));
        assert_eq!(client.session().refresh_token().as_deref(), Some(REFRESH));
    }

    #[tokio::test]
    async fn test_rejected_refresh_logs_out_after_one_attempt() {
        let mut backend = FakeBackend::new();
        backend.accept_refresh = false;
        let backend = Arc::new(backend);
        let client = interceptor(backend.clone(), RefreshPolicy::Independent);

        let result = client.execute(list_tasks()).await;

        assert_eq!(result, Err(ClientError::ReauthenticationRequired));
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(backend.api_calls(), 1);
        assert_eq!(client.session().access_token(), None);
        assert_eq!(client.session().refresh_token(), None);
    }

    #[tokio::test]
    async fn test_server_that_always_says_401_is_retried_once() {
        let mut backend = FakeBackend::new();
        backend.always_unauthorized = true;
        let backend = Arc::new(backend);
        let client = interceptor(backend.clone(), RefreshPolicy::Independent);

        let response = client.execute(list_tasks()).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(backend.api_calls(), 2);
    }

    #[tokio::test]
    async fn test_other_statuses_pass_through_untouched() {
        for status in [403, 404, 500] {
            let mut backend = FakeBackend::new();
            backend.status_override = Some(status);
            let backend = Arc::new(backend);
            let client = interceptor(backend.clone(), RefreshPolicy::Independent);

            let response = client.execute(list_tasks()).await.unwrap();

            assert_eq!(response.status, status);
            assert_eq!(backend.refresh_calls(), 0);
            assert_eq!(backend.api_calls(), 1);
            assert_eq!(client.session().access_token().as_deref(), Some(STALE));
        }
    }

    #[tokio::test]
    async fn test_missing_refresh_token_logs_out_without_calling_refresh() {
        let backend = Arc::new(FakeBackend::new());
        let client = AuthInterceptor::new(
            backend.clone(),
            Arc::new(Session::new()),
            RefreshPolicy::Independent,
        );

        let result = client.execute(list_tasks()).await;

        assert_eq!(result, Err(ClientError::ReauthenticationRequired));
        assert_eq!(backend.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_refresh_keeps_session() {
        let mut backend = FakeBackend::new();
        backend.refresh_unreachable = true;
        let backend = Arc::new(backend);
        let client = interceptor(backend.clone(), RefreshPolicy::Independent);

        let result = client.execute(list_tasks()).await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(backend.api_calls(), 1);
        assert_eq!(client.session().refresh_token().as_deref(), Some(REFRESH));
    }

    #[tokio::test]
    async fn test_concurrent_expiry_refreshes_independently() {
        let mut backend = FakeBackend::new();
        backend.stale_barrier = Some(Barrier::new(2));
        let backend = Arc::new(backend);
        let client = interceptor(backend.clone(), RefreshPolicy::Independent);

        let (a, b) = tokio::join!(client.execute(list_tasks()), client.execute(list_tasks()));

        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);
        assert_eq!(backend.refresh_calls(), 2);
        assert_eq!(backend.api_calls(), 4);
        // Both refreshes landed; whichever wrote last is what the session keeps.
        let stored = client.session().access_token().unwrap();
        assert!(stored == "access-1" || stored == "access-2");
    }

    #[tokio::test]
    async fn test_concurrent_expiry_shares_one_refresh_when_coalesced() {
        let mut backend = FakeBackend::new();
        backend.stale_barrier = Some(Barrier::new(2));
        backend.refresh_delay = Duration::from_millis(50);
        let backend = Arc::new(backend);
        let client = interceptor(backend.clone(), RefreshPolicy::Coalesced);

        let (a, b) = tokio::join!(client.execute(list_tasks()), client.execute(list_tasks()));

        let a: serde_json::Value = a.unwrap().json().unwrap();
        let b: serde_json::Value = b.unwrap().json().unwrap();
        assert_eq!(a["bearer"], "access-1");
        assert_eq!(b["bearer"], "access-1");
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(client.session().access_token().as_deref(), Some("access-1"));
    }
}
