use super::error::ClientError;
use futures_util::future::{BoxFuture, Shared};
use std::sync::{Mutex, RwLock};

pub(crate) type SharedRefresh = Shared<BoxFuture<'static, Result<String, ClientError>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TokenPair {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// The token pair held by one client instance.
///
/// Injected into [`ApiClient`](super::ApiClient) rather than kept in global
/// state. Tokens have no expiry-aware eviction: they are replaced by a login or
/// refresh and only cleared on logout or a rejected refresh.
#[derive(Default)]
pub struct Session {
    tokens: RwLock<TokenPair>,
    inflight_refresh: Mutex<Option<SharedRefresh>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        let session = Self::new();
        session.store(access_token.into(), refresh_token.into());
        session
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    pub fn store(&self, access_token: String, refresh_token: String) {
        self.write(|tokens| {
            tokens.access_token = Some(access_token);
            tokens.refresh_token = Some(refresh_token);
        });
    }

    /// Overwrites only the access token. Last writer wins.
    pub fn set_access_token(&self, access_token: String) {
        self.write(|tokens| tokens.access_token = Some(access_token));
    }

    pub fn clear(&self) {
        self.write(|tokens| *tokens = TokenPair::default());
    }

    fn read(&self) -> TokenPair {
        match self.tokens.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write(&self, f: impl FnOnce(&mut TokenPair)) {
        match self.tokens.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Join the refresh already running for this session, or start `start()`.
    pub(crate) fn join_or_start_refresh(
        &self,
        start: impl FnOnce() -> SharedRefresh,
    ) -> SharedRefresh {
        let mut slot = match self.inflight_refresh.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(running) = slot.as_ref() {
            return running.clone();
        }
        let refresh = start();
        *slot = Some(refresh.clone());
        refresh
    }

    pub(crate) fn finish_refresh(&self, refresh: &SharedRefresh) {
        let mut slot = match self.inflight_refresh.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|running| running.ptr_eq(refresh)) {
            *slot = None;
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self.read();
        f.debug_struct("Session")
            .field("has_access_token", &tokens.access_token.is_some())
            .field("has_refresh_token", &tokens.refresh_token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_refresh_and_clear() {
        let session = Session::new();
        assert!(!session.is_authenticated());

        session.store("a1".to_string(), "r1".to_string());
        session.set_access_token("a2".to_string());
        assert_eq!(session.access_token().as_deref(), Some("a2"));
        assert_eq!(session.refresh_token().as_deref(), Some("r1"));

        session.clear();
        assert_eq!(session.access_token(), None);
        assert_eq!(session.refresh_token(), None);
    }

    #[test]
    fn test_debug_hides_tokens() {
        let session = Session::with_tokens("secret-access", "secret-refresh");
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret"));
    }
}
