use crate::application_port::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local deny list. Entries are dropped lazily once their TTL passes.
pub struct MemoryRevocationStore {
    revoked: DashMap<String, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl MemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            revoked: DashMap::new(),
            clock,
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        self.revoked.retain(|_, until| *until > now);
    }
}

#[async_trait::async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke_refresh_jti(&self, jti: &str, ttl_secs: u64) -> Result<(), AuthError> {
        let now = self.clock.now();
        self.purge_expired(now);
        let until = now + std::time::Duration::from_secs(ttl_secs);
        self.revoked.insert(jti.to_string(), until);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let now = self.clock.now();
        Ok(self
            .revoked
            .get(jti)
            .map(|until| *until > now)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::ManualClock;

    #[tokio::test]
    async fn test_revocation_lapses_after_ttl() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = MemoryRevocationStore::new(clock.clone());

        store.revoke_refresh_jti("jti-1", 60).await.unwrap();
        assert!(store.is_revoked("jti-1").await.unwrap());
        assert!(!store.is_revoked("jti-2").await.unwrap());

        clock.advance(chrono::Duration::seconds(60));
        assert!(!store.is_revoked("jti-1").await.unwrap());
    }
}
