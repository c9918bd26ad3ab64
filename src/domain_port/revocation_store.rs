use crate::application_port::*;

#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    /// Deny a refresh token jti for `ttl_secs`, i.e. until it would have
    /// expired anyway.
    async fn revoke_refresh_jti(&self, jti: &str, ttl_secs: u64) -> Result<(), AuthError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError>;
}
