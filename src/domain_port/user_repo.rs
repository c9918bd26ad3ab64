use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a new user. Fails with `AuthError::UserExists` on a duplicate email.
    async fn create(&self, user: &User) -> Result<(), AuthError>;

    /// Fetch a user by email (for login).
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;
}
