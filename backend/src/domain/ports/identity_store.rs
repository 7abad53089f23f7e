//! Port for account persistence.
//!
//! The store owns uniqueness of usernames and emails; adapters translate a
//! constraint violation into [`IdentityStoreError::Duplicate`] naming the
//! colliding field so concurrent sign-ups surface as conflicts.

use async_trait::async_trait;

use crate::domain::pagination::{Page, PageRequest};
use crate::domain::{ConfirmationCode, EmailAddress, Error, User, UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity store adapters.
    pub enum IdentityStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "identity store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "identity store query failed: {message}",
        /// A unique column already holds the submitted value.
        Duplicate { field: String } =>
            "an account with this {field} already exists",
    }
}

/// Account storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look an account up by id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, IdentityStoreError>;

    /// Look an account up by username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, IdentityStoreError>;

    /// Look an account up by email.
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, IdentityStoreError>;

    /// Insert a new account.
    async fn insert(&self, user: &User) -> Result<(), IdentityStoreError>;

    /// Overwrite every mutable column of an existing account. Returns `false`
    /// when no row matched.
    async fn update(&self, user: &User) -> Result<bool, IdentityStoreError>;

    /// Replace the stored confirmation code.
    async fn set_confirmation_code(
        &self,
        id: &UserId,
        code: &ConfirmationCode,
    ) -> Result<(), IdentityStoreError>;

    /// Delete an account and, through cascades, its reviews and comments.
    /// Returns `false` when no row matched.
    async fn delete(&self, username: &Username) -> Result<bool, IdentityStoreError>;

    /// List accounts newest-joined first, optionally narrowed to one exact
    /// username.
    async fn list(
        &self,
        username: Option<Username>,
        page: PageRequest,
    ) -> Result<Page<User>, IdentityStoreError>;
}

impl From<IdentityStoreError> for Error {
    fn from(err: IdentityStoreError) -> Self {
        match err {
            IdentityStoreError::Connection { message } => {
                Error::service_unavailable(format!("identity store unavailable: {message}"))
            }
            IdentityStoreError::Query { message } => {
                Error::internal(format!("identity store error: {message}"))
            }
            IdentityStoreError::Duplicate { field } => {
                Error::conflict(format!("an account with this {field} already exists"))
                    .with_details(serde_json::json!({
                        "code": "account_conflict",
                        "fields": [field],
                    }))
            }
        }
    }
}
