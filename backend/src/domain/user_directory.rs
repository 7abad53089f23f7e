//! Account administration and the caller's own profile.
//!
//! Admins manage any account by username. Every member can read and edit
//! their own profile, but never their role: a submitted role is dropped and
//! the stored one kept.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use crate::domain::access::{Operation, Requester, Resource, authorize};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::{ConfirmationCodeGenerator, IdentityStore};
use crate::domain::{EmailAddress, Error, PersonName, ProfilePatch, Role, User, Username};

/// Submitted account fields for admin creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAccountInput {
    pub username: String,
    pub email: String,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Submitted account changes. Absent fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl AccountChanges {
    fn into_parts(self) -> Result<(ProfilePatch, Option<Role>), Error> {
        let patch = ProfilePatch {
            email: self.email.map(EmailAddress::new).transpose()?,
            bio: self.bio,
            first_name: self.first_name.map(PersonName::new).transpose()?,
            last_name: self.last_name.map(PersonName::new).transpose()?,
        };
        let role = self.role.as_deref().map(Role::parse).transpose()?;
        Ok((patch, role))
    }
}

/// User directory use case.
pub struct UserDirectoryService<S: ?Sized, G: ?Sized> {
    store: Arc<S>,
    codes: Arc<G>,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized, G: ?Sized> UserDirectoryService<S, G> {
    /// Create the service.
    pub fn new(store: Arc<S>, codes: Arc<G>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            codes,
            clock,
        }
    }
}

impl<S, G> UserDirectoryService<S, G>
where
    S: IdentityStore + ?Sized,
    G: ConfirmationCodeGenerator + ?Sized,
{
    fn require_admin(requester: &Requester, operation: Operation) -> Result<(), Error> {
        authorize(requester, operation, Resource::UserDirectory).into_result()
    }

    async fn require_user(&self, username: &str) -> Result<User, Error> {
        let not_found = || Error::not_found(format!("user {username} not found"));
        let Ok(parsed) = Username::new(username) else {
            return Err(not_found());
        };
        self.store
            .find_by_username(&parsed)
            .await?
            .ok_or_else(not_found)
    }

    /// List accounts newest first, optionally by exact username.
    pub async fn list(
        &self,
        requester: &Requester,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<Page<User>, Error> {
        Self::require_admin(requester, Operation::Read)?;
        let username = match search.filter(|term| !term.is_empty()) {
            None => None,
            Some(term) => match Username::new(term) {
                Ok(username) => Some(username),
                Err(_) => {
                    return Ok(Page {
                        count: 0,
                        results: Vec::new(),
                    });
                }
            },
        };
        Ok(self.store.list(username, page).await?)
    }

    /// Fetch one account.
    pub async fn get(&self, requester: &Requester, username: &str) -> Result<User, Error> {
        Self::require_admin(requester, Operation::Read)?;
        self.require_user(username).await
    }

    /// Create an account on someone's behalf. A confirmation code is stored
    /// so the user can later exchange it after requesting sign-up.
    pub async fn create(&self, requester: &Requester, input: NewAccountInput) -> Result<User, Error> {
        Self::require_admin(requester, Operation::Create)?;
        let mut user = User::register(
            Username::new(input.username)?,
            EmailAddress::new(input.email)?,
            self.codes.generate(),
            self.clock.utc(),
        );
        let (patch, role) = AccountChanges {
            email: None,
            role: input.role,
            bio: input.bio,
            first_name: input.first_name,
            last_name: input.last_name,
        }
        .into_parts()?;
        user.apply(patch);
        if let Some(role) = role {
            user.role = role;
        }
        self.store.insert(&user).await?;
        info!(username = %user.username, role = %user.role, "account created by admin");
        Ok(user)
    }

    /// Change any account, including its role.
    pub async fn update(
        &self,
        requester: &Requester,
        username: &str,
        changes: AccountChanges,
    ) -> Result<User, Error> {
        Self::require_admin(requester, Operation::Update)?;
        let mut user = self.require_user(username).await?;
        let (patch, role) = changes.into_parts()?;
        user.apply(patch);
        if let Some(role) = role {
            user.role = role;
        }
        self.persist(&user).await?;
        Ok(user)
    }

    /// Delete an account with its reviews and comments.
    pub async fn delete(&self, requester: &Requester, username: &str) -> Result<(), Error> {
        Self::require_admin(requester, Operation::Delete)?;
        let user = self.require_user(username).await?;
        if !self.store.delete(&user.username).await? {
            return Err(Error::not_found(format!("user {username} not found")));
        }
        info!(username = %user.username, "account deleted");
        Ok(())
    }

    /// The caller's own account.
    pub async fn me(&self, requester: &Requester) -> Result<User, Error> {
        authorize(requester, Operation::Read, Resource::SelfProfile).into_result()?;
        self.current(requester).await
    }

    /// Edit the caller's own profile. Any submitted role is ignored.
    pub async fn update_me(
        &self,
        requester: &Requester,
        changes: AccountChanges,
    ) -> Result<User, Error> {
        authorize(requester, Operation::Update, Resource::SelfProfile).into_result()?;
        let mut user = self.current(requester).await?;
        let stored_role = user.role;
        let (patch, _ignored_role) = AccountChanges {
            role: None,
            ..changes
        }
        .into_parts()?;
        user.apply(patch);
        user.role = stored_role;
        self.persist(&user).await?;
        Ok(user)
    }

    async fn current(&self, requester: &Requester) -> Result<User, Error> {
        let id = requester
            .user_id()
            .ok_or_else(|| Error::unauthorized("authentication credentials were not provided"))?;
        self.store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Error::unauthorized("account no longer exists"))
    }

    async fn persist(&self, user: &User) -> Result<(), Error> {
        if !self.store.update(user).await? {
            return Err(Error::not_found(format!("user {} not found", user.username)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
