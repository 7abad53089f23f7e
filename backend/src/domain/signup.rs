//! Passwordless sign-up: issue a confirmation code for a (username, email)
//! pair and deliver it by email.
//!
//! Signing up again with the exact same pair rotates the code instead of
//! failing, so a user who lost the email can ask for another one.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    ConfirmationCodeGenerator, IdentityStore, IdentityStoreError, Notification, NotificationSink,
};
use crate::domain::{ConfirmationCode, EmailAddress, Error, User, Username};

/// Subject line of the confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "confirmation_code";

/// Validated sign-up input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub username: Username,
    pub email: EmailAddress,
}

impl SignUpRequest {
    /// Validate raw input. The username is checked first so a reserved or
    /// malformed username is reported regardless of the email.
    pub fn try_from_parts(username: &str, email: &str) -> Result<Self, Error> {
        let username = Username::new(username)?;
        let email = EmailAddress::new(email)?;
        Ok(Self { username, email })
    }
}

/// What the caller learns about a successful sign-up. Never the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpReceipt {
    pub username: Username,
    pub email: EmailAddress,
}

/// Sign-up use case.
pub struct SignUpService<S: ?Sized, N: ?Sized, G: ?Sized> {
    store: Arc<S>,
    sink: Arc<N>,
    codes: Arc<G>,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized, N: ?Sized, G: ?Sized> SignUpService<S, N, G> {
    /// Create the service.
    pub fn new(store: Arc<S>, sink: Arc<N>, codes: Arc<G>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sink,
            codes,
            clock,
        }
    }
}

impl<S, N, G> SignUpService<S, N, G>
where
    S: IdentityStore + ?Sized,
    N: NotificationSink + ?Sized,
    G: ConfirmationCodeGenerator + ?Sized,
{
    /// Register the pair or rotate its code, then deliver the code.
    pub async fn request_sign_up(&self, request: SignUpRequest) -> Result<SignUpReceipt, Error> {
        let SignUpRequest { username, email } = request;
        let by_username = self.store.find_by_username(&username).await?;
        let by_email = self.store.find_by_email(&email).await?;

        let code = self.codes.generate();
        match (by_username, by_email) {
            (Some(existing), Some(same)) if existing.id == same.id => {
                self.store
                    .set_confirmation_code(&existing.id, &code)
                    .await?;
                info!(username = %existing.username, "confirmation code rotated");
            }
            (None, None) => {
                let user = User::register(
                    username.clone(),
                    email.clone(),
                    code.clone(),
                    self.clock.utc(),
                );
                self.store.insert(&user).await.map_err(map_insert_error)?;
                info!(username = %user.username, user_id = %user.id, "account registered");
            }
            (by_username, by_email) => {
                let mut fields = Vec::new();
                if by_username.is_some() {
                    fields.push("username");
                }
                if by_email.is_some() {
                    fields.push("email");
                }
                return Err(account_conflict(&fields));
            }
        }

        self.deliver(&username, &email, &code).await;
        Ok(SignUpReceipt { username, email })
    }

    async fn deliver(&self, username: &Username, email: &EmailAddress, code: &ConfirmationCode) {
        let notification = Notification {
            recipient: email.clone(),
            subject: CONFIRMATION_SUBJECT.to_owned(),
            body: format!("Your confirmation code: {}", code.expose()),
        };
        if let Err(error) = self.sink.send(&notification).await {
            warn!(%username, %error, "confirmation code delivery failed");
        }
    }
}

fn account_conflict(fields: &[&str]) -> Error {
    Error::conflict("username or email is already registered to another account").with_details(
        json!({
            "code": "account_conflict",
            "fields": fields,
        }),
    )
}

fn map_insert_error(error: IdentityStoreError) -> Error {
    match error {
        IdentityStoreError::Duplicate { field } => account_conflict(&[field.as_str()]),
        other => Error::from(other),
    }
}

#[cfg(test)]
mod tests;
