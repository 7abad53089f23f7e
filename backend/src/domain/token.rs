//! Exchange of a confirmation code for a bearer token.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::ports::{IdentityStore, IssuedToken, TokenError, TokenIssuer};
use crate::domain::{Error, Username};

/// Raw token request. Both fields must be non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    username: String,
    confirmation_code: String,
}

impl TokenRequest {
    /// Validate presence of both fields.
    ///
    /// # Examples
    /// ```
    /// use critique::domain::token::TokenRequest;
    ///
    /// assert!(TokenRequest::try_from_parts("ada", "ABCDEFGHIJKL").is_ok());
    /// assert!(TokenRequest::try_from_parts("ada", "  ").is_err());
    /// ```
    pub fn try_from_parts(username: &str, confirmation_code: &str) -> Result<Self, Error> {
        if username.trim().is_empty() {
            return Err(Error::invalid_field(
                "username",
                "required",
                "username must not be empty",
            ));
        }
        if confirmation_code.trim().is_empty() {
            return Err(Error::invalid_field(
                "confirmation_code",
                "required",
                "confirmation code must not be empty",
            ));
        }
        Ok(Self {
            username: username.to_owned(),
            confirmation_code: confirmation_code.to_owned(),
        })
    }
}

/// Credential exchange use case.
pub struct CredentialExchangeService<S: ?Sized, T: ?Sized> {
    store: Arc<S>,
    issuer: Arc<T>,
}

impl<S: ?Sized, T: ?Sized> CredentialExchangeService<S, T> {
    /// Create the service.
    pub fn new(store: Arc<S>, issuer: Arc<T>) -> Self {
        Self { store, issuer }
    }
}

impl<S, T> CredentialExchangeService<S, T>
where
    S: IdentityStore + ?Sized,
    T: TokenIssuer + ?Sized,
{
    /// Mint a token when the presented code matches the stored one.
    ///
    /// The code is not consumed; the next sign-up request rotates it.
    pub async fn obtain_token(&self, request: TokenRequest) -> Result<IssuedToken, Error> {
        let TokenRequest {
            username,
            confirmation_code,
        } = request;
        // A syntactically invalid username cannot belong to an account.
        let user = match Username::new(username) {
            Ok(username) => self.store.find_by_username(&username).await?,
            Err(_) => None,
        }
        .ok_or_else(|| Error::not_found("user not found"))?;

        let matches = user
            .confirmation_code
            .as_ref()
            .is_some_and(|stored| stored.matches(&confirmation_code));
        if !matches {
            debug!(username = %user.username, "confirmation code mismatch");
            return Err(Error::invalid_field(
                "confirmation_code",
                "invalid_code",
                "confirmation code is invalid",
            ));
        }

        let token = self
            .issuer
            .issue(&user.id, &user.username)
            .map_err(map_token_error)?;
        info!(username = %user.username, "token issued");
        Ok(token)
    }
}

fn map_token_error(error: TokenError) -> Error {
    Error::internal(format!("failed to issue token: {error}"))
}
