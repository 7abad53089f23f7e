//! Ports for minting and verifying bearer tokens.
//!
//! Tokens carry identity only. Callers re-read the account on every request,
//! so a role change takes effect without re-issuing tokens.

use crate::domain::{UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by token adapters.
    pub enum TokenError {
        /// The token could not be signed.
        Signing { message: String } => "token signing failed: {message}",
        /// The token is malformed, forged or expired.
        Rejected { message: String } => "token rejected: {message}",
    }
}

/// A signed bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken(String);

impl IssuedToken {
    /// Wrap an encoded token.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encoded token for the response body.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IssuedToken(..)")
    }
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: UserId,
}

/// Mints bearer tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    /// Sign a token for the account.
    fn issue(&self, user_id: &UserId, username: &Username) -> Result<IssuedToken, TokenError>;
}

/// Verifies bearer tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    /// Check signature and expiry, returning the subject.
    fn verify(&self, token: &str) -> Result<TokenSubject, TokenError>;
}
