//! HS256 JSON Web Tokens for the bearer scheme.
//!
//! Claims carry the account id (`sub`) and username; the role is read fresh
//! from the store on every request. Expiry is checked by `jsonwebtoken`
//! against the wall clock, while `iat`/`exp` are minted from the injected
//! clock.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::ports::{IssuedToken, TokenError, TokenIssuer, TokenSubject, TokenVerifier};
use crate::domain::{UserId, Username};

/// Default token lifetime in seconds: one day.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Claims {
    sub: String,
    username: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies tokens with one shared secret.
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl JwtTokenService {
    /// Build from the signing secret. The secret buffer is wiped on drop.
    pub fn new(secret: Zeroizing<Vec<u8>>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
            validation,
            clock,
            ttl,
        }
    }
}

impl TokenIssuer for JwtTokenService {
    fn issue(&self, user_id: &UserId, username: &Username) -> Result<IssuedToken, TokenError> {
        let now = self.clock.utc();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::signing("token expiry is out of range"))?;
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.as_str().to_owned(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map(IssuedToken::new)
            .map_err(|err| TokenError::signing(err.to_string()))
    }
}

impl TokenVerifier for JwtTokenService {
    fn verify(&self, token: &str) -> Result<TokenSubject, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|err| TokenError::rejected(err.to_string()))?;
        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|err| TokenError::rejected(format!("malformed subject: {err}")))?;
        Ok(TokenSubject {
            user_id: UserId::from_uuid(id),
        })
    }
}
