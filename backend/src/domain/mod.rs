//! Domain types, use cases and driven ports.
//!
//! Purpose: hold the review platform's rules independent of transport and
//! storage. Inbound adapters call the services; outbound adapters implement
//! the traits in [`ports`].
//!
//! Public surface:
//! - [`Error`] / [`ErrorCode`]: transport-agnostic failure payload.
//! - [`access`]: capability tiers and the `authorize` decision function.
//! - [`signup`], [`token`]: passwordless sign-up and code-for-token exchange.
//! - [`catalogue_service`], [`review_ledger`], [`user_directory`]: CRUD use
//!   cases.
//! - [`rating`]: read-time title ratings.

pub mod access;
pub mod catalogue;
pub mod catalogue_service;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod rating;
pub mod review_ledger;
pub mod reviews;
pub mod signup;
pub mod token;
pub mod trace_id;
pub mod user;
pub mod user_directory;

pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::trace_id::TraceId;
pub use self::user::{
    ConfirmationCode, EmailAddress, PersonName, ProfilePatch, Role, User, UserId,
    UserValidationError, Username,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use critique::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
