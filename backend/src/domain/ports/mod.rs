//! Driven ports: the traits adapters implement for storage, delivery and
//! token handling.
//!
//! Each port exposes a typed error built with `define_port_error!` and a
//! `From` conversion into [`crate::domain::Error`] for the common mapping.
//! Services override the mapping where a variant means something specific to
//! the use case.

mod macros;
pub(crate) use macros::define_port_error;

mod catalogue_repository;
mod confirmation_codes;
mod identity_store;
mod notification_sink;
mod review_repository;
mod token_issuer;

#[cfg(test)]
pub use catalogue_repository::MockCatalogueRepository;
pub use catalogue_repository::{CatalogueRepository, CatalogueRepositoryError};
#[cfg(test)]
pub use confirmation_codes::MockConfirmationCodeGenerator;
pub use confirmation_codes::{CONFIRMATION_CODE_LENGTH, ConfirmationCodeGenerator};
#[cfg(test)]
pub use identity_store::MockIdentityStore;
pub use identity_store::{IdentityStore, IdentityStoreError};
#[cfg(test)]
pub use notification_sink::MockNotificationSink;
pub use notification_sink::{Notification, NotificationError, NotificationSink};
#[cfg(test)]
pub use review_repository::MockReviewRepository;
pub use review_repository::{ReviewRepository, ReviewRepositoryError};
#[cfg(test)]
pub use token_issuer::{MockTokenIssuer, MockTokenVerifier};
pub use token_issuer::{IssuedToken, TokenError, TokenIssuer, TokenSubject, TokenVerifier};
