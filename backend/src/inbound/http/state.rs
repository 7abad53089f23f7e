//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and ports and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::catalogue_service::CatalogueService;
use crate::domain::ports::{
    CatalogueRepository, ConfirmationCodeGenerator, IdentityStore, NotificationSink,
    ReviewRepository, TokenIssuer, TokenVerifier,
};
use crate::domain::review_ledger::ReviewLedgerService;
use crate::domain::signup::SignUpService;
use crate::domain::token::CredentialExchangeService;
use crate::domain::user_directory::UserDirectoryService;

/// Sign-up over trait-object ports.
pub type SignUp =
    SignUpService<dyn IdentityStore, dyn NotificationSink, dyn ConfirmationCodeGenerator>;
/// Code-for-token exchange over trait-object ports.
pub type CredentialExchange = CredentialExchangeService<dyn IdentityStore, dyn TokenIssuer>;
/// Catalogue use cases over a trait-object repository.
pub type Catalogue = CatalogueService<dyn CatalogueRepository>;
/// Review and comment use cases over trait-object repositories.
pub type ReviewLedger = ReviewLedgerService<dyn ReviewRepository, dyn CatalogueRepository>;
/// Account administration over trait-object ports.
pub type UserDirectory = UserDirectoryService<dyn IdentityStore, dyn ConfirmationCodeGenerator>;

/// Parameter object bundling every port implementation the handlers need.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub identities: Arc<dyn IdentityStore>,
    pub catalogue: Arc<dyn CatalogueRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub notifications: Arc<dyn NotificationSink>,
    pub codes: Arc<dyn ConfirmationCodeGenerator>,
    pub token_issuer: Arc<dyn TokenIssuer>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub clock: Arc<dyn Clock>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub signup: Arc<SignUp>,
    pub credentials: Arc<CredentialExchange>,
    pub catalogue: Arc<Catalogue>,
    pub reviews: Arc<ReviewLedger>,
    pub users: Arc<UserDirectory>,
    /// Used by the bearer extractor to resolve the caller.
    pub identities: Arc<dyn IdentityStore>,
    pub token_verifier: Arc<dyn TokenVerifier>,
}

impl HttpState {
    /// Wire the services over the given ports.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            identities,
            catalogue,
            reviews,
            notifications,
            codes,
            token_issuer,
            token_verifier,
            clock,
        } = ports;
        Self {
            signup: Arc::new(SignUpService::new(
                identities.clone(),
                notifications,
                codes.clone(),
                clock.clone(),
            )),
            credentials: Arc::new(CredentialExchangeService::new(
                identities.clone(),
                token_issuer,
            )),
            catalogue: Arc::new(CatalogueService::new(catalogue.clone(), clock.clone())),
            reviews: Arc::new(ReviewLedgerService::new(reviews, catalogue, clock.clone())),
            users: Arc::new(UserDirectoryService::new(identities.clone(), codes, clock)),
            identities,
            token_verifier,
        }
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
