//! Title review platform backend.
//!
//! Hexagonal layout: [`domain`] holds the rules and ports, [`inbound`] the
//! actix-web adapter and [`outbound`] the Postgres, SMTP and JWT adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
