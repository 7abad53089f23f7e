//! HTTP inbound adapter exposing the REST API.
//!
//! Handlers translate JSON into service calls on [`state::HttpState`] and
//! back. [`configure`] registers every versioned route; the health probes
//! live outside the `/api/v1` scope.

use actix_web::web;

pub mod auth;
pub mod catalogue;
pub mod error;
pub mod health;
pub mod pagination;
pub mod reviews;
pub mod signup;
pub mod state;
pub mod token_config;
pub mod users;

pub use error::ApiResult;

/// Register the `/api/v1` routes and extractor error handling.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
///
/// let app = App::new().service(web::scope("/api/v1").configure(critique::inbound::http::configure));
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    error::configure_extractors(cfg);
    cfg.service(signup::sign_up).service(signup::obtain_token);
    users::configure(cfg);
    catalogue::configure(cfg);
    reviews::configure(cfg);
}
