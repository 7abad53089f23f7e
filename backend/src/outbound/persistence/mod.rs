//! PostgreSQL persistence adapters using Diesel with `diesel-async`.
//!
//! Repositories only translate between row structs and domain records; the
//! rules live in the domain services. Row structs (`models.rs`) and the table
//! definitions (`schema.rs`) stay private to this module.

mod diesel_catalogue_repository;
mod diesel_error_mapping;
mod diesel_identity_store;
mod diesel_review_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_catalogue_repository::DieselCatalogueRepository;
pub use diesel_identity_store::DieselIdentityStore;
pub use diesel_review_repository::DieselReviewRepository;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
