//! Outbound adapters implementing the domain ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **mail**: SMTP and log notification sinks
//! - **token**: HS256 JWT issuer and verifier
//! - **codes**: random confirmation-code generator

pub mod codes;
pub mod mail;
pub mod persistence;
pub mod token;
