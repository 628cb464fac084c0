//! FMIS API crate.
//!
//! Exposed as a library so integration tests can build the router and
//! configuration directly.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod services;
