//! HTTP route handlers.

pub mod access_codes;
pub mod auth;
pub mod health;
