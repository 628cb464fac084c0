//! Business services.

pub mod access_code;
pub mod auth;
