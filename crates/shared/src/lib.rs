//! Shared utilities for the FMIS backend.
//!
//! This crate contains:
//! - JWT session token generation and validation
//! - Password hashing

pub mod jwt;
pub mod password;
