//! Domain models for the FMIS backend.

pub mod models;
