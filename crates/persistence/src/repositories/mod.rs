//! Repository implementations.

pub mod access_code;
pub mod user;

pub use access_code::{AccessCodeRepository, ConsumeOutcome};
pub use user::UserRepository;
