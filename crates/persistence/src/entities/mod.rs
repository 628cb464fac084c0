//! Entity definitions (database row mappings).

pub mod access_code;
pub mod user;
