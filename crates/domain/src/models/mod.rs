//! Domain model definitions.

pub mod access_code;
pub mod user;

pub use access_code::{
    code_expiry, generate_code, normalize_code, AccessCode, AccessCodeResponse, ActiveCodeResponse,
    CodeStatus, ExpireCodeRequest, GenerateCodeRequest, CODE_TTL_HOURS, HISTORY_LIMIT,
    SYSTEM_AUTO_ISSUER,
};
pub use user::{Role, User, UserResponse};
