//! Player authentication
//!
//! - Session tokens (HS256 JWT)
//! - Password hashing with Argon2

pub mod jwt;
pub mod password;

pub use jwt::{
    extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult,
    DEFAULT_TOKEN_EXPIRY_SECONDS,
};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
