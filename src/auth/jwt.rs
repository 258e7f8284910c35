//! Session tokens
//!
//! Players get an HS256 token at registration and login. The token carries
//! the account's `token_version`; bumping that version on the stored user
//! invalidates every token issued before.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::QuizError;

/// Seven days, the lifetime players have always had
pub const DEFAULT_TOKEN_EXPIRY_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Payload stored in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stored user id
    pub sub: String,
    pub username: String,
    /// Must equal the user's current token version
    pub version: u32,
    pub iat: u64,
    pub exp: u64,
}

/// Input for creating a new token
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub username: String,
    pub token_version: u32,
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }

    /// Claims of a valid token, or an `Unauthorized` error
    pub fn into_claims(self) -> Result<Claims, QuizError> {
        match self.claims {
            Some(claims) if self.valid => Ok(claims),
            _ => Err(QuizError::Unauthorized(
                self.error.unwrap_or_else(|| "Invalid token".into()),
            )),
        }
    }
}

/// Token signer and verifier
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Returns an error if the secret is empty or shorter than 32 bytes
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, QuizError> {
        if secret.is_empty() {
            return Err(QuizError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(QuizError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        if expiry_seconds == 0 {
            return Err(QuizError::Config("JWT_EXPIRY_SECONDS must be positive".into()));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Fixed secret for dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: DEFAULT_TOKEN_EXPIRY_SECONDS,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    pub fn generate_token(&self, input: TokenInput) -> Result<String, QuizError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| QuizError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: input.user_id,
            username: input.username,
            version: input.token_version,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| QuizError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify signature and expiry. Does not check the token version.
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(token_data) => TokenValidationResult::valid(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenValidationResult::invalid(error_msg)
            }
        }
    }
}

/// Extract token from an Authorization header.
/// Accepts "Bearer <token>" and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}
