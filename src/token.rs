//! Manage json web tokens.
//!
//! Access tokens authorize calls to protected routes for five minutes,
//! refresh tokens can only be traded for a new pair during seven days.
//! Nothing is stored server-side: a token is valid as long as its signature
//! matches, it is not expired and its type is the one expected.

mod codec;
mod issuer;
mod validator;

pub use codec::{CodecError, Secret, TokenCodec};
pub use issuer::{TokenIssuer, TokenPair};
pub use validator::TokenValidator;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Lifetime of an access token, in seconds.
pub const ACCESS_TOKEN_TTL: u64 = 5 * 60;
/// Lifetime of a refresh token, in seconds.
pub const REFRESH_TOKEN_TTL: u64 = 7 * 24 * 60 * 60;

/// Purpose of a token. Set at issuance and checked on every validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }

    /// Lifetime of tokens of this type, in seconds.
    pub fn ttl(&self) -> u64 {
        match self {
            TokenType::Access => ACCESS_TOKEN_TTL,
            TokenType::Refresh => REFRESH_TOKEN_TTL,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the instance that issued the JWT.
    pub iss: String,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// User ID. The only claim trusted to resolve a user.
    pub sub: UserId,
    /// Email of the user at issuance time. Informational.
    pub email: String,
    pub r#type: TokenType,
}

impl Claims {
    /// Whether the token must be rejected at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.exp
    }
}

/// Reasons a token is refused.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token not provided")]
    Missing,
    #[error(transparent)]
    Invalid(#[from] CodecError),
    #[error("invalid token type, expected {expected} got {found}")]
    WrongType { expected: TokenType, found: TokenType },
    #[error("token expired at {exp}")]
    Expired { exp: u64 },
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("user lookup failed")]
    LookupFailed(#[source] crate::user::RepositoryError),
}

impl TokenError {
    /// Short stable label, used for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Missing => "missing",
            TokenError::Invalid(CodecError::SignatureInvalid) => {
                "invalid_signature"
            },
            TokenError::Invalid(_) => "malformed",
            TokenError::WrongType { .. } => "wrong_type",
            TokenError::Expired { .. } => "expired",
            TokenError::UserNotFound(_) => "user_not_found",
            TokenError::LookupFailed(_) => "lookup_failed",
        }
    }
}
