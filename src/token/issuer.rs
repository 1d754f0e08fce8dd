//! Build and sign access and refresh tokens.

use std::sync::Arc;

use serde::Serialize;

use super::{Claims, CodecError, TokenCodec, TokenType};
use crate::user::Identity;

/// Access and refresh tokens issued together.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mint tokens for a resolved [`Identity`].
#[derive(Clone, Debug)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    issuer: String,
}

impl TokenIssuer {
    /// Create a new [`TokenIssuer`]. `issuer` lands in the `iss` claim.
    pub fn new(codec: Arc<TokenCodec>, issuer: impl Into<String>) -> Self {
        Self {
            codec,
            issuer: issuer.into(),
        }
    }

    fn issue(
        &self,
        identity: &Identity,
        r#type: TokenType,
        now: u64,
    ) -> Result<String, CodecError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            iat: now,
            exp: now + r#type.ttl(),
            sub: identity.id,
            email: identity.email.clone(),
            r#type,
        };

        let token = self.codec.encode(&claims)?;
        metrics::counter!("auth_tokens_issued_total", "type" => r#type.as_str())
            .increment(1);

        Ok(token)
    }

    /// Short-lived token for protected routes.
    pub fn issue_access_token(
        &self,
        identity: &Identity,
        now: u64,
    ) -> Result<String, CodecError> {
        self.issue(identity, TokenType::Access, now)
    }

    /// Long-lived token only accepted by the refresh route.
    pub fn issue_refresh_token(
        &self,
        identity: &Identity,
        now: u64,
    ) -> Result<String, CodecError> {
        self.issue(identity, TokenType::Refresh, now)
    }

    /// Both tokens, sharing the same `iat`.
    pub fn issue_token_pair(
        &self,
        identity: &Identity,
        now: u64,
    ) -> Result<TokenPair, CodecError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(identity, now)?,
            refresh_token: self.issue_refresh_token(identity, now)?,
        })
    }
}
