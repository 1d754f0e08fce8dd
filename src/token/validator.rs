//! Check tokens and resolve them back to a user.

use std::sync::Arc;

use super::{Claims, TokenCodec, TokenError, TokenType};
use crate::user::{Identity, UserRepository};

/// Decode a token, enforce type and expiry, then look its subject up.
#[derive(Clone)]
pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    users: Arc<dyn UserRepository>,
}

impl TokenValidator {
    /// Create a new [`TokenValidator`].
    pub fn new(codec: Arc<TokenCodec>, users: Arc<dyn UserRepository>) -> Self {
        Self { codec, users }
    }

    /// Stateless part of the validation: signature, type, then expiry.
    ///
    /// `expected` set to `None` accepts both token types.
    pub fn verify(
        &self,
        token: &str,
        expected: Option<TokenType>,
        now: u64,
    ) -> Result<Claims, TokenError> {
        let claims = self.codec.decode(token)?;

        if let Some(expected) = expected {
            if claims.r#type != expected {
                return Err(TokenError::WrongType {
                    expected,
                    found: claims.r#type,
                });
            }
        }

        if claims.is_expired(now) {
            return Err(TokenError::Expired { exp: claims.exp });
        }

        Ok(claims)
    }

    /// Verify `token` and resolve its subject.
    ///
    /// The `email` claim is never used here: a user may have changed it since
    /// the token was issued.
    pub async fn validate(
        &self,
        token: &str,
        expected: Option<TokenType>,
        now: u64,
    ) -> Result<Identity, TokenError> {
        let claims = self.verify(token, expected, now)?;

        match self.users.find_by_id(claims.sub).await {
            Ok(Some(user)) => Ok(user.into()),
            Ok(None) => Err(TokenError::UserNotFound(claims.sub)),
            Err(err) => Err(TokenError::LookupFailed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{CodecError, Secret, TokenIssuer};
    use crate::tests::UnavailableRepository;
    use crate::user::{MemoryUserRepository, NewUser, RepositoryError};

    struct Setup {
        issuer: TokenIssuer,
        validator: TokenValidator,
        users: Arc<MemoryUserRepository>,
        identity: Identity,
    }

    async fn setup() -> Setup {
        let codec = Arc::new(TokenCodec::new(&Secret::new("validator-secret")));
        let users = Arc::new(MemoryUserRepository::default());
        let user = users
            .insert(NewUser {
                name: "Test User".into(),
                email: "a@b.com".into(),
                password_hash: String::default(),
            })
            .await
            .unwrap();

        Setup {
            issuer: TokenIssuer::new(Arc::clone(&codec), "http://localhost/"),
            validator: TokenValidator::new(codec, users.clone()),
            users,
            identity: user.into(),
        }
    }

    #[tokio::test]
    async fn test_access_token_lifetime() {
        let s = setup().await;
        let pair = s.issuer.issue_token_pair(&s.identity, 1000).unwrap();

        let identity = s
            .validator
            .validate(&pair.access_token, Some(TokenType::Access), 1200)
            .await
            .unwrap();
        assert_eq!(identity.id, 1);
        assert_eq!(identity.email, "a@b.com");

        for now in [1000, 1299] {
            assert!(
                s.validator
                    .validate(&pair.access_token, Some(TokenType::Access), now)
                    .await
                    .is_ok()
            );
        }

        for now in [1300, 1301, 10_000] {
            let err = s
                .validator
                .validate(&pair.access_token, Some(TokenType::Access), now)
                .await
                .unwrap_err();
            assert!(matches!(err, TokenError::Expired { exp: 1300 }));
        }
    }

    #[tokio::test]
    async fn test_refresh_token_lifetime() {
        let s = setup().await;
        let token = s.issuer.issue_refresh_token(&s.identity, 1000).unwrap();

        assert!(
            s.validator
                .validate(&token, Some(TokenType::Refresh), 1000 + 604_799)
                .await
                .is_ok()
        );
        assert!(matches!(
            s.validator
                .validate(&token, Some(TokenType::Refresh), 1000 + 604_800)
                .await,
            Err(TokenError::Expired { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_type_is_rejected() {
        let s = setup().await;
        let pair = s.issuer.issue_token_pair(&s.identity, 1000).unwrap();

        assert!(matches!(
            s.validator
                .validate(&pair.access_token, Some(TokenType::Refresh), 1000)
                .await,
            Err(TokenError::WrongType {
                expected: TokenType::Refresh,
                found: TokenType::Access
            })
        ));
        assert!(matches!(
            s.validator
                .validate(&pair.refresh_token, Some(TokenType::Access), 1000)
                .await,
            Err(TokenError::WrongType {
                expected: TokenType::Access,
                found: TokenType::Refresh
            })
        ));
    }

    #[tokio::test]
    async fn test_type_checked_before_expiry() {
        let s = setup().await;
        let token = s.issuer.issue_access_token(&s.identity, 1000).unwrap();

        assert!(matches!(
            s.validator.verify(&token, Some(TokenType::Refresh), 5000),
            Err(TokenError::WrongType { .. })
        ));
    }

    #[tokio::test]
    async fn test_any_type_accepted_without_expectation() {
        let s = setup().await;
        let pair = s.issuer.issue_token_pair(&s.identity, 1000).unwrap();

        for token in [pair.access_token, pair.refresh_token] {
            assert!(s.validator.validate(&token, None, 1100).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let s = setup().await;
        let ghost = Identity {
            id: 42,
            ..s.identity.clone()
        };
        let token = s.issuer.issue_access_token(&ghost, 1000).unwrap();

        assert!(matches!(
            s.validator
                .validate(&token, Some(TokenType::Access), 1000)
                .await,
            Err(TokenError::UserNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_subject_is_authoritative_over_email() {
        let s = setup().await;
        let stale = Identity {
            email: "old@b.com".into(),
            ..s.identity.clone()
        };
        let token = s.issuer.issue_access_token(&stale, 1000).unwrap();

        let identity = s
            .validator
            .validate(&token, Some(TokenType::Access), 1000)
            .await
            .unwrap();
        assert_eq!(identity.id, s.identity.id);
        assert_eq!(identity.email, "a@b.com");
        assert_eq!(
            s.users.find_by_id(identity.id).await.unwrap().unwrap().email,
            identity.email
        );
    }

    #[tokio::test]
    async fn test_foreign_signature() {
        let s = setup().await;
        let foreign = TokenIssuer::new(
            Arc::new(TokenCodec::new(&Secret::new("someone-else"))),
            "http://localhost/",
        );
        let token = foreign.issue_access_token(&s.identity, 1000).unwrap();

        assert!(matches!(
            s.validator
                .validate(&token, Some(TokenType::Access), 1000)
                .await,
            Err(TokenError::Invalid(CodecError::SignatureInvalid))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_user_not_found() {
        let s = setup().await;
        let token = s.issuer.issue_access_token(&s.identity, 1000).unwrap();
        let codec = Arc::new(TokenCodec::new(&Secret::new("validator-secret")));
        let validator = TokenValidator::new(codec, Arc::new(UnavailableRepository));

        let err = validator
            .validate(&token, Some(TokenType::Access), 1000)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::LookupFailed(RepositoryError::Sql(_))
        ));
        assert_eq!(err.reason(), "lookup_failed");
    }
}
