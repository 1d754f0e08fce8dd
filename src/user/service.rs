//! Credentials check and start-up seeding.

use crate::config::SeedUser;
use crate::crypto::{CryptoError, PasswordManager};
use crate::user::{Identity, NewUser, RepositoryError, UserRepository};

/// Errors raised while checking credentials or seeding users.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Resolve a user from an email and a plaintext password.
///
/// Returns `None` both for an unknown email and a wrong password.
pub async fn verify_credentials(
    users: &dyn UserRepository,
    pwd: &PasswordManager,
    email: &str,
    password: &str,
) -> Result<Option<Identity>, UserError> {
    let Some(user) = users.find_by_email(email).await? else {
        return Ok(None);
    };

    match pwd.verify_password(password, &user.password_hash) {
        Ok(()) => Ok(Some(user.into())),
        Err(CryptoError::PasswordMismatch) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Create every seed user whose email is not taken yet.
///
/// Returns the number of users created.
pub async fn seed(
    users: &dyn UserRepository,
    pwd: &PasswordManager,
    seeds: &[SeedUser],
) -> Result<usize, UserError> {
    let mut created = 0;

    for seed in seeds {
        if users.find_by_email(&seed.email).await?.is_some() {
            tracing::debug!(email = %seed.email, "seed user already exists");
            continue;
        }

        let user = users
            .insert(NewUser {
                name: seed.name.clone(),
                email: seed.email.clone(),
                password_hash: pwd.hash_password(&seed.password)?,
            })
            .await?;

        tracing::info!(user_id = user.id, "seed user created");
        created += 1;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::tests::password_manager;
    use crate::user::MemoryUserRepository;

    fn seeds() -> Vec<SeedUser> {
        vec![SeedUser {
            name: "Test User".into(),
            email: "test@example.com".into(),
            password: "password123".into(),
        }]
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let users = MemoryUserRepository::default();
        let pwd = password_manager();
        seed(&users, &pwd, &seeds()).await.unwrap();

        let identity =
            verify_credentials(&users, &pwd, "test@example.com", "password123")
                .await
                .unwrap()
                .unwrap();
        assert_eq!(identity.id, 1);
        assert_eq!(identity.name, "Test User");

        assert!(
            verify_credentials(&users, &pwd, "test@example.com", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            verify_credentials(&users, &pwd, "nobody@example.com", "password123")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let users = MemoryUserRepository::default();
        let pwd = password_manager();

        assert_eq!(seed(&users, &pwd, &seeds()).await.unwrap(), 1);
        assert_eq!(seed(&users, &pwd, &seeds()).await.unwrap(), 0);
        assert!(users.find_by_id(2).await.unwrap().is_none());
    }
}
