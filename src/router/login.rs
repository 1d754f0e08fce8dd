//! Exchange credentials for a token pair.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::router::{Success, TOKEN_TYPE, Valid};
use crate::token::ACCESS_TOKEN_TTL;
use crate::user::{Identity, verify_credentials};
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: Identity,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Success<Response>>> {
    let Some(identity) = verify_credentials(
        state.users.as_ref(),
        &state.pwd,
        &body.email,
        &body.password,
    )
    .await?
    else {
        tracing::info!("login refused");
        return Err(ServerError::InvalidCredentials);
    };

    let pair = state.issuer.issue_token_pair(&identity, state.clock.now())?;
    tracing::info!(user_id = identity.id, "user logged in");

    Ok(Success::json(Response {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: TOKEN_TYPE.to_owned(),
        expires_in: ACCESS_TOKEN_TTL,
        user: identity,
    }))
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;

    use crate::tests::{NOW, state_at};
    use crate::token::{Claims, TokenType};
    use crate::*;

    pub(crate) async fn login(
        app: axum::Router,
        email: &str,
        password: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = make_request(
            app,
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": email, "password": password }).to_string(),
        )
        .await;

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_login_handler() {
        let state = state_at(NOW).await;
        let (status, body) =
            login(app(state.clone()), "test@example.com", "password123").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["token_type"], "Bearer");
        assert_eq!(body["data"]["expires_in"], 300);
        assert_eq!(body["data"]["user"]["id"], 1);
        assert_eq!(body["data"]["user"]["name"], "Test User");
        assert!(body["data"]["user"].get("password").is_none());
        assert!(body["data"]["user"].get("password_hash").is_none());

        let access: Claims = state
            .validator
            .verify(
                body["data"]["access_token"].as_str().unwrap(),
                Some(TokenType::Access),
                NOW,
            )
            .unwrap();
        assert_eq!(access.iat, NOW);
        assert_eq!(access.exp, NOW + 300);
        assert_eq!(access.iss, state.config.url);
        assert!(
            state
                .validator
                .verify(
                    body["data"]["refresh_token"].as_str().unwrap(),
                    Some(TokenType::Refresh),
                    NOW,
                )
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let state = state_at(NOW).await;

        for (email, password) in [
            ("test@example.com", "wrong-password"),
            ("nobody@example.com", "password123"),
        ] {
            let (status, body) = login(app(state.clone()), email, password).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(
                body,
                json!({ "success": false, "message": "Invalid credentials." })
            );
        }
    }

    #[tokio::test]
    async fn test_login_validation() {
        let state = state_at(NOW).await;
        let (status, body) = login(app(state), "not-an-email", "").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert!(body["errors"]["email"].is_array());
        assert!(body["errors"]["password"].is_array());
    }
}
