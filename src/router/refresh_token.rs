//! Get a new token pair with a refresh token.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::router::{Success, TOKEN_TYPE, Valid};
use crate::token::{ACCESS_TOKEN_TTL, TokenType};
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, message = "Refresh token is required."))]
    pub refresh_token: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Nothing is revoked: the previous refresh token stays usable until it
/// expires.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Success<Response>>> {
    let now = state.clock.now();
    let identity = state
        .validator
        .validate(&body.refresh_token, Some(TokenType::Refresh), now)
        .await
        .map_err(ServerError::Refresh)?;

    let pair = state.issuer.issue_token_pair(&identity, now)?;
    tracing::info!(user_id = identity.id, "token pair refreshed");

    Ok(Success::json(Response {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: TOKEN_TYPE.to_owned(),
        expires_in: ACCESS_TOKEN_TTL,
    }))
}
