//! Middlewares for routes.
//!
//! [`authenticate`] is the only way for a handler to obtain an [`Identity`]:
//! it extracts a token, validates it as an access token and stores the
//! resolved user as [`AuthenticatedUser`] in the request extensions.

use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::token::{TokenError, TokenType};
use crate::user::Identity;

const BODY_LIMIT: usize = 30_000;
const BEARER: &str = "bearer";

/// Identity attached to a request once its access token has been validated.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthenticatedUser(pub Identity);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ServerError::Token(TokenError::Missing))
    }
}

#[derive(Debug, Deserialize)]
struct TokenField {
    token: Option<String>,
}

/// Read a bearer token from the `Authorization` header.
///
/// The scheme is matched case-insensitively. Any other scheme is ignored.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case(BEARER) && !token.is_empty())
        .then(|| token.to_owned())
}

fn token_field(field: TokenField) -> Option<String> {
    field.token.filter(|token| !token.is_empty())
}

/// Find a token on the header, then on the `token` query parameter, then on
/// the `token` field of a JSON body. The body is given back untouched.
async fn extract_token(req: Request) -> Result<(Option<String>, Request)> {
    if let Some(token) = bearer_token(req.headers()) {
        return Ok((Some(token), req));
    }

    if let Some(token) = Query::<TokenField>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(field)| token_field(field))
    {
        return Ok((Some(token), req));
    }

    let (parts, body) = req.into_parts();
    let body_bytes = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|err| {
            tracing::debug!(error = %err, limit = BODY_LIMIT, "body not searched for a token");
            ServerError::Token(TokenError::Missing)
        })?;
    let token = serde_json::from_slice::<TokenField>(&body_bytes)
        .ok()
        .and_then(token_field);

    let req = Request::from_parts(parts, axum::body::Body::from(body_bytes));
    Ok((token, req))
}

/// Middleware to handle access tokens.
pub async fn authenticate(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let (token, mut req) = extract_token(req).await?;
    let token = token.ok_or(TokenError::Missing)?;

    let identity = state
        .validator
        .validate(&token, Some(TokenType::Access), state.clock.now())
        .await?;

    tracing::debug!(user_id = identity.id, "request authenticated");

    req.extensions_mut().insert(AuthenticatedUser(identity));
    Ok(next.run(req).await)
}
