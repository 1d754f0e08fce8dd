//! Error handler for gatekeeper.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::ValidationErrors;

use crate::crypto::CryptoError;
use crate::token::{CodecError, TokenError};
use crate::user::{RepositoryError, UserError};

pub type Result<T> = std::result::Result<T, ServerError>;

const INVALID_TOKEN: &str = "Invalid or expired token.";
const MISSING_TOKEN: &str = "Token not provided.";

/// Enum representing server-side errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("authentication failed: {0}")]
    Token(#[from] TokenError),

    #[error("refresh token rejected: {0}")]
    Refresh(#[source] TokenError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("route not found")]
    NotFound,

    #[error("user store failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("token could not be issued: {0}")]
    Codec(#[from] CodecError),
}

impl From<UserError> for ServerError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Repository(err) => ServerError::Repository(err),
            UserError::Crypto(err) => ServerError::Crypto(err),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ResponseError {
    /// Create a new [`ResponseError`] with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }
}

fn parse_validation_errors(
    errors: &ValidationErrors,
) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .iter()
        .map(|(field, issues)| {
            (
                field.to_string(),
                issues.iter().map(|issue| issue.to_string()).collect(),
            )
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ResponseError::new("Validation error.").errors(errors),
            ),

            ServerError::Axum(rejection) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ResponseError::new(rejection.body_text()),
            ),

            ServerError::Token(err) => {
                tracing::debug!(reason = err.reason(), "request rejected");
                metrics::counter!("auth_rejections_total", "reason" => err.reason())
                    .increment(1);

                let message = match err {
                    TokenError::Missing => MISSING_TOKEN,
                    _ => INVALID_TOKEN,
                };
                (StatusCode::UNAUTHORIZED, ResponseError::new(message))
            },

            ServerError::Refresh(err) => {
                tracing::debug!(reason = err.reason(), "refresh rejected");
                metrics::counter!("auth_rejections_total", "reason" => err.reason())
                    .increment(1);

                (
                    StatusCode::UNAUTHORIZED,
                    ResponseError::new("Invalid or expired refresh token."),
                )
            },

            ServerError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ResponseError::new("Invalid credentials."),
            ),

            ServerError::NotFound => (
                StatusCode::NOT_FOUND,
                ResponseError::new("Not found."),
            ),

            ServerError::Repository(_)
            | ServerError::Crypto(_)
            | ServerError::Codec(_) => {
                tracing::error!(error = %self, "server returned 500 status");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ResponseError::new("Internal server error."),
                )
            },
        };

        (status, Json(body)).into_response()
    }
}
