//! Gatekeeper issues short-lived access tokens and long-lived refresh tokens
//! and guards protected routes behind them.

#![forbid(unsafe_code)]
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
mod middleware;
mod router;
pub mod telemetry;
pub mod token;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use clock::{Clock, SystemClock};
use config::Configuration;
use crypto::PasswordManager;
pub use error::ServerError;
use token::{Secret, TokenCodec, TokenIssuer, TokenValidator};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use user::{MemoryUserRepository, PgUserRepository, UserRepository};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    authorization: Option<&str>,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(authorization) = authorization {
        request = request.header(header::AUTHORIZATION, authorization);
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub users: Arc<dyn UserRepository>,
    pub pwd: Arc<PasswordManager>,
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build the state around a single signing secret shared by the issuer
    /// and the validator.
    pub fn new(
        config: Arc<Configuration>,
        secret: &Secret,
        users: Arc<dyn UserRepository>,
        pwd: Arc<PasswordManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(secret));

        Self {
            issuer: TokenIssuer::new(Arc::clone(&codec), config.url.clone()),
            validator: TokenValidator::new(codec, Arc::clone(&users)),
            config,
            users,
            pwd,
            clock,
        }
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let auth_router = Router::new()
        // `POST /auth/login` goes to `login`.
        .route("/login", post(router::login::handler))
        // `POST /auth/refresh` goes to `refresh_token`.
        .route("/refresh", post(router::refresh_token::handler));

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .nest("/auth", auth_router)
        .nest("/users", router::users::router(state.clone()))
        .fallback(|| async { ServerError::NotFound })
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let path = std::env::var("CONFIG_PATH").unwrap_or_default();
    let config = Configuration::default().path(path.into()).read()?;

    // without a secret no token can be trusted.
    let secret = config.secret()?;

    let pwd = Arc::new(PasswordManager::new(config.argon2.clone())?);

    let users: Arc<dyn UserRepository> = match config.postgres {
        Some(ref config) => Arc::new(
            PgUserRepository::connect(
                &config.address,
                config
                    .username
                    .as_deref()
                    .unwrap_or(user::DEFAULT_CREDENTIALS),
                config
                    .password
                    .as_deref()
                    .unwrap_or(user::DEFAULT_CREDENTIALS),
                config
                    .database
                    .as_deref()
                    .unwrap_or(user::DEFAULT_DATABASE_NAME),
                config.pool_size.unwrap_or(user::DEFAULT_POOL_SIZE),
            )
            .await?,
        ),
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, users are kept in memory"
            );
            Arc::new(MemoryUserRepository::default())
        },
    };

    let created = user::seed(users.as_ref(), &pwd, &config.seed).await?;
    if created > 0 {
        tracing::info!(created, "seed users inserted");
    }

    Ok(AppState::new(
        config,
        &secret,
        users,
        pwd,
        Arc::new(SystemClock),
    ))
}
