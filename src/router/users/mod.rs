//! Users-related HTTP API.
mod get;

use axum::routing::get;
use axum::{Router, middleware};

use crate::AppState;
use crate::middleware::authenticate;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // `GET /users/@me` goes to `get`. Authorization required.
        .route("/@me", get(get::handler))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}
