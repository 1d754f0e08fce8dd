use axum::routing::get;
use gatekeeper::{app, initialize_state, telemetry};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let metrics_handle = match telemetry::setup_metrics_recorder() {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!(error = %err, "prometheus recorder cannot be installed");
            std::process::exit(1);
        },
    };

    let state = match initialize_state().await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "server cannot start");
            std::process::exit(1);
        },
    };
    let address = state.config.address.clone();

    let app = app(state).route(
        "/metrics",
        get(move || std::future::ready(metrics_handle.render())),
    );

    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%address, error = %err, "cannot bind address");
            std::process::exit(1);
        },
    };
    tracing::info!(%address, "server started");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server stopped unexpectedly");
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}
