mod api;
mod config;
mod inflight;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    if config.session_secret.is_none() {
        tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
    }

    let api = api::RestClient::new(config.api_url.clone(), config.timeouts).expect("http client init failed");
    tracing::info!(api_url = %config.api_url, "library API client initialized");

    let port = config.port;
    let state = state::AppState::new(config, Arc::new(api));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "library-admin listening");
    axum::serve(listener, app).await.expect("server failed");
}
