//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Public auth pages live under `/auth`; everything below the dashboard
//! prefix sits behind [`guard::require_session`], which runs on every request
//! so that unknown paths under the prefix are gated too.

pub mod auth;
pub mod dashboard;
pub mod guard;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Redirect;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let prefix = state.config.dashboard_prefix.clone();
    let login = state.config.login_path.clone();

    Router::new()
        .route("/", get(redirect_root))
        .route("/healthz", get(healthz))
        .route(&login, get(auth::login_page).post(auth::login))
        .route("/auth/signup", get(auth::signup_page).post(auth::signup))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .route(&prefix, get(dashboard::index))
        .route(&format!("{prefix}/api/me"), get(dashboard::me))
        .route(&format!("{prefix}/api/{{entity}}"), get(dashboard::list).post(dashboard::create))
        .route(&format!("{prefix}/api/{{entity}}/{{id}}"), put(dashboard::update).delete(dashboard::remove))
        .layer(middleware::from_fn_with_state(state.clone(), guard::require_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn redirect_root(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.config.dashboard_prefix)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
