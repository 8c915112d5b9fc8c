//! Auth routes: login, sign-up, logout and explicit token refresh.

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use serde_json::json;

use crate::services::credentials::{self, CredentialError, LoginForm, Refreshed, SignUpForm, TRANSPORT_FAILED};
use crate::state::AppState;

const LOGIN_TEMPLATE: &str = include_str!("../../templates/login.html");
const SIGNUP_TEMPLATE: &str = include_str!("../../templates/signup.html");

const SESSION_FAILED: &str = "Could not start a session. Please try again.";
const BUSY: &str = "A request is already in progress.";

#[must_use]
pub fn render_login_page(login_path: &str) -> String {
    LOGIN_TEMPLATE.replace("{{LOGIN_PATH}}", login_path)
}

#[must_use]
pub fn render_signup_page(login_path: &str) -> String {
    SIGNUP_TEMPLATE.replace("{{LOGIN_PATH}}", login_path)
}

pub(crate) fn credential_error_to_status(err: &CredentialError) -> StatusCode {
    match err {
        CredentialError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CredentialError::Rejected(_) => StatusCode::UNAUTHORIZED,
        CredentialError::Transport | CredentialError::InvalidResponse => StatusCode::BAD_GATEWAY,
        CredentialError::Busy => StatusCode::CONFLICT,
    }
}

/// Form-state body: field errors under `error`, anything else under `message`.
pub(crate) fn credential_error_body(err: &CredentialError) -> serde_json::Value {
    match err {
        CredentialError::Validation(errors) => json!({ "error": errors }),
        CredentialError::Rejected(message) => json!({ "message": message }),
        CredentialError::Transport | CredentialError::InvalidResponse => json!({ "message": TRANSPORT_FAILED }),
        CredentialError::Busy => json!({ "message": BUSY }),
    }
}

fn credential_error_response(err: &CredentialError) -> Response {
    (credential_error_to_status(err), Json(credential_error_body(err))).into_response()
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /auth/login`: login form, or straight to the dashboard when a
/// session is already present.
pub async fn login_page(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    if state.sessions.read(&jar).is_some() {
        return Redirect::temporary(&state.config.dashboard_prefix).into_response();
    }
    Html(render_login_page(state.guard.login_path())).into_response()
}

/// `POST /auth/login`: exchange credentials, set the session cookie and go
/// to the dashboard.
pub async fn login(State(state): State<AppState>, jar: SignedCookieJar, Form(form): Form<LoginForm>) -> Response {
    let session = match credentials::sign_in(state.api.as_ref(), &state.inflight, &form).await {
        Ok(session) => session,
        Err(e) => return credential_error_response(&e),
    };

    // Signing in over an existing session retires the old one.
    match state.sessions.create(state.sessions.clear(jar), &session) {
        Ok(jar) => (jar, Redirect::to(&state.config.dashboard_prefix)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": SESSION_FAILED }))).into_response()
        }
    }
}

/// `GET /auth/signup`: registration form.
pub async fn signup_page(State(state): State<AppState>) -> Html<String> {
    Html(render_signup_page(state.guard.login_path()))
}

/// `POST /auth/signup`: register, then send the user to log in.
pub async fn signup(State(state): State<AppState>, Form(form): Form<SignUpForm>) -> Response {
    match credentials::sign_up(state.api.as_ref(), &state.inflight, &form).await {
        Ok(()) => Redirect::to(state.guard.login_path()).into_response(),
        Err(e) => credential_error_response(&e),
    }
}

/// `POST /auth/logout`: clear the session and return to the login page.
pub async fn logout(State(state): State<AppState>, jar: SignedCookieJar) -> impl IntoResponse {
    if let Some(session) = state.sessions.read(&jar) {
        tracing::info!(sid = %session.sid, "signed out");
    }
    (state.sessions.clear(jar), Redirect::to(state.guard.login_path()))
}

/// `POST /auth/refresh`: rotate the token pair of the current session.
pub async fn refresh(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let Some(session) = state.sessions.read(&jar) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "accessToken": null }))).into_response();
    };

    let (jar, outcome) = credentials::refresh(state.api.as_ref(), &state.sessions, &state.inflight, jar, &session).await;
    match outcome {
        Refreshed::Rotated(updated) => (jar, Json(json!({ "accessToken": updated.access_token }))).into_response(),
        Refreshed::Busy => (StatusCode::CONFLICT, jar, Json(json!({ "message": BUSY }))).into_response(),
        Refreshed::Failed => (StatusCode::UNAUTHORIZED, jar, Json(json!({ "accessToken": null }))).into_response(),
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
