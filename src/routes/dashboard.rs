//! Dashboard routes: landing page, current user and the CRUD pass-through to
//! the library API.
//!
//! DESIGN
//! ======
//! Every handler takes an [`AuthSession`]; the route guard has already
//! admitted the request. CRUD calls carry the session's access token. When
//! the upstream answers 401 the tokens are rotated once and the call is
//! retried once with the new access token. A failed rotation clears the
//! session and the caller gets 401.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use serde_json::json;

use super::guard::AuthSession;
use crate::api::types::{ApiReply, Entity, ResourceCall};
use crate::services::credentials::{self, Refreshed, TRANSPORT_FAILED};
use crate::services::session::{Session, SessionUser};
use crate::state::AppState;

const DASHBOARD_TEMPLATE: &str = include_str!("../../templates/dashboard.html");

const MAX_ID_LEN: usize = 64;

// =============================================================================
// RENDERING
// =============================================================================

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[must_use]
pub fn render_dashboard(user: &SessionUser, prefix: &str) -> String {
    let entities = Entity::ALL
        .iter()
        .map(|e| format!(r#"<li><a href="{prefix}/api/{}">{}</a></li>"#, e.slug(), e.label()))
        .collect::<Vec<_>>()
        .join("\n");
    DASHBOARD_TEMPLATE
        .replace("{{NAME}}", &escape_html(&user.name))
        .replace("{{ROLE}}", user.role.as_str())
        .replace("{{ENTITIES}}", &entities)
}

/// Record ids end up in upstream URL paths.
pub(crate) fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn reply_response(reply: ApiReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    if status == StatusCode::NO_CONTENT || reply.body.is_null() {
        return status.into_response();
    }
    (status, Json(reply.body)).into_response()
}

// =============================================================================
// FORWARDING
// =============================================================================

async fn forward(state: &AppState, jar: SignedCookieJar, session: &Session, slug: &str, call: ResourceCall) -> Response {
    let Some(entity) = Entity::from_slug(slug) else {
        return message(StatusCode::NOT_FOUND, &format!("Unknown collection: {slug}"));
    };

    let reply = match state.api.resource(entity, &call, &session.access_token).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(entity = entity.slug(), error = %e, "library API call failed");
            return message(StatusCode::BAD_GATEWAY, TRANSPORT_FAILED);
        }
    };
    if !reply.is_unauthorized() {
        return reply_response(reply);
    }

    tracing::info!(sid = %session.sid, entity = entity.slug(), "access token rejected; rotating");
    let (jar, outcome) = credentials::refresh(state.api.as_ref(), &state.sessions, &state.inflight, jar, session).await;
    let updated = match outcome {
        Refreshed::Rotated(updated) => updated,
        Refreshed::Busy => {
            return (jar, message(StatusCode::CONFLICT, "Session refresh in progress. Please retry.")).into_response();
        }
        Refreshed::Failed => {
            return (jar, message(StatusCode::UNAUTHORIZED, "Session expired. Please sign in again.")).into_response();
        }
    };

    match state.api.resource(entity, &call, &updated.access_token).await {
        Ok(reply) => (jar, reply_response(reply)).into_response(),
        Err(e) => {
            tracing::error!(entity = entity.slug(), error = %e, "library API retry failed");
            (jar, message(StatusCode::BAD_GATEWAY, TRANSPORT_FAILED)).into_response()
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /dashboard`: landing page.
pub async fn index(State(state): State<AppState>, AuthSession(session): AuthSession) -> Html<String> {
    Html(render_dashboard(&session.user, &state.config.dashboard_prefix))
}

/// `GET /dashboard/api/me`: the signed-in user. Tokens stay server-side.
pub async fn me(AuthSession(session): AuthSession) -> Json<SessionUser> {
    Json(session.user)
}

/// `GET /dashboard/api/{entity}`
pub async fn list(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    AuthSession(session): AuthSession,
    Path(entity): Path<String>,
) -> Response {
    forward(&state, jar, &session, &entity, ResourceCall::List).await
}

/// `POST /dashboard/api/{entity}`
pub async fn create(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    AuthSession(session): AuthSession,
    Path(entity): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    forward(&state, jar, &session, &entity, ResourceCall::Create(body)).await
}

/// `PUT /dashboard/api/{entity}/{id}`
pub async fn update(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    AuthSession(session): AuthSession,
    Path((entity, id)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if !valid_id(&id) {
        return message(StatusCode::BAD_REQUEST, "Invalid record id.");
    }
    forward(&state, jar, &session, &entity, ResourceCall::Update { id, body }).await
}

/// `DELETE /dashboard/api/{entity}/{id}`
pub async fn remove(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    AuthSession(session): AuthSession,
    Path((entity, id)): Path<(String, String)>,
) -> Response {
    if !valid_id(&id) {
        return message(StatusCode::BAD_REQUEST, "Invalid record id.");
    }
    forward(&state, jar, &session, &entity, ResourceCall::Delete { id }).await
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
