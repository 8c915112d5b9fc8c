//! Route guard: gates every path under the dashboard prefix on a readable
//! session.
//!
//! The decision is derived fresh from the session cookie on each request and
//! never cached: a session can be cleared or expire between navigations.

use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::services::session::Session;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authorized,
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    protected_prefix: String,
    login_path: String,
}

impl RouteGuard {
    #[must_use]
    pub fn new(protected_prefix: &str, login_path: &str) -> Self {
        Self { protected_prefix: protected_prefix.to_owned(), login_path: login_path.to_owned() }
    }

    /// True for the prefix itself and everything below it, but not for
    /// sibling paths that merely share its characters (`/dashboardx`).
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        path.strip_prefix(&self.protected_prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    #[must_use]
    pub fn decide(&self, session: Option<&Session>) -> Access {
        match session {
            Some(session) if session.is_complete() => Access::Authorized,
            _ => Access::Unauthorized,
        }
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    fn redirect(&self) -> Redirect {
        Redirect::temporary(&self.login_path)
    }
}

/// Middleware: redirect unauthenticated requests for protected paths to the
/// login page; otherwise hand the decoded session to the handler through
/// request extensions.
pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if !state.guard.is_protected(request.uri().path()) {
        return next.run(request).await;
    }

    let jar = state.sessions.jar(request.headers());
    let session = state.sessions.read(&jar);
    match (state.guard.decide(session.as_ref()), session) {
        (Access::Authorized, Some(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        _ => {
            tracing::debug!(path = %request.uri().path(), "unauthenticated request redirected to login");
            // Expires whatever session cookie the browser sent: revoked or
            // expired ones via the signed jar, tampered ones via the raw jar.
            let unverified = state.sessions.discard_unverified(request.headers(), &jar);
            (unverified, state.sessions.clear(jar), state.guard.redirect()).into_response()
        }
    }
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Session of the current request. Use as a handler parameter to require
/// authentication. Taken from the guard when it ran, read from the cookie
/// otherwise.
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Self(session.clone()));
        }

        let app_state = AppState::from_ref(state);
        let jar = app_state.sessions.jar(&parts.headers);
        app_state
            .sessions
            .read(&jar)
            .map(Self)
            .ok_or_else(|| app_state.guard.redirect().into_response())
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
