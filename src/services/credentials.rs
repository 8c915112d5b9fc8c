//! Credential exchange: sign-up, sign-in and token refresh against the
//! library API.
//!
//! Input is validated locally before any network call. Upstream failures are
//! logged and converted into user-facing messages; raw transport errors never
//! reach the caller.

use std::collections::BTreeMap;

use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};

use super::session::{Session, SessionError, SessionStore, SessionUser, TokenPair};
use crate::api::LibraryApi;
use crate::api::types::{ApiError, SignInReply, SignInRequest, SignUpRequest};
use crate::inflight::InFlight;

pub const SIGN_IN_FAILED: &str = "Invalid credentials or an error occurred.";
pub const SIGN_UP_FAILED: &str = "The user already exists or an error occurred.";
pub const TRANSPORT_FAILED: &str = "An error occurred. Please try again.";

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Checked only when the form sends it.
    pub confirm_password: Option<String>,
}

/// Per-field validation messages, serialized as `{ field: [messages] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<&'static str>>);

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: &'static str) {
        self.0.entry(field).or_default().push(message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[&'static str]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid input")]
    Validation(FieldErrors),
    #[error("{0}")]
    Rejected(String),
    #[error("An error occurred. Please try again.")]
    Transport,
    #[error("incomplete response from the authentication service")]
    InvalidResponse,
    #[error("a submission is already in progress")]
    Busy,
}

fn from_api_error(err: ApiError, fallback: &str) -> CredentialError {
    match err {
        ApiError::Rejected { status, message } => {
            tracing::info!(status, "credentials rejected upstream");
            CredentialError::Rejected(message.unwrap_or_else(|| fallback.to_owned()))
        }
        ApiError::Parse(e) => {
            tracing::error!(error = %e, "unreadable authentication response");
            CredentialError::InvalidResponse
        }
        ApiError::Request(e) | ApiError::HttpClientBuild(e) => {
            tracing::error!(error = %e, "authentication request failed");
            CredentialError::Transport
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || normalized.contains(char::is_whitespace)
    {
        return None;
    }
    Some(normalized)
}

fn check_email(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    if raw.trim().is_empty() {
        errors.add("email", "Email is required.");
        return None;
    }
    let normalized = normalize_email(raw);
    if normalized.is_none() {
        errors.add("email", "Please enter a valid email.");
    }
    normalized
}

fn check_password(raw: &str, errors: &mut FieldErrors) {
    if raw.is_empty() {
        errors.add("password", "Password is required.");
    }
}

/// Validate a login form into an API request.
///
/// # Errors
///
/// Returns the per-field messages when any field is missing or malformed.
pub fn validate_login(form: &LoginForm) -> Result<SignInRequest, FieldErrors> {
    let mut errors = FieldErrors::default();
    let email = check_email(&form.email, &mut errors);
    check_password(&form.password, &mut errors);

    match email {
        Some(email) if errors.is_empty() => Ok(SignInRequest { email, password: form.password.clone() }),
        _ => Err(errors),
    }
}

/// Validate a sign-up form into an API request.
///
/// # Errors
///
/// Returns the per-field messages when any field is missing or malformed or
/// the password confirmation does not match.
pub fn validate_signup(form: &SignUpForm) -> Result<SignUpRequest, FieldErrors> {
    let mut errors = FieldErrors::default();
    let name = form.name.trim();
    if name.is_empty() {
        errors.add("name", "Name is required.");
    }
    let email = check_email(&form.email, &mut errors);
    check_password(&form.password, &mut errors);
    if let Some(confirm) = &form.confirm_password {
        if *confirm != form.password {
            errors.add("confirm_password", "Passwords do not match.");
        }
    }

    match email {
        Some(email) if errors.is_empty() => {
            Ok(SignUpRequest { email, password: form.password.clone(), name: name.to_owned() })
        }
        _ => Err(errors),
    }
}

/// Build a session from a sign-in reply; `None` if any field is missing.
#[must_use]
pub fn session_from_reply(reply: SignInReply) -> Option<Session> {
    let user = SessionUser { id: reply.id?, name: reply.name?, role: reply.role? };
    let tokens = TokenPair { access_token: reply.access_token?, refresh_token: reply.refresh_token? };
    let session = Session::new(user, tokens);
    session.is_complete().then_some(session)
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Register a new account. Never creates a session; the caller sends the
/// user to the login page on success.
///
/// # Errors
///
/// See [`CredentialError`]. Validation failures make no network call.
pub async fn sign_up(api: &dyn LibraryApi, inflight: &InFlight, form: &SignUpForm) -> Result<(), CredentialError> {
    let request = validate_signup(form).map_err(CredentialError::Validation)?;
    let _busy = inflight
        .try_begin(format!("signup:{}", request.email))
        .ok_or(CredentialError::Busy)?;

    api.sign_up(&request)
        .await
        .map_err(|e| from_api_error(e, SIGN_UP_FAILED))?;
    tracing::info!(email = %request.email, "account registered");
    Ok(())
}

/// Exchange credentials for a complete session. The caller persists it with
/// [`SessionStore::create`].
///
/// # Errors
///
/// See [`CredentialError`]. Validation failures make no network call; an
/// upstream reply missing any session field is [`CredentialError::InvalidResponse`].
pub async fn sign_in(api: &dyn LibraryApi, inflight: &InFlight, form: &LoginForm) -> Result<Session, CredentialError> {
    let request = validate_login(form).map_err(CredentialError::Validation)?;
    let _busy = inflight
        .try_begin(format!("signin:{}", request.email))
        .ok_or(CredentialError::Busy)?;

    let reply = api
        .sign_in(&request)
        .await
        .map_err(|e| from_api_error(e, SIGN_IN_FAILED))?;

    let Some(session) = session_from_reply(reply) else {
        tracing::error!(email = %request.email, "sign-in reply missing session fields");
        return Err(CredentialError::InvalidResponse);
    };
    tracing::info!(sid = %session.sid, user = %session.user.id, role = session.user.role.as_str(), "signed in");
    Ok(session)
}

/// Result of a token refresh.
#[derive(Debug)]
pub enum Refreshed {
    /// Tokens rotated and persisted.
    Rotated(Session),
    /// Another refresh of the same session is outstanding; nothing changed.
    Busy,
    /// Refresh failed and the session was cleared.
    Failed,
}

impl Refreshed {
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Rotated(session) => Some(&session.access_token),
            Self::Busy | Self::Failed => None,
        }
    }
}

/// Exchange the refresh token of `session` for a new token pair.
///
/// Any failure (network error, rejected token, unusable pair, session
/// cleared meanwhile) clears the session so the route guard stops admitting
/// the caller.
pub async fn refresh(
    api: &dyn LibraryApi,
    store: &SessionStore,
    inflight: &InFlight,
    jar: SignedCookieJar,
    session: &Session,
) -> (SignedCookieJar, Refreshed) {
    let Some(_busy) = inflight.try_begin(format!("refresh:{}", session.sid)) else {
        return (jar, Refreshed::Busy);
    };

    let tokens = match api.refresh(&session.refresh_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(sid = %session.sid, error = %e, "token refresh failed; clearing session");
            return (store.clear(jar), Refreshed::Failed);
        }
    };

    match store.replace_tokens(jar.clone(), session, tokens) {
        Ok((jar, updated)) => {
            tracing::info!(sid = %updated.sid, "tokens rotated");
            (jar, Refreshed::Rotated(updated))
        }
        Err(SessionError::Revoked) => {
            tracing::info!(sid = %session.sid, "session cleared during refresh; new tokens discarded");
            (store.clear(jar), Refreshed::Failed)
        }
        Err(e) => {
            tracing::warn!(sid = %session.sid, error = %e, "refreshed tokens unusable; clearing session");
            (store.clear(jar), Refreshed::Failed)
        }
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
