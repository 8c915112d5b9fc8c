//! Session store: the login session held in a signed cookie.
//!
//! ARCHITECTURE
//! ============
//! The session (user identity plus access/refresh token pair) is serialized
//! to JSON, base64url-encoded and stored in one HMAC-signed cookie. The cookie is
//! the single source of truth for "is this visitor authenticated"; handlers
//! receive the decoded [`Session`] from the route guard and never read tokens
//! from anywhere else.
//!
//! TRADE-OFFS
//! ==========
//! A signed cookie cannot be withdrawn from a browser that kept a copy, so
//! `clear` also records the session id in an in-memory revocation list. The
//! list only lives as long as the process and is pruned after one session
//! TTL, after which the cookie has expired anyway.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SameSite, SignedCookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use time::OffsetDateTime;

pub use crate::api::types::{Role, TokenPair, UserId};

pub const COOKIE_NAME: &str = "library_session";

/// Browsers drop cookies larger than this (name, value and attributes).
const MAX_COOKIE_BYTES: usize = 4096;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex session id.
#[must_use]
pub fn generate_sid() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Derive the cookie signing key. Without a secret a random key is used, so
/// sessions do not survive a restart.
#[must_use]
pub fn derive_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => Key::from(Sha512::digest(secret.as_bytes()).as_slice()),
        None => Key::generate(),
    }
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

// =============================================================================
// SESSION
// =============================================================================

/// Identity of the signed-in user, as returned by the library API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    /// Display name.
    pub name: String,
    pub role: Role,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Local identifier used for revocation; never sent upstream.
    pub sid: String,
    pub user: SessionUser,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    #[must_use]
    pub fn new(user: SessionUser, tokens: TokenPair) -> Self {
        Self { sid: generate_sid(), user, access_token: tokens.access_token, refresh_token: tokens.refresh_token }
    }

    /// A session is usable only with every field populated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let id_present = match &self.user.id {
            UserId::Number(_) => true,
            UserId::Text(s) => !s.trim().is_empty(),
        };
        id_present
            && !self.sid.is_empty()
            && !self.user.name.trim().is_empty()
            && !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
    }

    /// Same session with a rotated token pair.
    #[must_use]
    pub fn with_tokens(&self, tokens: TokenPair) -> Self {
        Self {
            sid: self.sid.clone(),
            user: self.user.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("sid", &self.sid)
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Cookie payload: the session plus its absolute expiry.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    session: Session,
    expires_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is missing required fields")]
    Incomplete,
    #[error("session encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session cookie exceeds 4096 bytes")]
    TooLarge,
    #[error("session was cleared before the write")]
    Revoked,
}

// =============================================================================
// REVOCATIONS
// =============================================================================

/// Session ids cleared by logout or failed refresh.
#[derive(Clone, Default)]
pub struct Revocations {
    inner: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Revocations {
    /// Record `sid` as revoked, dropping entries older than `retain`.
    pub fn revoke(&self, sid: &str, retain: Duration) {
        self.revoke_at(sid, retain, Instant::now());
    }

    fn revoke_at(&self, sid: &str, retain: Duration, now: Instant) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.retain(|_, at| now.saturating_duration_since(*at) <= retain);
        inner.insert(sid.to_owned(), now);
    }

    #[must_use]
    pub fn is_revoked(&self, sid: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(sid)
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct SessionStore {
    key: Key,
    ttl: Duration,
    secure: bool,
    revocations: Revocations,
}

impl SessionStore {
    #[must_use]
    pub fn new(key: Key, ttl: Duration, secure: bool) -> Self {
        Self { key, ttl, secure, revocations: Revocations::default() }
    }

    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Jar over the cookies of an incoming request.
    #[must_use]
    pub fn jar(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.key.clone())
    }

    /// Persist `session`, overwriting any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Incomplete`] for a partially populated session,
    /// [`SessionError::Encode`] if it cannot be serialized and
    /// [`SessionError::TooLarge`] if the cookie would be dropped by browsers.
    pub fn create(&self, jar: SignedCookieJar, session: &Session) -> Result<SignedCookieJar, SessionError> {
        if !session.is_complete() {
            return Err(SessionError::Incomplete);
        }

        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let stored = StoredSession { session: session.clone(), expires_at: now_unix().saturating_add(ttl_secs) };
        let value = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&stored)?);

        let cookie = Cookie::build((COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(ttl_secs))
            .build();
        // The signature adds a 44-byte base64 MAC in front of the value.
        if cookie.to_string().len() + 44 > MAX_COOKIE_BYTES {
            return Err(SessionError::TooLarge);
        }

        Ok(jar.add(cookie))
    }

    /// Current session, or `None` when absent, tampered, undecodable,
    /// incomplete, expired or revoked.
    #[must_use]
    pub fn read(&self, jar: &SignedCookieJar) -> Option<Session> {
        self.read_at(jar, now_unix())
    }

    fn read_at(&self, jar: &SignedCookieJar, now: i64) -> Option<Session> {
        let stored = decode(jar)?;
        if stored.expires_at <= now {
            tracing::debug!(sid = %stored.session.sid, "session expired");
            return None;
        }
        if !stored.session.is_complete() {
            tracing::warn!("incomplete session cookie ignored");
            return None;
        }
        if self.revocations.is_revoked(&stored.session.sid) {
            tracing::debug!(sid = %stored.session.sid, "revoked session presented");
            return None;
        }
        Some(stored.session)
    }

    /// Remove the session. Clearing an absent session is a no-op.
    #[must_use]
    pub fn clear(&self, jar: SignedCookieJar) -> SignedCookieJar {
        if let Some(stored) = decode(&jar) {
            self.revocations.revoke(&stored.session.sid, self.ttl);
        }
        jar.remove(Cookie::build(COOKIE_NAME).path("/"))
    }

    /// Removal for a session cookie that arrived but failed signature
    /// verification. The signed jar never holds such a cookie, so
    /// [`SessionStore::clear`] cannot expire it.
    #[must_use]
    pub fn discard_unverified(&self, headers: &HeaderMap, jar: &SignedCookieJar) -> Option<CookieJar> {
        if jar.get(COOKIE_NAME).is_some() {
            return None;
        }
        let raw = CookieJar::from_headers(headers);
        raw.get(COOKIE_NAME)?;
        tracing::debug!("unverifiable session cookie discarded");
        Some(raw.remove(Cookie::build(COOKIE_NAME).path("/")))
    }

    /// Rotate the token pair of `current`, keeping its id and user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Revoked`] when the session was cleared while
    /// the new tokens were being fetched, or any [`SessionStore::create`]
    /// error.
    pub fn replace_tokens(
        &self,
        jar: SignedCookieJar,
        current: &Session,
        tokens: TokenPair,
    ) -> Result<(SignedCookieJar, Session), SessionError> {
        if self.revocations.is_revoked(&current.sid) {
            return Err(SessionError::Revoked);
        }
        let updated = current.with_tokens(tokens);
        let jar = self.create(jar, &updated)?;
        Ok((jar, updated))
    }
}

/// Decode the cookie payload without expiry, completeness or revocation checks.
fn decode(jar: &SignedCookieJar) -> Option<StoredSession> {
    let cookie = jar.get(COOKIE_NAME)?;
    let bytes = URL_SAFE_NO_PAD.decode(cookie.value()).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(stored) => Some(stored),
        Err(e) => {
            tracing::warn!(error = %e, "undecodable session cookie ignored");
            None
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
