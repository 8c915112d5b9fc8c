use super::*;
use crate::state::test_helpers::{cookie_header, next_request_jar, sample_session};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

fn store() -> SessionStore {
    SessionStore::new(derive_key(Some("0123456789abcdef0123456789abcdef")), Duration::from_secs(3600), false)
}

fn empty_jar(store: &SessionStore) -> SignedCookieJar {
    store.jar(&HeaderMap::new())
}

// =============================================================================
// ids
// =============================================================================

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a, 0xff]), "0aff");
}

#[test]
fn generate_sid_is_64_hex_chars_and_unique() {
    let a = generate_sid();
    let b = generate_sid();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}

#[test]
fn derive_key_is_deterministic_for_a_secret() {
    let a = derive_key(Some("0123456789abcdef0123456789abcdef"));
    let b = derive_key(Some("0123456789abcdef0123456789abcdef"));
    let c = derive_key(Some("fedcba9876543210fedcba9876543210"));
    assert_eq!(a.master(), b.master());
    assert_ne!(a.master(), c.master());
}

// =============================================================================
// Session
// =============================================================================

#[test]
fn session_completeness() {
    let session = sample_session();
    assert!(session.is_complete());

    let mut no_access = session.clone();
    no_access.access_token.clear();
    assert!(!no_access.is_complete());

    let mut no_refresh = session.clone();
    no_refresh.refresh_token.clear();
    assert!(!no_refresh.is_complete());

    let mut blank_id = session.clone();
    blank_id.user.id = UserId::Text("  ".into());
    assert!(!blank_id.is_complete());

    let mut no_name = session;
    no_name.user.name = String::new();
    assert!(!no_name.is_complete());
}

#[test]
fn session_debug_redacts_tokens() {
    let debug = format!("{:?}", sample_session());
    assert!(debug.contains("<redacted>"));
    assert!(!debug.contains("AT1"));
    assert!(!debug.contains("RT1"));
}

#[test]
fn with_tokens_keeps_identity() {
    let session = sample_session();
    let rotated = session.with_tokens(TokenPair { access_token: "AT2".into(), refresh_token: "RT2".into() });
    assert_eq!(rotated.sid, session.sid);
    assert_eq!(rotated.user, session.user);
    assert_eq!(rotated.access_token, "AT2");
    assert_eq!(rotated.refresh_token, "RT2");
}

// =============================================================================
// create / read
// =============================================================================

#[test]
fn create_then_read_round_trips() {
    let store = store();
    let session = sample_session();
    let jar = store.create(empty_jar(&store), &session).unwrap();

    let next = next_request_jar(jar, store.key());
    assert_eq!(store.read(&next), Some(session));
}

#[test]
fn create_overwrites_previous_session() {
    let store = store();
    let first = sample_session();
    let jar = store.create(empty_jar(&store), &first).unwrap();
    let jar = next_request_jar(jar, store.key());

    let second = sample_session();
    let jar = store.create(jar, &second).unwrap();
    let next = next_request_jar(jar, store.key());
    assert_eq!(store.read(&next), Some(second));
}

#[test]
fn create_rejects_incomplete_session() {
    let store = store();
    let mut session = sample_session();
    session.refresh_token.clear();
    let err = store.create(empty_jar(&store), &session).unwrap_err();
    assert!(matches!(err, SessionError::Incomplete));
}

#[test]
fn create_rejects_oversized_session() {
    let store = store();
    let mut session = sample_session();
    session.access_token = "a".repeat(4096);
    let err = store.create(empty_jar(&store), &session).unwrap_err();
    assert!(matches!(err, SessionError::TooLarge));
}

#[test]
fn create_fits_long_token_pair() {
    let store = store();
    let mut session = sample_session();
    session.access_token = "a".repeat(1200);
    session.refresh_token = "r".repeat(1200);

    let jar = store.create(empty_jar(&store), &session).unwrap();
    let payload = jar.get(COOKIE_NAME).unwrap().value().to_owned();
    assert!(URL_SAFE_NO_PAD.decode(&payload).is_ok());

    let next = next_request_jar(jar, store.key());
    assert_eq!(store.read(&next), Some(session));
}

#[test]
fn read_without_cookie_is_none() {
    let store = store();
    assert!(store.read(&empty_jar(&store)).is_none());
}

#[test]
fn read_with_foreign_key_is_none() {
    let store = store();
    let jar = store.create(empty_jar(&store), &sample_session()).unwrap();

    let other = SessionStore::new(derive_key(Some("another-secret-another-secret-xx")), Duration::from_secs(3600), false);
    let next = next_request_jar(jar, other.key());
    assert!(other.read(&next).is_none());
}

#[test]
fn read_with_tampered_cookie_is_none() {
    let store = store();
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, format!("{COOKIE_NAME}=not-a-signed-value").parse().unwrap());
    assert!(store.read(&store.jar(&headers)).is_none());
}

#[test]
fn read_after_expiry_is_none() {
    let store = store();
    let jar = store.create(empty_jar(&store), &sample_session()).unwrap();
    let next = next_request_jar(jar, store.key());

    assert!(store.read_at(&next, now_unix()).is_some());
    assert!(store.read_at(&next, now_unix() + 3601).is_none());
}

// =============================================================================
// clear
// =============================================================================

#[test]
fn clear_is_idempotent() {
    let store = store();
    let jar = store.create(empty_jar(&store), &sample_session()).unwrap();
    let jar = next_request_jar(jar, store.key());

    let jar = store.clear(jar);
    let jar = next_request_jar(jar, store.key());
    assert!(store.read(&jar).is_none());

    let jar = store.clear(jar);
    let jar = next_request_jar(jar, store.key());
    assert!(store.read(&jar).is_none());
}

#[test]
fn discard_unverified_expires_tampered_cookie() {
    let store = store();
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, format!("{COOKIE_NAME}=not-a-signed-value").parse().unwrap());

    let removal = store
        .discard_unverified(&headers, &store.jar(&headers))
        .unwrap();
    let response = (removal, StatusCode::OK).into_response();
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("library_session=;"), "{set_cookie}");
    assert!(set_cookie.contains("Max-Age=0"), "{set_cookie}");
}

#[test]
fn discard_unverified_leaves_valid_or_missing_cookie() {
    let store = store();
    assert!(store.discard_unverified(&HeaderMap::new(), &empty_jar(&store)).is_none());

    let jar = store.create(empty_jar(&store), &sample_session()).unwrap();
    let response = (jar, StatusCode::OK).into_response();
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, cookie_header(response.headers()).unwrap());
    assert!(store.discard_unverified(&headers, &store.jar(&headers)).is_none());
}

#[test]
fn clear_revokes_replayed_cookie() {
    let store = store();
    let session = sample_session();
    let jar = store.create(empty_jar(&store), &session).unwrap();
    let jar = next_request_jar(jar, store.key());
    let replayed = jar.clone();

    let _cleared = store.clear(jar);
    assert!(store.revocations.is_revoked(&session.sid));
    assert!(store.read(&replayed).is_none());
}

// =============================================================================
// replace_tokens
// =============================================================================

#[test]
fn replace_tokens_rotates_pair() {
    let store = store();
    let session = sample_session();
    let jar = store.create(empty_jar(&store), &session).unwrap();
    let jar = next_request_jar(jar, store.key());

    let tokens = TokenPair { access_token: "AT2".into(), refresh_token: "RT2".into() };
    let (jar, updated) = store.replace_tokens(jar, &session, tokens).unwrap();
    assert_eq!(updated.sid, session.sid);

    let next = next_request_jar(jar, store.key());
    let read = store.read(&next).unwrap();
    assert_eq!(read.access_token, "AT2");
    assert_eq!(read.refresh_token, "RT2");
    assert_eq!(read.user, session.user);
}

#[test]
fn replace_tokens_after_clear_is_refused() {
    let store = store();
    let session = sample_session();
    let jar = store.create(empty_jar(&store), &session).unwrap();
    let jar = next_request_jar(jar, store.key());
    let stale = jar.clone();

    let _cleared = store.clear(jar);
    let tokens = TokenPair { access_token: "AT2".into(), refresh_token: "RT2".into() };
    let err = store.replace_tokens(stale, &session, tokens).unwrap_err();
    assert!(matches!(err, SessionError::Revoked));
}

#[test]
fn replace_tokens_rejects_empty_pair() {
    let store = store();
    let session = sample_session();
    let tokens = TokenPair { access_token: String::new(), refresh_token: "RT2".into() };
    let err = store.replace_tokens(empty_jar(&store), &session, tokens).unwrap_err();
    assert!(matches!(err, SessionError::Incomplete));
}

// =============================================================================
// Revocations
// =============================================================================

#[test]
fn revocations_prune_old_entries() {
    let revocations = Revocations::default();
    let start = Instant::now();
    revocations.revoke_at("old", Duration::from_secs(10), start);
    assert!(revocations.is_revoked("old"));

    revocations.revoke_at("new", Duration::from_secs(10), start + Duration::from_secs(11));
    assert!(!revocations.is_revoked("old"));
    assert!(revocations.is_revoked("new"));
}
