//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds no authentication state of its own: the session lives in the
//! signed cookie and is decoded per request by the route guard.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::api::LibraryApi;
use crate::config::AppConfig;
use crate::inflight::InFlight;
use crate::routes::guard::RouteGuard;
use crate::services::session::{SessionStore, derive_key};

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api: Arc<dyn LibraryApi>,
    pub sessions: SessionStore,
    pub guard: RouteGuard,
    pub inflight: InFlight,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, api: Arc<dyn LibraryApi>) -> Self {
        let key = derive_key(config.session_secret.as_deref());
        let sessions = SessionStore::new(key, config.session_ttl(), config.cookie_secure);
        let guard = RouteGuard::new(&config.dashboard_prefix, &config.login_path);
        Self { config: Arc::new(config), api, sessions, guard, inflight: InFlight::new() }
    }
}

/// Lets handlers take a `SignedCookieJar` extractor.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.key().clone()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
