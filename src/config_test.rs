use super::*;
use std::sync::Mutex;

// `from_env` reads process-global variables; serialize the tests that touch them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "LIBRARY_API_URL",
    "PORT",
    "SESSION_SECRET",
    "SESSION_TTL_SECS",
    "COOKIE_SECURE",
    "PUBLIC_URL",
    "DASHBOARD_PREFIX",
    "LOGIN_PATH",
    "API_REQUEST_TIMEOUT_SECS",
    "API_CONNECT_TIMEOUT_SECS",
];

/// # Safety
/// Callers must hold `ENV_LOCK`.
unsafe fn clear_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

// =============================================================================
// from_env
// =============================================================================

#[test]
fn from_env_defaults() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_env() };

    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg, AppConfig::default());
    assert_eq!(cfg.session_ttl(), Duration::from_secs(DEFAULT_SESSION_TTL_SECS));
}

#[test]
fn from_env_parses_overrides() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("LIBRARY_API_URL", "https://library.example/api/");
        std::env::set_var("PORT", "8080");
        std::env::set_var("SESSION_SECRET", "0123456789abcdef0123456789abcdef");
        std::env::set_var("SESSION_TTL_SECS", "3600");
        std::env::set_var("DASHBOARD_PREFIX", "/admin/");
        std::env::set_var("LOGIN_PATH", "/signin");
        std::env::set_var("API_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("API_CONNECT_TIMEOUT_SECS", "2");
    }

    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.api_url, "https://library.example/api");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.session_secret.as_deref(), Some("0123456789abcdef0123456789abcdef"));
    assert_eq!(cfg.session_ttl_secs, 3600);
    assert_eq!(cfg.dashboard_prefix, "/admin");
    assert_eq!(cfg.login_path, "/signin");
    assert_eq!(cfg.timeouts, ApiTimeouts { request_secs: 5, connect_secs: 2 });

    unsafe { clear_env() };
}

#[test]
fn from_env_rejects_short_secret() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("SESSION_SECRET", "too-short");
    }

    let err = AppConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("SESSION_SECRET"));

    unsafe { clear_env() };
}

#[test]
fn from_env_rejects_bad_port() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("PORT", "eighty");
    }

    let err = AppConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("PORT"));

    unsafe { clear_env() };
}

#[test]
fn from_env_rejects_non_http_api_url() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("LIBRARY_API_URL", "ftp://library.example");
    }

    assert!(AppConfig::from_env().is_err());

    unsafe { clear_env() };
}

#[test]
fn from_env_rejects_zero_ttl() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("SESSION_TTL_SECS", "0");
    }

    assert!(AppConfig::from_env().is_err());

    unsafe { clear_env() };
}

#[test]
fn from_env_rejects_login_path_under_dashboard() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("LOGIN_PATH", "/dashboard/login");
    }

    let err = AppConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("LOGIN_PATH"));

    unsafe { std::env::set_var("LOGIN_PATH", "/dashboard-login") };
    assert_eq!(AppConfig::from_env().unwrap().login_path, "/dashboard-login");

    unsafe { clear_env() };
}

#[test]
fn cookie_secure_inferred_from_public_url() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("PUBLIC_URL", "https://admin.library.example");
    }
    assert!(AppConfig::from_env().unwrap().cookie_secure);

    unsafe { std::env::set_var("COOKIE_SECURE", "off") };
    assert!(!AppConfig::from_env().unwrap().cookie_secure);

    unsafe { clear_env() };
}

// =============================================================================
// env_bool: unique variable names, no lock needed.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "YES", " on "].iter().enumerate() {
        let key = format!("__TEST_LA_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "No", "off"].iter().enumerate() {
        let key = format!("__TEST_LA_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_or_unset_is_none() {
    let key = "__TEST_LA_EB_INVALID__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__TEST_LA_EB_SURELY_UNSET__"), None);
}

// =============================================================================
// normalize_path
// =============================================================================

#[test]
fn normalize_path_strips_trailing_slash() {
    assert_eq!(normalize_path("/dashboard/"), Some("/dashboard".to_owned()));
    assert_eq!(normalize_path(" /auth/login "), Some("/auth/login".to_owned()));
}

#[test]
fn normalize_path_rejects_relative_and_root() {
    assert_eq!(normalize_path("dashboard"), None);
    assert_eq!(normalize_path("/"), None);
    assert_eq!(normalize_path(""), None);
    assert_eq!(normalize_path("/dash board"), None);
}
