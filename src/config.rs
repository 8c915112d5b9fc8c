//! Runtime configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_DASHBOARD_PREFIX: &str = "/dashboard";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_API_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_CONNECT_TIMEOUT_SECS: u64 = 10;

const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl ApiTimeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the library REST API, without trailing slash.
    pub api_url: String,
    pub port: u16,
    /// Secret the session cookie key is derived from. `None` means a random
    /// per-process key.
    pub session_secret: Option<String>,
    pub session_ttl_secs: u64,
    pub cookie_secure: bool,
    /// Every path equal to or below this prefix requires a session.
    pub dashboard_prefix: String,
    pub login_path: String,
    pub timeouts: ApiTimeouts,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// All variables are optional:
    /// - `LIBRARY_API_URL`: default `http://localhost:3000`
    /// - `PORT`: default 3000
    /// - `SESSION_SECRET`: at least 32 bytes when set
    /// - `SESSION_TTL_SECS`: default one week
    /// - `COOKIE_SECURE`: inferred from the `PUBLIC_URL` scheme when unset
    /// - `DASHBOARD_PREFIX`: default `/dashboard`
    /// - `LOGIN_PATH`: default `/auth/login`
    /// - `API_REQUEST_TIMEOUT_SECS`: default 30
    /// - `API_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a set variable cannot be parsed
    /// or violates its constraints.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("LIBRARY_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::Invalid { var: "LIBRARY_API_URL", reason: format!("not an http(s) URL: {api_url}") });
        }

        let session_secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        if let Some(secret) = &session_secret {
            if secret.len() < MIN_SESSION_SECRET_LEN {
                return Err(ConfigError::Invalid {
                    var: "SESSION_SECRET",
                    reason: format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
                });
            }
        }

        let session_ttl_secs = env_parse("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::Invalid { var: "SESSION_TTL_SECS", reason: "must be positive".into() });
        }

        let cookie_secure = match env_bool("COOKIE_SECURE") {
            Some(value) => value,
            None => std::env::var("PUBLIC_URL")
                .map(|url| url.starts_with("https://"))
                .unwrap_or(false),
        };

        let dashboard_prefix = env_path("DASHBOARD_PREFIX", DEFAULT_DASHBOARD_PREFIX)?;
        let login_path = env_path("LOGIN_PATH", DEFAULT_LOGIN_PATH)?;
        // The guard would redirect the login page to itself.
        if login_path == dashboard_prefix || login_path.starts_with(&format!("{dashboard_prefix}/")) {
            return Err(ConfigError::Invalid { var: "LOGIN_PATH", reason: "must lie outside DASHBOARD_PREFIX".into() });
        }

        Ok(Self {
            api_url,
            port: env_parse("PORT", DEFAULT_PORT)?,
            session_secret,
            session_ttl_secs,
            cookie_secure,
            dashboard_prefix,
            login_path,
            timeouts: ApiTimeouts {
                request_secs: env_parse("API_REQUEST_TIMEOUT_SECS", DEFAULT_API_REQUEST_TIMEOUT_SECS)?,
                connect_secs: env_parse("API_CONNECT_TIMEOUT_SECS", DEFAULT_API_CONNECT_TIMEOUT_SECS)?,
            },
        })
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            port: DEFAULT_PORT,
            session_secret: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            cookie_secure: false,
            dashboard_prefix: DEFAULT_DASHBOARD_PREFIX.to_owned(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            timeouts: ApiTimeouts {
                request_secs: DEFAULT_API_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_API_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var: key, reason: format!("cannot parse {raw:?}") }),
        Err(_) => Ok(default),
    }
}

/// Read a route path, normalized to a leading slash and no trailing slash.
fn env_path(key: &'static str, default: &str) -> Result<String, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_owned());
    normalize_path(&raw).ok_or(ConfigError::Invalid { var: key, reason: format!("not a route path: {raw:?}") })
}

pub(crate) fn normalize_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || !trimmed.starts_with('/') || trimmed.contains(char::is_whitespace) {
        return None;
    }
    Some(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
