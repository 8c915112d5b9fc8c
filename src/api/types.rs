//! Library API wire types and errors.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by library API client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request could not be completed.
    #[error("API request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("API rejected request: status {status}")]
    Rejected { status: u16, message: Option<String> },

    /// The API response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Upstream user identifier. The API may send either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Bookkeeper,
    User,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Bookkeeper => "BOOKKEEPER",
            Self::User => "USER",
        }
    }
}

// =============================================================================
// AUTH PAYLOADS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// `POST /auth/signin` response. Every field is optional on the wire; the
/// credential exchange decides whether the reply is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInReply {
    pub id: Option<UserId>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// =============================================================================
// RESOURCES
// =============================================================================

/// Upstream collections managed from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Author,
    Book,
    Category,
    Reservation,
    FinePayment,
    User,
}

impl Entity {
    pub const ALL: [Self; 6] =
        [Self::Author, Self::Book, Self::Category, Self::Reservation, Self::FinePayment, Self::User];

    /// Resolve a dashboard URL segment.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.slug() == slug)
    }

    /// Dashboard URL segment.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Book => "book",
            Self::Category => "category",
            Self::Reservation => "reservation",
            Self::FinePayment => "fine-payment",
            Self::User => "user",
        }
    }

    /// Path segment of the collection on the library API.
    #[must_use]
    pub fn upstream(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Book => "book",
            Self::Category => "bookcategory",
            Self::Reservation => "reservation",
            Self::FinePayment => "finePayment",
            Self::User => "user",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Author => "Authors",
            Self::Book => "Books",
            Self::Category => "Categories",
            Self::Reservation => "Reservations",
            Self::FinePayment => "Fine payments",
            Self::User => "Users",
        }
    }
}

/// One CRUD operation against an entity collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceCall {
    List,
    Create(serde_json::Value),
    Update { id: String, body: serde_json::Value },
    Delete { id: String },
}

impl ResourceCall {
    /// Upstream path for this call, relative to the API base URL.
    #[must_use]
    pub fn path(&self, entity: Entity) -> String {
        let collection = entity.upstream();
        match self {
            Self::List => format!("/{collection}/getall"),
            Self::Create(_) => format!("/{collection}/create"),
            Self::Update { id, .. } => format!("/{collection}/update/{id}"),
            Self::Delete { id } => format!("/{collection}/delete/{id}"),
        }
    }
}

/// Status and JSON body of an upstream CRUD response, passed through as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiReply {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Extract the `message` field of an API error body.
///
/// Validation errors arrive with `message` as an array of strings; those are
/// joined with `"; "`.
#[must_use]
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts = items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<Vec<_>>();
            if parts.is_empty() { None } else { Some(parts.join("; ")) }
        }
        _ => None,
    }
}

/// Parse a CRUD response body; empty bodies become `null` and non-JSON bodies
/// are kept as a string.
#[must_use]
pub fn parse_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_owned()))
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
