//! Library API: client for the remote library-management REST service.
//!
//! DESIGN
//! ======
//! Handlers and services depend on the [`LibraryApi`] trait so tests can
//! substitute an in-memory mock. [`rest::RestClient`] is the reqwest-backed
//! implementation used in production.

pub mod rest;
pub mod types;

pub use rest::RestClient;
use types::{ApiError, ApiReply, Entity, ResourceCall, SignInReply, SignInRequest, SignUpRequest, TokenPair};

/// Provider-neutral async trait for the library API. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LibraryApi: Send + Sync {
    /// `POST /auth/signup`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for a non-success status and
    /// [`ApiError::Request`] when the request could not complete.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ApiError>;

    /// `POST /auth/signin`.
    ///
    /// # Errors
    ///
    /// As [`LibraryApi::sign_up`], plus [`ApiError::Parse`] for an
    /// undecodable success body.
    async fn sign_in(&self, request: &SignInRequest) -> Result<SignInReply, ApiError>;

    /// `POST /auth/refresh`: exchange a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// As [`LibraryApi::sign_in`].
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;

    /// Perform a CRUD call with a bearer token. Any HTTP status is returned as
    /// an [`ApiReply`]; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] when the request could not complete.
    async fn resource(&self, entity: Entity, call: &ResourceCall, access_token: &str) -> Result<ApiReply, ApiError>;
}
