//! Reqwest-backed [`LibraryApi`] implementation.
//!
//! Thin HTTP wrapper over the auth and CRUD endpoints. Status handling and
//! body parsing live in `types` for testability.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::LibraryApi;
use super::types::{
    ApiError, ApiReply, Entity, RefreshRequest, ResourceCall, SignInReply, SignInRequest, SignUpRequest, TokenPair,
    extract_message, parse_body,
};
use crate::config::ApiTimeouts;

// =============================================================================
// CLIENT
// =============================================================================

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Build a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, timeouts: ApiTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body and return the raw success body.
    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Rejected { status: status.as_u16(), message: extract_message(&text) });
        }
        Ok(text)
    }

    async fn post_parse<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let text = self.post_json(path, body).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LibraryApi for RestClient {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ApiError> {
        self.post_json("/auth/signup", request).await?;
        Ok(())
    }

    async fn sign_in(&self, request: &SignInRequest) -> Result<SignInReply, ApiError> {
        self.post_parse("/auth/signin", request).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.post_parse("/auth/refresh", &RefreshRequest { refresh: refresh_token })
            .await
    }

    async fn resource(&self, entity: Entity, call: &ResourceCall, access_token: &str) -> Result<ApiReply, ApiError> {
        let url = self.url(&call.path(entity));
        let request = match call {
            ResourceCall::List => self.http.get(url),
            ResourceCall::Create(body) => self.http.post(url).json(body),
            ResourceCall::Update { body, .. } => self.http.put(url).json(body),
            ResourceCall::Delete { .. } => self.http.delete(url),
        };

        let response = request
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Ok(ApiReply { status, body: parse_body(&text) })
    }
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
