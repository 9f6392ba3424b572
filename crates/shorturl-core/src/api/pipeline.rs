//! Request pipeline shared by every API call.
//!
//! Outbound, the current bearer token (if any) is attached. Inbound, a 401 on
//! a request that carried a token purges the session and surfaces as
//! `ApiError::SessionExpired`; every other failure is handed back to the
//! caller unchanged. Nothing is retried here.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::Session;

/// Cheap to clone: `reqwest::Client` and the session are both shared.
#[derive(Clone)]
pub struct RequestPipeline {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl RequestPipeline {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, session))
    }

    /// Build a pipeline around an existing client, sharing its connection pool.
    pub fn with_client(client: Client, base_url: &str, session: Arc<Session>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Start a request against `path` (relative to the API base URL).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a request through both pipeline stages.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.session.bearer_token();
        let request = match token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = token {
                warn!(path = %url, "Server rejected credential");
                self.session.reject(&token);
                return Err(ApiError::SessionExpired);
            }
        }

        let body = response.text().await.unwrap_or_default();
        debug!(path = %url, status = status.as_u16(), "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    /// Execute and decode a JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let path = response.url().path().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_json(self.request(Method::GET, path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        self.execute_json(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.execute_json(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.execute_json(self.request(Method::PUT, path).json(body)).await
    }

    /// DELETE whose response body is not needed
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}
