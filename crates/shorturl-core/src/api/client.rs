//! Typed endpoints of the ShortURL REST API.
//!
//! Every method goes through the `RequestPipeline`, so authentication and
//! session teardown are handled uniformly.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tracing::debug;

use super::{ApiError, RequestPipeline};
use crate::auth::Session;
use crate::models::{
    AnalyticsSummary, ChangeRoleRequest, ClicksQuery, ClicksResponse, CreateUrlRequest,
    DashboardStats, LoginRequest, LoginResponse, RegisterRequest, Role, ShortUrl,
    ToggleActiveRequest, UpdateUrlRequest, UrlAnalytics, UrlListResponse, UrlResponse,
    UserAccount, UserInfoResponse, UserProfile, UsersResponse,
};

/// API client for the ShortURL server.
/// Clone is cheap - the pipeline shares its connection pool and session.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: RequestPipeline,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ApiError> {
        Ok(Self {
            pipeline: RequestPipeline::new(base_url, timeout, session)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.pipeline.base_url()
    }

    // ===== Accounts =====

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let builder = self.pipeline.request(Method::POST, "/user/register").json(request);
        self.pipeline.execute(builder).await?;
        debug!(username = %request.username, "Registered account");
        Ok(())
    }

    /// Exchange username and password for a token and profile.
    ///
    /// Does not store anything; the caller decides when to establish the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.pipeline.post("/user/login", &request).await
    }

    pub async fn user_info(&self) -> Result<UserProfile, ApiError> {
        let response: UserInfoResponse = self.pipeline.get("/user/user-info").await?;
        Ok(response.user)
    }

    pub async fn users(&self) -> Result<Vec<UserAccount>, ApiError> {
        let response: UsersResponse = self.pipeline.get("/user/users").await?;
        Ok(response.users)
    }

    pub async fn change_role(&self, user_id: i64, role: Role) -> Result<(), ApiError> {
        let builder = self
            .pipeline
            .request(Method::PUT, "/user/change-role")
            .json(&ChangeRoleRequest { user_id, role });
        self.pipeline.execute(builder).await?;
        Ok(())
    }

    pub async fn toggle_active(&self, user_id: i64) -> Result<(), ApiError> {
        let builder = self
            .pipeline
            .request(Method::PUT, "/user/toggle-active")
            .json(&ToggleActiveRequest { user_id });
        self.pipeline.execute(builder).await?;
        Ok(())
    }

    // ===== Links =====

    pub async fn list_urls(&self) -> Result<Vec<ShortUrl>, ApiError> {
        let response: UrlListResponse = self.pipeline.get("/url").await?;
        debug!(count = response.urls.len(), "Fetched links");
        Ok(response.urls)
    }

    pub async fn get_url(&self, id: i64) -> Result<ShortUrl, ApiError> {
        let response: UrlResponse = self.pipeline.get(&format!("/url/{}", id)).await?;
        Ok(response.url)
    }

    pub async fn create_url(&self, request: &CreateUrlRequest) -> Result<ShortUrl, ApiError> {
        let response: UrlResponse = self.pipeline.post("/url", request).await?;
        debug!(short_code = %response.url.short_code, "Created link");
        Ok(response.url)
    }

    pub async fn update_url(&self, id: i64, request: &UpdateUrlRequest) -> Result<ShortUrl, ApiError> {
        let response: UrlResponse = self.pipeline.put(&format!("/url/{}", id), request).await?;
        Ok(response.url)
    }

    pub async fn delete_url(&self, id: i64) -> Result<(), ApiError> {
        self.pipeline.delete(&format!("/url/{}", id)).await
    }

    // ===== Analytics =====

    pub async fn url_analytics(&self, url_id: i64) -> Result<UrlAnalytics, ApiError> {
        self.pipeline.get(&format!("/analytics/url/{}", url_id)).await
    }

    pub async fn clicks(&self, url_id: i64, query: &ClicksQuery) -> Result<ClicksResponse, ApiError> {
        self.pipeline
            .get_with_query(&format!("/analytics/clicks/{}", url_id), query)
            .await
    }

    pub async fn summary(&self, url_id: i64) -> Result<AnalyticsSummary, ApiError> {
        self.pipeline.get(&format!("/analytics/summary/{}", url_id)).await
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, ApiError> {
        self.pipeline.get("/analytics/dashboard").await
    }
}
