//! Data models for the ShortURL API.
//!
//! This module contains the wire types exchanged with the server:
//!
//! - `UserProfile`, `Role`: the signed-in identity stored alongside the token
//! - `ShortUrl` and its create/update requests: the link inventory
//! - Analytics types: `DashboardStats`, `UrlAnalytics`, `ClickRecord`, `AnalyticsSummary`

pub mod analytics;
pub mod url;
pub mod user;

pub use analytics::{
    AnalyticsSummary, ClickRecord, ClicksQuery, ClicksResponse, CountEntry, DashboardStats, TopUrl,
    UrlAnalytics,
};
pub use url::{CreateUrlRequest, ShortUrl, UpdateUrlRequest, UrlListResponse, UrlResponse, UrlStats};
pub use user::{
    ChangeRoleRequest, LoginRequest, LoginResponse, RegisterRequest, Role, ToggleActiveRequest,
    UserAccount, UserInfoResponse, UsersResponse, UserProfile,
};
