use serde::{Deserialize, Serialize};

/// Aggregates shown on the dashboard landing view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_urls: u64,
    #[serde(default)]
    pub active_urls: u64,
    #[serde(default)]
    pub total_clicks: u64,
    #[serde(default)]
    pub recent_clicks: u64,
    #[serde(default)]
    pub top_urls: Vec<TopUrl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopUrl {
    pub id: i64,
    pub short_code: String,
    #[serde(default)]
    pub title: Option<String>,
    pub original_url: String,
    #[serde(default)]
    pub total_clicks: u64,
}

/// Per-link analytics from `GET /analytics/url/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlAnalytics {
    #[serde(default)]
    pub url_id: Option<i64>,
    #[serde(default)]
    pub total_clicks: u64,
    #[serde(default)]
    pub unique_visitors: u64,
    #[serde(default)]
    pub last_clicked_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub clicked_at: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClicksResponse {
    #[serde(default)]
    pub clicks: Vec<ClickRecord>,
}

/// Query parameters for the click listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClicksQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsSummary {
    #[serde(default)]
    pub total_clicks: u64,
    #[serde(default)]
    pub unique_visitors: u64,
    #[serde(default)]
    pub clicks_today: u64,
    #[serde(default)]
    pub clicks_this_week: u64,
    #[serde(default)]
    pub top_referers: Vec<CountEntry>,
    #[serde(default)]
    pub top_countries: Vec<CountEntry>,
}

/// Label/count pair used by the summary breakdowns
#[derive(Debug, Clone, Deserialize)]
pub struct CountEntry {
    #[serde(default, alias = "referer", alias = "country")]
    pub label: Option<String>,
    #[serde(default)]
    pub count: u64,
}
