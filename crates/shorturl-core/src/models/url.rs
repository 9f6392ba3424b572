use serde::{Deserialize, Serialize};

/// A shortened link owned by the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortUrl {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub custom_alias: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub url_analytics: Option<UrlStats>,
}

impl ShortUrl {
    pub fn total_clicks(&self) -> u64 {
        self.url_analytics.as_ref().map(|a| a.total_clicks).unwrap_or(0)
    }

    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => "-",
        }
    }
}

/// Click counters embedded in a link row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlStats {
    #[serde(default)]
    pub total_clicks: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlListResponse {
    #[serde(default)]
    pub urls: Vec<ShortUrl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlResponse {
    pub url: ShortUrl,
}

/// Body of `POST /url`. Blank optional fields are left off the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateUrlRequest {
    pub original_url: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub custom_alias: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub expires_at: Option<String>,
}

impl CreateUrlRequest {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            ..Default::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: impl Into<String>) -> Self {
        self.expires_at = Some(expires_at.into());
        self
    }
}

/// Body of `PUT /url/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateUrlRequest {
    #[serde(skip_serializing_if = "is_blank")]
    pub original_url: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub custom_alias: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub expires_at: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(true)
}
