use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::analytics::ClientProfile;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub id: i64,
    pub original_url: String,
    #[serde(rename = "shortUrl")]
    pub short_code: String,
    #[serde(rename = "owner")]
    pub owner_id: i64,
    pub clicks: i64,
    #[sqlx(skip)]
    pub click_details: Vec<ClickRecord>,
    pub created_at: i64,
}

/// One visit logged against a short link, in arrival order
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    #[serde(skip)]
    pub link_id: i64,
    #[serde(rename = "timestamp")]
    pub clicked_at: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referer: Option<String>,
    pub device: String,
    pub browser: String,
    pub os: String,
}

/// Visit metadata captured on the redirect path, before it is persisted
#[derive(Debug, Clone)]
pub struct Visit {
    pub clicked_at: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referer: Option<String>,
    pub client: ClientProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub original_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLinksQuery {
    /// Only links created since local midnight
    #[serde(default)]
    pub today: bool,
}
