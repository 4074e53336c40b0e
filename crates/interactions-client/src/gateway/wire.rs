//! JSON envelopes used by the remote API

use serde::{Deserialize, Serialize};

use crate::cache::QueryKey;
use crate::types::{Interaction, InteractionPage, Pagination, Site, SiteId};

/// Payload either wrapped in `{ "data": ... }` or sent bare
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SitesBody {
    pub sites: Vec<Site>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSiteRequest {
    pub site_id: SiteId,
}

const fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSiteResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, alias = "current_site")]
    pub current_site: Option<Site>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct ListData {
    interactions: Vec<Interaction>,
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

/// `GET /interactions` response; pagination may sit inside `data` or beside it
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    data: ListData,
    #[serde(default)]
    meta: Option<Meta>,
}

impl ListResponse {
    pub fn into_page(self, query: &QueryKey) -> InteractionPage {
        let pagination = self
            .data
            .meta
            .map(|m| m.pagination)
            .or(self.data.pagination)
            .or_else(|| self.meta.map(|m| m.pagination))
            .unwrap_or_else(|| {
                Pagination::for_total(
                    query.page(),
                    query.page_size(),
                    self.data.interactions.len() as u64,
                )
            });
        InteractionPage {
            interactions: self.data.interactions,
            pagination,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordBody {
    pub interaction: Interaction,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Best human-readable detail from an error response body
pub fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error).or(b.detail))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}
