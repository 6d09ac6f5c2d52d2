//! Rate limit status, from response headers and from `GET /rate_limit`.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::http::Response;

/// One rate-limit bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub limit: u32,
    pub remaining: u32,
    #[serde(default)]
    pub used: u32,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub reset: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl Rate {
    /// Parse the `x-ratelimit-*` headers. `None` unless limit, remaining and
    /// reset are all present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Rate> {
        let limit = header_number::<u32>(headers, "x-ratelimit-limit")?;
        let remaining = header_number::<u32>(headers, "x-ratelimit-remaining")?;
        let reset = header_number::<i64>(headers, "x-ratelimit-reset")
            .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))?;
        let used = header_number::<u32>(headers, "x-ratelimit-used")
            .unwrap_or_else(|| limit.saturating_sub(remaining));
        let resource = headers
            .get("x-ratelimit-resource")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Some(Rate {
            limit,
            remaining,
            used,
            reset,
            resource,
        })
    }

    /// True while the bucket is empty and its window has not rolled over.
    pub fn is_exhausted_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining == 0 && now < self.reset
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<T>().ok())
}

/// Every bucket reported by `GET /rate_limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_manifest: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_import: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_scanning_upload: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions_runner_registration: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scim: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_snapshots: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_search: Option<Rate>,
}

#[derive(Deserialize)]
struct RateLimitsEnvelope {
    resources: RateLimits,
}

pub struct RateLimitService<'a> {
    client: &'a Client,
}

impl<'a> RateLimitService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Current status of every bucket. Does not count against the limit.
    pub async fn get(&self) -> Result<Response<RateLimits>> {
        let resp = self.client.get::<RateLimitsEnvelope>("rate_limit").await?;
        Ok(resp.map(|env| env.resources))
    }
}
