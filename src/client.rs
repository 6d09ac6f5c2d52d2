//! The `Client` handle: shared transport, verb helpers and service accessors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;

use crate::actions::ActionsService;
use crate::activity::ActivityService;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{self, RawResponse, Request, Response, MEDIA_TYPE_JSON};
use crate::issues::IssuesService;
use crate::pulls::PullsService;
use crate::rate_limit::{Rate, RateLimitService};
use crate::repos::ReposService;
use crate::rulesets::RulesetsService;
use crate::secrets::{SecretScope, SecretsService};

const NO_QUERY: Option<&()> = None;
const NO_BODY: Option<&()> = None;

/// Cheap to clone; clones share the connection pool and rate bookkeeping.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    cfg: Config,
    rates: Mutex<HashMap<String, Rate>>,
}

impl Client {
    pub fn new(cfg: Config) -> Result<Self> {
        let http = http::build_client(&cfg)?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                cfg,
                rates: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Most recent rate status seen for a resource bucket ("core", "search", ...).
    pub fn last_rate(&self, resource: &str) -> Option<Rate> {
        self.rates().get(resource).cloned()
    }

    pub fn actions(&self) -> ActionsService<'_> {
        ActionsService::new(self)
    }

    pub fn activity(&self) -> ActivityService<'_> {
        ActivityService::new(self)
    }

    pub fn actions_secrets(&self) -> SecretsService<'_> {
        SecretsService::new(self, SecretScope::Actions)
    }

    pub fn dependabot_secrets(&self) -> SecretsService<'_> {
        SecretsService::new(self, SecretScope::Dependabot)
    }

    pub fn issues(&self) -> IssuesService<'_> {
        IssuesService::new(self)
    }

    pub fn pulls(&self) -> PullsService<'_> {
        PullsService::new(self)
    }

    pub fn rate_limit(&self) -> RateLimitService<'_> {
        RateLimitService::new(self)
    }

    pub fn repos(&self) -> ReposService<'_> {
        ReposService::new(self)
    }

    pub fn rulesets(&self) -> RulesetsService<'_> {
        RulesetsService::new(self)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Response<T>> {
        self.send(Method::GET, path, NO_QUERY, NO_BODY).await
    }

    pub(crate) async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(Method::GET, path, Some(query), NO_BODY).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, NO_QUERY, Some(body)).await
    }

    pub(crate) async fn post_empty(&self, path: &str) -> Result<Response<()>> {
        self.send_discard(Method::POST, path, NO_BODY).await
    }

    pub(crate) async fn patch<T, B>(&self, path: &str, body: &B) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, path, NO_QUERY, Some(body)).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, NO_QUERY, Some(body)).await
    }

    pub(crate) async fn put_empty(&self, path: &str) -> Result<Response<()>> {
        self.send_discard(Method::PUT, path, NO_BODY).await
    }

    /// PUT whose reply body, if any, is of no interest.
    pub(crate) async fn put_discard<B>(&self, path: &str, body: &B) -> Result<Response<()>>
    where
        B: Serialize + ?Sized,
    {
        self.send_discard(Method::PUT, path, Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<Response<()>> {
        self.send_discard(Method::DELETE, path, NO_BODY).await
    }

    pub(crate) async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<Response<T>> {
        self.send(Method::DELETE, path, NO_QUERY, NO_BODY).await
    }

    /// GET with a custom media type, returning the body as text.
    pub(crate) async fn get_text(&self, path: &str, accept: &str) -> Result<Response<String>> {
        let raw = self
            .execute(Method::GET, path, NO_QUERY, NO_BODY, accept)
            .await?;
        Ok(http::check_response(raw)?.text())
    }

    pub(crate) async fn get_bytes(&self, path: &str) -> Result<Response<Vec<u8>>> {
        let raw = self
            .execute(Method::GET, path, NO_QUERY, NO_BODY, MEDIA_TYPE_JSON)
            .await?;
        Ok(http::check_response(raw)?.bytes())
    }

    /// GET returning the raw reply, whatever its status.
    pub(crate) async fn get_raw(&self, path: &str) -> Result<RawResponse> {
        self.execute(Method::GET, path, NO_QUERY, NO_BODY, MEDIA_TYPE_JSON)
            .await
    }

    async fn send<T, Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let raw = self
            .execute(method, path, query, body, MEDIA_TYPE_JSON)
            .await?;
        http::check_response(raw)?.json()
    }

    // Some endpoints answer `{}` or nothing at all; either way there is no value.
    async fn send_discard<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response<()>>
    where
        B: Serialize + ?Sized,
    {
        let resp: Response<IgnoredAny> = self.send(method, path, NO_QUERY, body).await?;
        Ok(resp.map(|_| ()))
    }

    async fn execute<Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
        accept: &str,
    ) -> Result<RawResponse>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let bucket = rate_bucket(path);
        if let Some(rate) = bucket.and_then(|b| self.last_rate(b)) {
            if rate.is_exhausted_at(chrono::Utc::now()) {
                debug!("refusing {} {}: rate limit exhausted until {}", method, path, rate.reset);
                return Err(Error::RateLimited {
                    rate,
                    message: "rate limit exhausted; request not sent".into(),
                });
            }
        }

        let url = self.inner.cfg.api_url.join(path.trim_start_matches('/'))?;
        let req = Request {
            method,
            url,
            query,
            body,
            accept,
        };
        let raw = http::execute(&self.inner.http, &self.inner.cfg, &req).await?;

        if let Some(rate) = Rate::from_headers(&raw.headers) {
            let key = rate
                .resource
                .clone()
                .or_else(|| bucket.map(str::to_string))
                .unwrap_or_else(|| "core".to_string());
            self.rates().insert(key, rate);
        }
        Ok(raw)
    }

    fn rates(&self) -> std::sync::MutexGuard<'_, HashMap<String, Rate>> {
        self.inner
            .rates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// Which bucket a path draws from; `rate_limit` itself is free.
fn rate_bucket(path: &str) -> Option<&'static str> {
    let path = path.trim_start_matches('/');
    if path.starts_with("rate_limit") {
        None
    } else if path.starts_with("search/code") {
        Some("code_search")
    } else if path.starts_with("search/") {
        Some("search")
    } else {
        Some("core")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets() {
        assert_eq!(rate_bucket("rate_limit"), None);
        assert_eq!(rate_bucket("/search/issues"), Some("search"));
        assert_eq!(rate_bucket("search/code"), Some("code_search"));
        assert_eq!(rate_bucket("repos/o/r"), Some("core"));
    }
}
