use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::error::{status_is_retriable, Error, ErrorResponse, Result};
use crate::pagination::Pages;
use crate::rate_limit::Rate;

pub const MEDIA_TYPE_JSON: &str = "application/vnd.github+json";
pub const MEDIA_TYPE_DIFF: &str = "application/vnd.github.diff";
pub const MEDIA_TYPE_PATCH: &str = "application/vnd.github.patch";

// Longest server-requested wait we are willing to sleep through inside a call.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// A decoded response plus the metadata GitHub attaches to every reply.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub value: T,
    pub status: StatusCode,
    pub rate: Option<Rate>,
    pub pages: Pages,
    pub headers: HeaderMap,
}

impl<T> Response<T> {
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            value: f(self.value),
            status: self.status,
            rate: self.rate,
            pages: self.pages,
            headers: self.headers,
        }
    }
}

/// Status, headers and body of a reply, before decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    fn into_response<T>(self, value: T) -> Response<T> {
        Response {
            value,
            status: self.status,
            rate: Rate::from_headers(&self.headers),
            pages: Pages::from_headers(&self.headers),
            headers: self.headers,
        }
    }

    /// Decode the body as JSON. An empty body decodes as `null`, which
    /// satisfies `()` and `Option<T>`.
    pub fn json<T: DeserializeOwned>(self) -> Result<Response<T>> {
        let value = if self.body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(serde_json::Value::Null)?
        } else {
            serde_json::from_slice(&self.body).map_err(|e| {
                warn!("failed to decode {} response: {}", self.status, e);
                e
            })?
        };
        Ok(self.into_response(value))
    }

    pub fn text(self) -> Response<String> {
        let text = String::from_utf8_lossy(&self.body).into_owned();
        self.into_response(text)
    }

    pub fn bytes(mut self) -> Response<Vec<u8>> {
        let body = std::mem::take(&mut self.body);
        self.into_response(body)
    }
}

/// Everything needed to (re)issue one call.
pub(crate) struct Request<'a, Q: ?Sized, B: ?Sized> {
    pub method: Method,
    pub url: Url,
    pub query: Option<&'a Q>,
    pub body: Option<&'a B>,
    pub accept: &'a str,
}

pub fn build_client(cfg: &Config) -> Result<reqwest::Client> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .map_err(|_| Error::Config(format!("invalid user agent: {:?}", cfg.user_agent)))?;
    default_headers.insert(USER_AGENT, ua);
    // Authorization header is injected per request so the token never lands in
    // redirects to other hosts (log archives).
    let client = reqwest::Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()?;
    Ok(client)
}

fn auth_header(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| Error::Config("token contains invalid header characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Percent-encode one caller-supplied path segment.
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn compute_backoff(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(d) = retry_after {
        return d;
    }
    // Exponential backoff with jitter: base 200ms * 2^attempt, max 5s.
    let base = 200u64.saturating_mul(1u64 << attempt.min(5));
    let max = 5_000u64.min(base);
    let jitter = fastrand::u64(0..=max / 2);
    Duration::from_millis(max / 2 + jitter)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE
    )
}

// A drained primary limit will not recover within a retry window.
fn primary_limit_drained(headers: &HeaderMap) -> bool {
    Rate::from_headers(headers).is_some_and(|r| r.remaining == 0)
}

/// Send a request, retrying transient failures. Non-2xx replies are
/// returned as-is; see [`check_response`].
pub(crate) async fn execute<Q, B>(
    client: &reqwest::Client,
    cfg: &Config,
    req: &Request<'_, Q, B>,
) -> Result<RawResponse>
where
    Q: Serialize + ?Sized,
    B: Serialize + ?Sized,
{
    let idempotent = is_idempotent(&req.method);
    let auth = cfg.token.as_deref().map(auth_header).transpose()?;
    let mut attempt: u32 = 0;
    loop {
        let mut rb = client
            .request(req.method.clone(), req.url.clone())
            .header("X-GitHub-Api-Version", &cfg.api_version)
            .header(ACCEPT, req.accept);
        if let Some(auth) = &auth {
            rb = rb.header(AUTHORIZATION, auth.clone());
        }
        if let Some(query) = req.query {
            rb = rb.query(query);
        }
        if let Some(body) = req.body {
            rb = rb.json(body);
        }
        debug!("{} {} (attempt {})", req.method, req.url, attempt + 1);

        let res = match rb.send().await {
            Ok(r) => r,
            Err(e) => {
                let transient = !e.is_builder() && (idempotent || e.is_connect());
                if transient && attempt < cfg.max_retries {
                    let backoff = compute_backoff(attempt, None);
                    warn!(
                        "{} {} error sending request: {}; retrying in {:?}",
                        req.method, req.url, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                    continue;
                }
                return Err(e.into());
            }
        };

        let status = res.status();
        let headers = res.headers().clone();

        // Retry on 429/5xx
        if idempotent
            && status_is_retriable(status)
            && attempt < cfg.max_retries
            && !primary_limit_drained(&headers)
        {
            let wait = retry_after(&headers);
            if wait.map_or(true, |d| d <= MAX_RETRY_AFTER) {
                let backoff = compute_backoff(attempt, wait);
                warn!(
                    "{} {} retrying (status {}), backoff {:?}",
                    req.method, req.url, status, backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }
        }

        let body = res.bytes().await?.to_vec();
        return Ok(RawResponse {
            status,
            headers,
            body,
        });
    }
}

fn is_secondary_limit(response: &ErrorResponse) -> bool {
    let doc = response.documentation_url.as_deref().unwrap_or_default();
    response.message.contains("secondary rate limit")
        || doc.ends_with("#abuse-rate-limits")
        || doc.ends_with("secondary-rate-limits")
}

/// Turn a non-2xx reply into the matching [`Error`].
pub fn check_response(raw: RawResponse) -> Result<RawResponse> {
    if raw.status.is_success() {
        return Ok(raw);
    }
    let text = String::from_utf8_lossy(&raw.body);
    let response = ErrorResponse::from_text(&text);

    if raw.status == StatusCode::FORBIDDEN || raw.status == StatusCode::TOO_MANY_REQUESTS {
        if is_secondary_limit(&response) {
            let wait = retry_after(&raw.headers).or_else(|| {
                Rate::from_headers(&raw.headers)
                    .filter(|r| r.remaining == 0)
                    .and_then(|r| (r.reset - chrono::Utc::now()).to_std().ok())
            });
            return Err(Error::SecondaryRateLimited {
                retry_after: wait,
                message: response.message,
            });
        }
        if let Some(rate) = Rate::from_headers(&raw.headers).filter(|r| r.remaining == 0) {
            return Err(Error::RateLimited {
                rate,
                message: response.message,
            });
        }
    }

    Err(Error::Api {
        status: raw.status,
        response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, headers: &[(&'static str, &str)], body: &str) -> RawResponse {
        let mut h = HeaderMap::new();
        for (k, v) in headers {
            h.insert(*k, v.parse().unwrap());
        }
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: h,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn url_path_segment_encoding() {
        // Spaces, slash, percent and unicode should be percent-encoded
        assert_eq!(encode_path_segment("Prod Env/Blue%"), "Prod%20Env%2FBlue%25");
        // Unreserved characters remain as-is
        assert_eq!(encode_path_segment("abc-._~123"), "abc-._~123");
    }

    #[test]
    fn backoff_is_capped_and_honors_retry_after() {
        for attempt in 0..10 {
            assert!(compute_backoff(attempt, None) <= Duration::from_secs(5));
        }
        assert_eq!(
            compute_backoff(3, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
    }

    #[test]
    fn only_safe_methods_are_idempotent() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::PUT));
        assert!(is_idempotent(&Method::DELETE));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }

    #[test]
    fn empty_body_decodes_as_unit_and_none() {
        let unit: Response<()> = raw(204, &[], "").json().unwrap();
        assert_eq!(unit.status, StatusCode::NO_CONTENT);
        let none: Response<Option<u32>> = raw(204, &[], "").json().unwrap();
        assert_eq!(none.value, None);
    }

    #[test]
    fn primary_rate_limit_maps_to_rate_limited() {
        let r = raw(
            403,
            &[
                ("x-ratelimit-limit", "60"),
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", "4102444800"),
            ],
            r#"{"message":"API rate limit exceeded for 1.2.3.4."}"#,
        );
        match check_response(r) {
            Err(Error::RateLimited { rate, message }) => {
                assert_eq!(rate.remaining, 0);
                assert!(message.contains("API rate limit exceeded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn secondary_rate_limit_reads_retry_after() {
        let r = raw(
            403,
            &[("retry-after", "30")],
            r#"{"message":"You have exceeded a secondary rate limit.","documentation_url":"https://docs.github.com/rest/overview/rate-limits-for-the-rest-api#about-secondary-rate-limits"}"#,
        );
        match check_response(r) {
            Err(Error::SecondaryRateLimited { retry_after, .. }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn plain_forbidden_stays_api_error() {
        let r = raw(403, &[], r#"{"message":"Resource not accessible by integration"}"#);
        let err = check_response(r).unwrap_err();
        assert_eq!(err.code(), "forbidden");
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn success_passes_through() {
        let ok = check_response(raw(200, &[], "{}")).unwrap();
        assert_eq!(ok.status, StatusCode::OK);
    }
}
