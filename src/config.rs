use std::env;

use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Runtime configuration for the REST client.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: Url,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Config {
    /// Defaults against api.github.com with an optional token.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            api_url: Url::parse(DEFAULT_API_URL).expect("valid default url"),
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: default_user_agent(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }

    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [optional; unauthenticated otherwise]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-rest/<version>)
    /// - GITHUB_MAX_RETRIES (default: 3)
    pub fn from_env() -> Result<Self> {
        let token = env::var("GITHUB_TOKEN")
            .or_else(|_| env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        let mut cfg = Self::new(token);
        if let Ok(raw) = env::var("GITHUB_API_URL") {
            cfg = cfg.with_api_url(&raw)?;
        }
        if let Ok(v) = env::var("GITHUB_API_VERSION") {
            cfg.api_version = v;
        }
        if let Ok(v) = env::var("GITHUB_HTTP_TIMEOUT_SECS") {
            cfg.timeout_secs = parse_number("GITHUB_HTTP_TIMEOUT_SECS", &v)?;
        }
        if let Ok(v) = env::var("GITHUB_USER_AGENT") {
            cfg.user_agent = v;
        }
        if let Ok(v) = env::var("GITHUB_MAX_RETRIES") {
            cfg.max_retries = parse_number("GITHUB_MAX_RETRIES", &v)?;
        }
        Ok(cfg)
    }

    /// Point the client at another API root (GitHub Enterprise, mock servers).
    pub fn with_api_url(mut self, raw: &str) -> Result<Self> {
        self.api_url = normalize_base_url(raw)?;
        Ok(self)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

fn default_user_agent() -> String {
    format!("github-rest/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer, got {raw:?}")))
}

// Relative endpoint paths are joined onto the base, so it has to end in '/'
// or Url::join would replace the last segment (e.g. ".../api/v3").
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut s = raw.trim().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    let url = Url::parse(&s)?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("GITHUB_API_URL is not a base URL: {raw}")));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let cfg = Config::new(None)
            .with_api_url("https://ghe.example.com/api/v3")
            .unwrap();
        assert_eq!(cfg.api_url.as_str(), "https://ghe.example.com/api/v3/");
        let joined = cfg.api_url.join("repos/o/r").unwrap();
        assert_eq!(joined.as_str(), "https://ghe.example.com/api/v3/repos/o/r");
    }

    #[test]
    fn rejects_garbage_url() {
        assert!(Config::new(None).with_api_url("not a url").is_err());
    }

    #[test]
    fn number_parsing_reports_variable() {
        let err = parse_number::<u32>("GITHUB_MAX_RETRIES", "many").unwrap_err();
        assert!(err.to_string().contains("GITHUB_MAX_RETRIES"));
        assert_eq!(parse_number::<u64>("X", " 12 ").unwrap(), 12);
    }

    #[test]
    fn defaults() {
        let cfg = Config::new(Some("t".into()));
        assert_eq!(cfg.api_url.as_str(), "https://api.github.com/");
        assert_eq!(cfg.api_version, "2022-11-28");
        assert!(cfg.user_agent.starts_with("github-rest/"));
        assert_eq!(cfg.max_retries, 3);
    }
}
