//! Error type shared by every service.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rate_limit::Rate;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("GitHub API error ({status}): {response}")]
    Api {
        status: StatusCode,
        response: ErrorResponse,
    },

    #[error("rate limit exceeded ({message}); resets at {}", .rate.reset.to_rfc3339())]
    RateLimited { rate: Rate, message: String },

    #[error("secondary rate limit triggered ({message}); retry after {retry_after:?}")]
    SecondaryRateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("log archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid rule: {0}")]
    Rule(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl Error {
    /// Stable short code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Api { status, .. } => status_code_name(*status),
            Error::RateLimited { .. } | Error::SecondaryRateLimited { .. } => "rate_limited",
            Error::Http(e) if e.is_timeout() || e.is_connect() => "upstream_error",
            Error::Http(_) => "server_error",
            Error::Decode(_) | Error::Base64(_) | Error::Archive(_) | Error::Rule(_) => {
                "decode_error"
            }
            Error::Url(_) | Error::Config(_) => "config_error",
            Error::Unsupported(_) => "unsupported",
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Api { status, .. } => status_is_retriable(*status),
            Error::RateLimited { .. } | Error::SecondaryRateLimited { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// HTTP status of an API-level failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub fn status_code_name(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::UNPROCESSABLE_ENTITY => "validation_failed",
        StatusCode::TOO_MANY_REQUESTS => "rate_limited",
        s if s.is_server_error() => "upstream_error",
        _ => "server_error",
    }
}

pub fn status_is_retriable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Body GitHub sends with most non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ErrorResponse {
    /// Fallback when the body is not GitHub's error document.
    pub fn from_text(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| ErrorResponse {
            message: text.trim().to_string(),
            ..Default::default()
        })
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.errors.is_empty() {
            let details: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", details.join("; "))?;
        }
        Ok(())
    }
}

/// One entry of `errors[]`; GitHub uses both objects and bare strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Field {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Message(String),
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Message(m) => f.write_str(m),
            ErrorDetail::Field {
                resource,
                field,
                code,
                message,
            } => {
                if let Some(m) = message {
                    return f.write_str(m);
                }
                write!(
                    f,
                    "{} {} {}",
                    resource.as_deref().unwrap_or("-"),
                    field.as_deref().unwrap_or("-"),
                    code.as_deref().unwrap_or("-")
                )
            }
        }
    }
}
