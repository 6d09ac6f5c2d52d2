//! List options and `Link` header pagination.

use std::future::Future;

use futures::stream::{self, Stream, TryStreamExt};
use reqwest::header::{HeaderMap, LINK};
use serde::{Serialize, Serializer};
use url::Url;

use crate::error::{Error, Result};
use crate::http::Response;

/// Page-number pagination, flattened into list option structs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl ListOptions {
    pub fn per_page(per_page: u32) -> Self {
        Self {
            page: None,
            per_page: Some(per_page),
        }
    }
}

/// Navigation extracted from the `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pages {
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
    pub first_page: Option<u32>,
    pub last_page: Option<u32>,
    /// Set when the next link carries a non-numeric `page` token.
    pub next_page_token: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl Pages {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default()
    }

    pub fn has_next(&self) -> bool {
        self.next_page.is_some() || self.next_page_token.is_some() || self.after.is_some()
    }
}

/// Parse a header such as
/// `<https://api.github.com/repositories/1/issues?page=2>; rel="next", <...&page=5>; rel="last"`.
pub fn parse_link_header(link: &str) -> Pages {
    let mut pages = Pages::default();

    for part in link.split(',') {
        let mut url = None;
        let mut rel = None;
        for segment in part.split(';').map(str::trim) {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Url::parse(inner).ok();
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"'));
            }
        }
        let (Some(url), Some(rel)) = (url, rel) else {
            continue;
        };

        for (key, value) in url.query_pairs() {
            match (rel, key.as_ref()) {
                ("next", "page") => match value.parse::<u32>() {
                    Ok(n) => pages.next_page = Some(n),
                    Err(_) => pages.next_page_token = Some(value.into_owned()),
                },
                ("next", "after") => pages.after = Some(value.into_owned()),
                ("prev", "page") => pages.prev_page = value.parse().ok(),
                ("prev", "before") => pages.before = Some(value.into_owned()),
                ("first", "page") => pages.first_page = value.parse().ok(),
                ("last", "page") => pages.last_page = value.parse().ok(),
                _ => {}
            }
        }
    }

    pages
}

/// Follow `next_page` links, yielding items one by one.
///
/// `fetch` is called with the options for each page, starting from `first`.
pub fn stream_pages<'a, T, F, Fut>(first: ListOptions, mut fetch: F) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    F: FnMut(ListOptions) -> Fut + 'a,
    Fut: Future<Output = Result<Response<Vec<T>>>> + 'a,
{
    let per_page = first.per_page;
    stream::try_unfold(Some(first), move |state| {
        let pending = state.map(&mut fetch);
        async move {
            let Some(pending) = pending else {
                return Ok::<_, Error>(None);
            };
            let resp = pending.await?;
            let next = resp.pages.next_page.map(|page| ListOptions {
                page: Some(page),
                per_page,
            });
            let items = stream::iter(resp.value.into_iter().map(Ok::<T, Error>));
            Ok(Some((items, next)))
        }
    })
    .try_flatten()
}

/// Serialize a list as GitHub's comma-separated query form; `labels=a,b`.
pub(crate) fn comma_separated<S>(values: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&values.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_numbers() {
        let pages = parse_link_header(
            "<https://api.github.com/repositories/1/issues?per_page=2&page=3>; rel=\"next\", \
             <https://api.github.com/repositories/1/issues?per_page=2&page=1>; rel=\"prev\", \
             <https://api.github.com/repositories/1/issues?per_page=2&page=1>; rel=\"first\", \
             <https://api.github.com/repositories/1/issues?per_page=2&page=9>; rel=\"last\"",
        );
        assert_eq!(pages.next_page, Some(3));
        assert_eq!(pages.prev_page, Some(1));
        assert_eq!(pages.first_page, Some(1));
        assert_eq!(pages.last_page, Some(9));
        assert!(pages.has_next());
    }

    #[test]
    fn parses_cursors_and_tokens() {
        let pages = parse_link_header(
            "<https://api.github.com/orgs/o/audit-log?after=MTY%3D&before=>; rel=\"next\", \
             <https://api.github.com/orgs/o/audit-log?before=MTA%3D>; rel=\"prev\", \
             <https://api.github.com/user/repos?page=xyz>; rel=\"next\"",
        );
        assert_eq!(pages.after.as_deref(), Some("MTY="));
        assert_eq!(pages.before.as_deref(), Some("MTA="));
        assert_eq!(pages.next_page_token.as_deref(), Some("xyz"));
        assert_eq!(pages.next_page, None);
    }

    #[test]
    fn garbage_is_ignored() {
        assert_eq!(parse_link_header("nonsense; rel=next"), Pages::default());
        assert!(!Pages::default().has_next());
    }

    #[test]
    fn list_options_query() {
        #[derive(Serialize)]
        struct Opts {
            #[serde(skip_serializing_if = "Option::is_none")]
            state: Option<&'static str>,
            #[serde(flatten)]
            list: ListOptions,
        }
        let q = Opts {
            state: Some("open"),
            list: ListOptions {
                page: Some(2),
                per_page: None,
            },
        };
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(v, serde_json::json!({"state": "open", "page": 2}));
    }
}
