//! Public activity events. The `payload` of an event has a different shape
//! for every event `type`; [`decode_payload`] picks it.

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::error::Result;
use crate::http::{encode_path_segment as seg, Response};
use crate::issues::{Issue, IssueComment};
use crate::pagination::ListOptions;
use crate::pulls::{PullRequest, PullRequestComment, PullRequestReview};
use crate::repos::Repository;
use crate::types::User;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRepo {
    pub id: i64,
    /// `owner/name`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEvent")]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<EventRepo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub payload: EventPayload,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    actor: Option<User>,
    #[serde(default)]
    repo: Option<EventRepo>,
    #[serde(default)]
    org: Option<User>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    payload: Value,
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        let payload = decode_payload(&raw.event_type, raw.payload);
        Event {
            id: raw.id,
            event_type: raw.event_type,
            public: raw.public,
            actor: raw.actor,
            repo: raw.repo,
            org: raw.org,
            created_at: raw.created_at,
            payload,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEventCommit {
    pub sha: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_size: Option<i64>,
    /// Full ref, `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub head: String,
    pub before: String,
    #[serde(default)]
    pub commits: Vec<PushEventCommit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEvent {
    /// `None` when a repository was created.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// `repository`, `branch` or `tag`.
    pub ref_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pusher_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pusher_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkEvent {
    pub forkee: Repository,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Always `started`.
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuesEvent {
    pub action: String,
    pub issue: Issue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<crate::types::Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub issue: Issue,
    pub comment: IssueComment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: i64,
    pub pull_request: PullRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestReviewEvent {
    pub action: String,
    pub review: PullRequestReview,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestReviewCommentEvent {
    pub action: String,
    pub comment: PullRequestComment,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_commitish: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    pub action: String,
    pub release: Release,
}

/// Typed event payload. Serializes as the bare payload object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Push(PushEvent),
    Create(CreateEvent),
    Delete(DeleteEvent),
    Fork(Box<ForkEvent>),
    Watch(WatchEvent),
    Issues(Box<IssuesEvent>),
    IssueComment(Box<IssueCommentEvent>),
    PullRequest(Box<PullRequestEvent>),
    PullRequestReview(Box<PullRequestReviewEvent>),
    PullRequestReviewComment(Box<PullRequestReviewCommentEvent>),
    Release(Box<ReleaseEvent>),
    /// Event types without a typed shape, and payloads that did not fit theirs.
    Other(Value),
}

fn typed<T, F>(value: Value, wrap: F) -> std::result::Result<EventPayload, (serde_json::Error, Value)>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> EventPayload,
{
    // Decoding consumes the value; keep a copy to fall back on.
    match T::deserialize(&value) {
        Ok(t) => Ok(wrap(t)),
        Err(e) => Err((e, value)),
    }
}

/// Decode `payload` into the shape named by `event_type`. Unknown types are
/// kept raw; so are known types whose payload does not match, with a warning.
pub fn decode_payload(event_type: &str, payload: Value) -> EventPayload {
    let decoded = match event_type {
        "PushEvent" => typed(payload, EventPayload::Push),
        "CreateEvent" => typed(payload, EventPayload::Create),
        "DeleteEvent" => typed(payload, EventPayload::Delete),
        "ForkEvent" => typed(payload, |p| EventPayload::Fork(Box::new(p))),
        "WatchEvent" => typed(payload, EventPayload::Watch),
        "IssuesEvent" => typed(payload, |p| EventPayload::Issues(Box::new(p))),
        "IssueCommentEvent" => typed(payload, |p| EventPayload::IssueComment(Box::new(p))),
        "PullRequestEvent" => typed(payload, |p| EventPayload::PullRequest(Box::new(p))),
        "PullRequestReviewEvent" => {
            typed(payload, |p| EventPayload::PullRequestReview(Box::new(p)))
        }
        "PullRequestReviewCommentEvent" => typed(payload, |p| {
            EventPayload::PullRequestReviewComment(Box::new(p))
        }),
        "ReleaseEvent" => typed(payload, |p| EventPayload::Release(Box::new(p))),
        _ => return EventPayload::Other(payload),
    };
    decoded.unwrap_or_else(|(e, raw)| {
        warn!("{} payload kept raw: {}", event_type, e);
        EventPayload::Other(raw)
    })
}

pub struct ActivityService<'a> {
    client: &'a Client,
}

impl<'a> ActivityService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Public events across GitHub. Delayed by up to five minutes.
    pub async fn list_events(&self, opts: &ListOptions) -> Result<Response<Vec<Event>>> {
        self.client.get_with("events", opts).await
    }

    pub async fn list_repository_events(
        &self,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> Result<Response<Vec<Event>>> {
        let path = format!("repos/{}/{}/events", seg(owner), seg(repo));
        self.client.get_with(&path, opts).await
    }

    pub async fn list_events_for_organization(
        &self,
        org: &str,
        opts: &ListOptions,
    ) -> Result<Response<Vec<Event>>> {
        let path = format!("orgs/{}/events", seg(org));
        self.client.get_with(&path, opts).await
    }

    /// Events by `user`. Private events are included when the token belongs
    /// to that user, unless `public_only` is set.
    pub async fn list_events_performed_by_user(
        &self,
        user: &str,
        public_only: bool,
        opts: &ListOptions,
    ) -> Result<Response<Vec<Event>>> {
        let path = if public_only {
            format!("users/{}/events/public", seg(user))
        } else {
            format!("users/{}/events", seg(user))
        };
        self.client.get_with(&path, opts).await
    }

    /// Events from repositories and people `user` watches or follows.
    pub async fn list_events_received_by_user(
        &self,
        user: &str,
        public_only: bool,
        opts: &ListOptions,
    ) -> Result<Response<Vec<Event>>> {
        let path = if public_only {
            format!("users/{}/received_events/public", seg(user))
        } else {
            format!("users/{}/received_events", seg(user))
        };
        self.client.get_with(&path, opts).await
    }
}
