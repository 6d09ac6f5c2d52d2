//! Issues and issue comments.

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::http::{encode_path_segment as seg, Response};
use crate::pagination::{comma_separated, stream_pages, ListOptions};
use crate::types::{Direction, Label, Milestone, Reactions, StateFilter, User};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `open` or `closed`.
    #[serde(default)]
    pub state: String,
    /// `completed`, `not_planned` or `reopened`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_lock_reason: Option<String>,
    #[serde(default)]
    pub comments: i64,
    /// Present when the issue is a pull request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_association: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Body of create and edit. Unset fields are left untouched on edit;
/// `Some(vec![])` clears labels or assignees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSort {
    Created,
    Updated,
    Comments,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueListByRepoOptions {
    /// Milestone number, `*` or `none`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateFilter>,
    /// Login, `*` or `none`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentioned: Option<String>,
    #[serde(
        serialize_with = "comma_separated",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<IssueSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub list: ListOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_association: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueListCommentsOptions {
    /// `created` or `updated`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub list: ListOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LockReason {
    #[serde(rename = "off-topic")]
    OffTopic,
    #[serde(rename = "too heated")]
    TooHeated,
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(rename = "spam")]
    Spam,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockIssueOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
}

#[derive(Serialize)]
struct CommentBody<'b> {
    body: &'b str,
}

pub struct IssuesService<'a> {
    client: &'a Client,
}

impl<'a> IssuesService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Issues and pull requests of a repository, one page.
    pub async fn list_by_repo(
        &self,
        owner: &str,
        repo: &str,
        opts: &IssueListByRepoOptions,
    ) -> Result<Response<Vec<Issue>>> {
        let path = format!("repos/{}/{}/issues", seg(owner), seg(repo));
        self.client.get_with(&path, opts).await
    }

    /// Every matching issue, fetching pages as the stream is polled.
    pub fn list_all_by_repo(
        &self,
        owner: &str,
        repo: &str,
        opts: IssueListByRepoOptions,
    ) -> impl Stream<Item = Result<Issue>> + 'a {
        let client = self.client;
        let path = format!("repos/{}/{}/issues", seg(owner), seg(repo));
        let first = opts.list;
        stream_pages(first, move |list| {
            let query = IssueListByRepoOptions {
                list,
                ..opts.clone()
            };
            let path = path.clone();
            async move { client.get_with(&path, &query).await }
        })
    }

    pub async fn get(&self, owner: &str, repo: &str, number: i64) -> Result<Response<Issue>> {
        let path = format!("repos/{}/{}/issues/{}", seg(owner), seg(repo), number);
        self.client.get(&path).await
    }

    pub async fn create(
        &self,
        owner: &str,
        repo: &str,
        issue: &IssueRequest,
    ) -> Result<Response<Issue>> {
        let path = format!("repos/{}/{}/issues", seg(owner), seg(repo));
        self.client.post(&path, issue).await
    }

    pub async fn edit(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        issue: &IssueRequest,
    ) -> Result<Response<Issue>> {
        let path = format!("repos/{}/{}/issues/{}", seg(owner), seg(repo), number);
        self.client.patch(&path, issue).await
    }

    pub async fn lock(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        opts: &LockIssueOptions,
    ) -> Result<Response<()>> {
        let path = format!("repos/{}/{}/issues/{}/lock", seg(owner), seg(repo), number);
        self.client.put_discard(&path, opts).await
    }

    pub async fn unlock(&self, owner: &str, repo: &str, number: i64) -> Result<Response<()>> {
        let path = format!("repos/{}/{}/issues/{}/lock", seg(owner), seg(repo), number);
        self.client.delete(&path).await
    }

    /// Comments on one issue, or on every issue of the repo when `number` is `None`.
    pub async fn list_comments(
        &self,
        owner: &str,
        repo: &str,
        number: Option<i64>,
        opts: &IssueListCommentsOptions,
    ) -> Result<Response<Vec<IssueComment>>> {
        let path = match number {
            Some(n) => format!("repos/{}/{}/issues/{}/comments", seg(owner), seg(repo), n),
            None => format!("repos/{}/{}/issues/comments", seg(owner), seg(repo)),
        };
        self.client.get_with(&path, opts).await
    }

    pub async fn get_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: i64,
    ) -> Result<Response<IssueComment>> {
        let path = format!(
            "repos/{}/{}/issues/comments/{}",
            seg(owner),
            seg(repo),
            comment_id
        );
        self.client.get(&path).await
    }

    pub async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        body: &str,
    ) -> Result<Response<IssueComment>> {
        let path = format!("repos/{}/{}/issues/{}/comments", seg(owner), seg(repo), number);
        self.client.post(&path, &CommentBody { body }).await
    }

    pub async fn edit_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: i64,
        body: &str,
    ) -> Result<Response<IssueComment>> {
        let path = format!(
            "repos/{}/{}/issues/comments/{}",
            seg(owner),
            seg(repo),
            comment_id
        );
        self.client.patch(&path, &CommentBody { body }).await
    }

    pub async fn delete_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: i64,
    ) -> Result<Response<()>> {
        let path = format!(
            "repos/{}/{}/issues/comments/{}",
            seg(owner),
            seg(repo),
            comment_id
        );
        self.client.delete(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_options_query_shape() {
        let opts = IssueListByRepoOptions {
            state: Some(StateFilter::Closed),
            labels: vec!["bug".into(), "ui".into()],
            sort: Some(IssueSort::Updated),
            direction: Some(Direction::Asc),
            list: ListOptions {
                page: Some(2),
                per_page: Some(10),
            },
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({"state": "closed", "labels": "bug,ui", "sort": "updated", "direction": "asc", "page": 2, "per_page": 10})
        );
    }

    #[test]
    fn edit_request_omits_unset_fields() {
        let req = IssueRequest {
            state: Some("closed".into()),
            labels: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"state": "closed", "labels": []})
        );
    }

    #[test]
    fn lock_reason_wire_values() {
        let v = serde_json::to_value(LockIssueOptions {
            lock_reason: Some(LockReason::OffTopic),
        })
        .unwrap();
        assert_eq!(v, json!({"lock_reason": "off-topic"}));
        assert_eq!(
            serde_json::to_value(LockReason::TooHeated).unwrap(),
            json!("too heated")
        );
    }

    #[test]
    fn pull_request_marker() {
        let issue: Issue = serde_json::from_value(json!({
            "id": 1, "number": 5, "title": "t", "state": "open",
            "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/5"}
        }))
        .unwrap();
        assert!(issue.is_pull_request());
    }
}
