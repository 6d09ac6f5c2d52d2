//! Pull requests, their commits, files and line comments.

pub mod reviews;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::http::{check_response, encode_path_segment as seg, Response, MEDIA_TYPE_DIFF, MEDIA_TYPE_PATCH};
use crate::pagination::ListOptions;
use crate::repos::Repository;
use crate::types::{Direction, Label, Milestone, User};

pub use reviews::{
    DraftReviewComment, PullRequestReview, PullRequestReviewDismissalRequest,
    PullRequestReviewRequest,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestBranch {
    /// `owner:branch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// `None` when the head repository has been deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<Repository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub number: i64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mergeable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mergeable_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_by: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default)]
    pub requested_reviewers: Vec<User>,
    pub head: PullRequestBranch,
    pub base: PullRequestBranch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_association: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commits: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_files: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    /// Branch name, or `owner:branch` for cross-repository requests.
    pub head: String,
    pub base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_can_modify: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestEditRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_can_modify: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<crate::types::StateFilter>,
    /// `user:ref-name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// `created`, `updated`, `popularity` or `long-running`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(flatten)]
    pub list: ListOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    Merge,
    Squash,
    Rebase,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestMergeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Head must still point here or the merge is refused with 409.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_method: Option<MergeMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestMergeResult {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<CommitAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitItem {
    pub sha: String,
    pub commit: CommitDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestFile {
    pub sha: String,
    pub filename: String,
    /// `added`, `removed`, `modified`, `renamed`, `copied`, `changed` or `unchanged`.
    pub status: String,
    #[serde(default)]
    pub additions: i64,
    #[serde(default)]
    pub deletions: i64,
    #[serde(default)]
    pub changes: i64,
    /// Omitted for binary files and very large diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_url: Option<String>,
}

/// A comment on a line of the diff. Used both as response and request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_review_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<i64>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_hunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<i64>,
    /// `LEFT` or `RIGHT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFormat {
    Diff,
    Patch,
}

impl RawFormat {
    fn media_type(self) -> &'static str {
        match self {
            RawFormat::Diff => MEDIA_TYPE_DIFF,
            RawFormat::Patch => MEDIA_TYPE_PATCH,
        }
    }
}

pub struct PullsService<'a> {
    client: &'a Client,
}

impl<'a> PullsService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        owner: &str,
        repo: &str,
        opts: &PullRequestListOptions,
    ) -> Result<Response<Vec<PullRequest>>> {
        let path = format!("repos/{}/{}/pulls", seg(owner), seg(repo));
        self.client.get_with(&path, opts).await
    }

    pub async fn get(&self, owner: &str, repo: &str, number: i64) -> Result<Response<PullRequest>> {
        let path = format!("repos/{}/{}/pulls/{}", seg(owner), seg(repo), number);
        self.client.get(&path).await
    }

    /// The pull request rendered as a unified diff or as a patch series.
    pub async fn get_raw(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        format: RawFormat,
    ) -> Result<Response<String>> {
        let path = format!("repos/{}/{}/pulls/{}", seg(owner), seg(repo), number);
        self.client.get_text(&path, format.media_type()).await
    }

    pub async fn create(
        &self,
        owner: &str,
        repo: &str,
        pull: &NewPullRequest,
    ) -> Result<Response<PullRequest>> {
        let path = format!("repos/{}/{}/pulls", seg(owner), seg(repo));
        self.client.post(&path, pull).await
    }

    pub async fn edit(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        edit: &PullRequestEditRequest,
    ) -> Result<Response<PullRequest>> {
        let path = format!("repos/{}/{}/pulls/{}", seg(owner), seg(repo), number);
        self.client.patch(&path, edit).await
    }

    /// 204 means merged, 404 means not merged; anything else is an error.
    pub async fn is_merged(&self, owner: &str, repo: &str, number: i64) -> Result<bool> {
        let path = format!("repos/{}/{}/pulls/{}/merge", seg(owner), seg(repo), number);
        let raw = self.client.get_raw(&path).await?;
        match raw.status {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => check_response(raw).map(|_| false),
        }
    }

    /// 405 when the pull request is not mergeable, 409 when `sha` is stale.
    pub async fn merge(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        req: &PullRequestMergeRequest,
    ) -> Result<Response<PullRequestMergeResult>> {
        let path = format!("repos/{}/{}/pulls/{}/merge", seg(owner), seg(repo), number);
        self.client.put(&path, req).await
    }

    pub async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        opts: &ListOptions,
    ) -> Result<Response<Vec<CommitItem>>> {
        let path = format!("repos/{}/{}/pulls/{}/commits", seg(owner), seg(repo), number);
        self.client.get_with(&path, opts).await
    }

    pub async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        opts: &ListOptions,
    ) -> Result<Response<Vec<PullRequestFile>>> {
        let path = format!("repos/{}/{}/pulls/{}/files", seg(owner), seg(repo), number);
        self.client.get_with(&path, opts).await
    }

    pub async fn list_comments(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        opts: &ListOptions,
    ) -> Result<Response<Vec<PullRequestComment>>> {
        let path = format!("repos/{}/{}/pulls/{}/comments", seg(owner), seg(repo), number);
        self.client.get_with(&path, opts).await
    }

    /// New line comment, or a reply when `in_reply_to_id` is set.
    pub async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        comment: &PullRequestComment,
    ) -> Result<Response<PullRequestComment>> {
        let path = format!("repos/{}/{}/pulls/{}/comments", seg(owner), seg(repo), number);
        self.client.post(&path, comment).await
    }
}
