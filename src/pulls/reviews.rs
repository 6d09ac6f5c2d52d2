//! Pull request reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PullRequestComment, PullsService};
use crate::error::Result;
use crate::http::{encode_path_segment as seg, Response};
use crate::pagination::ListOptions;
use crate::types::User;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestReview {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `APPROVED`, `CHANGES_REQUESTED`, `COMMENTED`, `DISMISSED` or `PENDING`.
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_association: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_url: Option<String>,
    /// Absent on pending reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A line comment bundled into a new review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DraftReviewComment {
    pub path: String,
    pub body: String,
    /// Legacy diff position; prefer `line` and `side`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_side: Option<String>,
}

/// Body for creating a review, and for submitting a pending one.
/// Without `event` the review stays pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `APPROVE`, `REQUEST_CHANGES` or `COMMENT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<DraftReviewComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestReviewDismissalRequest {
    pub message: String,
    /// Must be `DISMISS` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

#[derive(Serialize)]
struct ReviewBody<'b> {
    body: &'b str,
}

fn review_path(owner: &str, repo: &str, number: i64) -> String {
    format!("repos/{}/{}/pulls/{}/reviews", seg(owner), seg(repo), number)
}

impl PullsService<'_> {
    pub async fn list_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        opts: &ListOptions,
    ) -> Result<Response<Vec<PullRequestReview>>> {
        self.client
            .get_with(&review_path(owner, repo, number), opts)
            .await
    }

    pub async fn get_review(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        review_id: i64,
    ) -> Result<Response<PullRequestReview>> {
        let path = format!("{}/{}", review_path(owner, repo, number), review_id);
        self.client.get(&path).await
    }

    /// Only pending reviews can be deleted; the deleted review is returned.
    pub async fn delete_pending_review(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        review_id: i64,
    ) -> Result<Response<PullRequestReview>> {
        let path = format!("{}/{}", review_path(owner, repo, number), review_id);
        self.client.delete_json(&path).await
    }

    pub async fn list_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        review_id: i64,
        opts: &ListOptions,
    ) -> Result<Response<Vec<PullRequestComment>>> {
        let path = format!("{}/{}/comments", review_path(owner, repo, number), review_id);
        self.client.get_with(&path, opts).await
    }

    pub async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        review: &PullRequestReviewRequest,
    ) -> Result<Response<PullRequestReview>> {
        self.client
            .post(&review_path(owner, repo, number), review)
            .await
    }

    /// Replace the summary text of a review.
    pub async fn update_review(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        review_id: i64,
        body: &str,
    ) -> Result<Response<PullRequestReview>> {
        let path = format!("{}/{}", review_path(owner, repo, number), review_id);
        self.client.put(&path, &ReviewBody { body }).await
    }

    pub async fn submit_review(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        review_id: i64,
        review: &PullRequestReviewRequest,
    ) -> Result<Response<PullRequestReview>> {
        let path = format!("{}/{}/events", review_path(owner, repo, number), review_id);
        self.client.post(&path, review).await
    }

    pub async fn dismiss_review(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        review_id: i64,
        dismissal: &PullRequestReviewDismissalRequest,
    ) -> Result<Response<PullRequestReview>> {
        let path = format!("{}/{}/dismissals", review_path(owner, repo, number), review_id);
        self.client.put(&path, dismissal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pending_review_request_has_no_event() {
        let req = PullRequestReviewRequest {
            body: Some("looks fine".into()),
            comments: vec![DraftReviewComment {
                path: "src/lib.rs".into(),
                body: "nit".into(),
                line: Some(3),
                side: Some("RIGHT".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "body": "looks fine",
                "comments": [{"path": "src/lib.rs", "body": "nit", "line": 3, "side": "RIGHT"}]
            })
        );
    }

    #[test]
    fn pending_review_has_no_submitted_at() {
        let r: PullRequestReview =
            serde_json::from_value(json!({"id": 80, "state": "PENDING", "body": ""})).unwrap();
        assert_eq!(r.state, "PENDING");
        assert!(r.submitted_at.is_none());
    }
}
