//! Repositories, branches and file contents.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::http::{encode_path_segment as seg, Response};
use crate::pagination::ListOptions;
use crate::types::User;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
    #[serde(default)]
    pub private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    /// `public`, `private` or `internal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stargazers_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_issues_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: BranchCommit,
    #[serde(default)]
    pub protected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(flatten)]
    pub list: ListOptions,
}

/// A file, or one entry of a directory listing, from the contents API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default)]
    pub size: i64,
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl RepositoryContent {
    /// File bytes. GitHub wraps the base64 payload at 60 columns, so line
    /// breaks are dropped before decoding. `None` when no content was sent
    /// (directories, files over 1 MB).
    pub fn decoded_content(&self) -> Result<Option<Vec<u8>>> {
        let Some(content) = &self.content else {
            return Ok(None);
        };
        // Files over 1 MB come back as `"encoding": "none"` with no payload.
        if self.encoding.as_deref() == Some("none") || (content.is_empty() && self.size > 0) {
            return Ok(None);
        }
        if self.encoding.as_deref().is_some_and(|e| e != "base64") {
            return Ok(Some(content.as_bytes().to_vec()));
        }
        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
        Ok(Some(bytes))
    }
}

/// What a contents path resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Dir(Vec<RepositoryContent>),
    File(Box<RepositoryContent>),
}

impl Contents {
    pub fn into_file(self) -> Option<RepositoryContent> {
        match self {
            Contents::File(f) => Some(*f),
            Contents::Dir(_) => None,
        }
    }
}

#[derive(Serialize)]
struct ContentsQuery<'q> {
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    git_ref: Option<&'q str>,
}

pub struct ReposService<'a> {
    client: &'a Client,
}

impl<'a> ReposService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, owner: &str, repo: &str) -> Result<Response<Repository>> {
        self.client
            .get(&format!("repos/{}/{}", seg(owner), seg(repo)))
            .await
    }

    pub async fn list_branches(
        &self,
        owner: &str,
        repo: &str,
        opts: &BranchListOptions,
    ) -> Result<Response<Vec<Branch>>> {
        let path = format!("repos/{}/{}/branches", seg(owner), seg(repo));
        self.client.get_with(&path, opts).await
    }

    /// A file, or the listing of a directory. `path` keeps its slashes;
    /// each component is encoded separately.
    pub async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Response<Contents>> {
        let file = path
            .trim_matches('/')
            .split('/')
            .map(seg)
            .collect::<Vec<_>>()
            .join("/");
        let url = format!("repos/{}/{}/contents/{}", seg(owner), seg(repo), file);
        self.client.get_with(&url, &ContentsQuery { git_ref }).await
    }
}
