//! GitHub Actions: workflows, runs, jobs and their logs.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::http::{encode_path_segment as seg, Response};
use crate::pagination::ListOptions;
use crate::repos::Repository;
use crate::types::User;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub name: String,
    /// `.github/workflows/ci.yml`.
    pub path: String,
    /// `active`, `deleted`, `disabled_fork`, `disabled_inactivity` or `disabled_manually`.
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflows {
    pub total_count: i64,
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    #[serde(default)]
    pub run_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_attempt: Option<i64>,
    #[serde(default)]
    pub event: String,
    /// `queued`, `in_progress`, `completed`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// `success`, `failure`, `cancelled`, ...; unset until completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub workflow_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggering_actor: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRuns {
    pub total_count: i64,
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListWorkflowRunsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Date range such as `>=2024-01-01` or `2024-01-01..2024-02-01`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_pull_requests: Option<bool>,
    #[serde(flatten)]
    pub list: ListOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    pub number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: i64,
    pub run_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_attempt: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default)]
    pub head_sha: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub steps: Vec<TaskStep>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jobs {
    pub total_count: i64,
    pub jobs: Vec<WorkflowJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListWorkflowJobsOptions {
    /// `latest` (default) or `all` attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(flatten)]
    pub list: ListOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateWorkflowDispatchEventRequest {
    /// Branch or tag to run the workflow on.
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, serde_json::Value>,
}

/// One file extracted from a run's log archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFile {
    pub name: String,
    pub content: String,
}

pub struct ActionsService<'a> {
    client: &'a Client,
}

impl<'a> ActionsService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn base(owner: &str, repo: &str) -> String {
        format!("repos/{}/{}/actions", seg(owner), seg(repo))
    }

    pub async fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> Result<Response<Workflows>> {
        let path = format!("{}/workflows", Self::base(owner, repo));
        self.client.get_with(&path, opts).await
    }

    pub async fn get_workflow_by_id(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: i64,
    ) -> Result<Response<Workflow>> {
        let path = format!("{}/workflows/{}", Self::base(owner, repo), workflow_id);
        self.client.get(&path).await
    }

    pub async fn get_workflow_by_file_name(
        &self,
        owner: &str,
        repo: &str,
        file_name: &str,
    ) -> Result<Response<Workflow>> {
        let path = format!("{}/workflows/{}", Self::base(owner, repo), seg(file_name));
        self.client.get(&path).await
    }

    /// Trigger a `workflow_dispatch` run. GitHub answers 204.
    pub async fn create_workflow_dispatch_event_by_file_name(
        &self,
        owner: &str,
        repo: &str,
        file_name: &str,
        event: &CreateWorkflowDispatchEventRequest,
    ) -> Result<Response<()>> {
        let path = format!(
            "{}/workflows/{}/dispatches",
            Self::base(owner, repo),
            seg(file_name)
        );
        let resp: Response<serde::de::IgnoredAny> = self.client.post(&path, event).await?;
        Ok(resp.map(|_| ()))
    }

    pub async fn list_repository_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        opts: &ListWorkflowRunsOptions,
    ) -> Result<Response<WorkflowRuns>> {
        let path = format!("{}/runs", Self::base(owner, repo));
        self.client.get_with(&path, opts).await
    }

    pub async fn list_workflow_runs_by_id(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: i64,
        opts: &ListWorkflowRunsOptions,
    ) -> Result<Response<WorkflowRuns>> {
        let path = format!("{}/workflows/{}/runs", Self::base(owner, repo), workflow_id);
        self.client.get_with(&path, opts).await
    }

    pub async fn get_workflow_run_by_id(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<Response<WorkflowRun>> {
        let path = format!("{}/runs/{}", Self::base(owner, repo), run_id);
        self.client.get(&path).await
    }

    /// Accepted with 201; the new attempt starts asynchronously.
    pub async fn rerun_workflow_by_id(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<Response<()>> {
        let path = format!("{}/runs/{}/rerun", Self::base(owner, repo), run_id);
        self.client.post_empty(&path).await
    }

    pub async fn rerun_failed_jobs_by_id(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<Response<()>> {
        let path = format!("{}/runs/{}/rerun-failed-jobs", Self::base(owner, repo), run_id);
        self.client.post_empty(&path).await
    }

    /// Accepted with 202; 409 once the run has already completed.
    pub async fn cancel_workflow_run_by_id(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<Response<()>> {
        let path = format!("{}/runs/{}/cancel", Self::base(owner, repo), run_id);
        self.client.post_empty(&path).await
    }

    pub async fn delete_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<Response<()>> {
        let path = format!("{}/runs/{}", Self::base(owner, repo), run_id);
        self.client.delete(&path).await
    }

    pub async fn list_workflow_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
        opts: &ListWorkflowJobsOptions,
    ) -> Result<Response<Jobs>> {
        let path = format!("{}/runs/{}/jobs", Self::base(owner, repo), run_id);
        self.client.get_with(&path, opts).await
    }

    pub async fn get_workflow_job_by_id(
        &self,
        owner: &str,
        repo: &str,
        job_id: i64,
    ) -> Result<Response<WorkflowJob>> {
        let path = format!("{}/jobs/{}", Self::base(owner, repo), job_id);
        self.client.get(&path).await
    }

    /// Plain-text log of one job. GitHub redirects to short-lived storage;
    /// the redirect is followed without forwarding the token. Archives
    /// served instead of text are unpacked and concatenated.
    pub async fn download_workflow_job_logs(
        &self,
        owner: &str,
        repo: &str,
        job_id: i64,
    ) -> Result<Response<String>> {
        let path = format!("{}/jobs/{}/logs", Self::base(owner, repo), job_id);
        let resp = self.client.get_bytes(&path).await?;
        if !resp.value.starts_with(ZIP_MAGIC) {
            return Ok(resp.map(|body| String::from_utf8_lossy(&body).into_owned()));
        }
        let files = extract_logs(&resp.value)?;
        Ok(resp.map(|_| {
            files
                .into_iter()
                .map(|f| f.content)
                .collect::<Vec<_>>()
                .join("\n")
        }))
    }

    /// Every log file of a run, extracted from the ZIP archive GitHub serves.
    pub async fn download_workflow_run_logs(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
    ) -> Result<Response<Vec<LogFile>>> {
        let path = format!("{}/runs/{}/logs", Self::base(owner, repo), run_id);
        let resp = self.client.get_bytes(&path).await?;
        let files = extract_logs(&resp.value)?;
        Ok(resp.map(|_| files))
    }
}

// Files in archive order; directories skipped.
fn extract_logs(bytes: &[u8]) -> Result<Vec<LogFile>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        // Declared sizes are not trusted for allocation.
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(zip::result::ZipError::Io)?;
        files.push(LogFile {
            name: entry.name().to_string(),
            content: String::from_utf8_lossy(&buf).into_owned(),
        });
    }
    debug!("extracted {} log files", files.len());
    Ok(files)
}

/// Keep the last `n` lines of `text`. The flag reports whether anything
/// was cut.
pub fn tail_lines(text: &str, n: usize) -> (String, bool) {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= n {
        return (lines.join("\n"), false);
    }
    (lines[lines.len() - n..].join("\n"), true)
}

/// Drop the RFC 3339 timestamp GitHub puts in front of each log line.
/// Lines without one come back unchanged.
pub fn strip_timestamp(line: &str) -> &str {
    let trimmed = line.trim_start_matches('\u{feff}');
    match trimmed.split_once(' ') {
        Some((stamp, rest)) if DateTime::parse_from_rfc3339(stamp).is_ok() => rest,
        _ => line,
    }
}
