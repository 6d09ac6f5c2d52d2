use std::collections::BTreeMap;
use std::io::Write;

use github_rest::actions::{
    strip_timestamp, tail_lines, CreateWorkflowDispatchEventRequest, ListWorkflowJobsOptions,
    ListWorkflowRunsOptions,
};
use github_rest::{Client, Config, ListOptions};
use httpmock::{Method::DELETE, Method::GET, Method::POST, MockServer};
use serde_json::json;
use zip::write::FileOptions;

fn client(server: &MockServer) -> Client {
    let cfg = Config::new(Some("t".into()))
        .with_api_url(&server.base_url())
        .unwrap()
        .with_max_retries(0);
    Client::new(cfg).unwrap()
}

fn log_archive() -> Vec<u8> {
    let mut bytes: Vec<u8> = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut bytes));
        let options = FileOptions::default();
        writer.start_file("build/1_Set up job.txt", options).unwrap();
        writer
            .write_all(b"2024-03-01T12:00:00.0000000Z Current runner version: '2.313.0'\n")
            .unwrap();
        writer.start_file("build/2_Run tests.txt", options).unwrap();
        writer
            .write_all(b"2024-03-01T12:00:01.0000000Z line1\n2024-03-01T12:00:02.0000000Z line2\n2024-03-01T12:00:03.0000000Z line3\n")
            .unwrap();
        writer.finish().unwrap();
    }
    bytes
}

#[tokio::test]
async fn run_logs_follow_redirect_and_unzip() {
    let server = MockServer::start_async().await;
    let redirect_url = format!("{}/blob/run-logs.zip", server.base_url());
    let redirect = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/actions/runs/100/logs");
            then.status(302).header("location", redirect_url.as_str());
        })
        .await;
    let archive = log_archive();
    let blob = server
        .mock_async(|when, then| {
            when.method(GET).path("/blob/run-logs.zip");
            then.status(200).body(archive.clone());
        })
        .await;

    let files = client(&server)
        .actions()
        .download_workflow_run_logs("o", "r", 100)
        .await
        .unwrap()
        .into_inner();
    redirect.assert_async().await;
    blob.assert_async().await;

    assert_eq!(files.len(), 2);
    assert_eq!(files[1].name, "build/2_Run tests.txt");
    let (tail, truncated) = tail_lines(&files[1].content, 2);
    assert!(truncated);
    let stripped: Vec<&str> = tail.lines().map(strip_timestamp).collect();
    assert_eq!(stripped, ["line2", "line3"]);
}

#[tokio::test]
async fn job_logs_are_text() {
    let server = MockServer::start_async().await;
    let redirect_url = format!("{}/blob/job-42.txt", server.base_url());
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/actions/jobs/42/logs");
            then.status(302).header("location", redirect_url.as_str());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/blob/job-42.txt");
            then.status(200)
                .body("2024-03-01T12:00:00.0000000Z hello\n2024-03-01T12:00:01.0000000Z world\n");
        })
        .await;

    let logs = client(&server)
        .actions()
        .download_workflow_job_logs("o", "r", 42)
        .await
        .unwrap()
        .into_inner();
    assert!(logs.contains("world"));
}

#[tokio::test]
async fn job_logs_served_as_archive_are_joined() {
    let server = MockServer::start_async().await;
    let archive = log_archive();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/actions/jobs/43/logs");
            then.status(200).body(archive.clone());
        })
        .await;

    let logs = client(&server)
        .actions()
        .download_workflow_job_logs("o", "r", 43)
        .await
        .unwrap()
        .into_inner();
    assert!(logs.contains("Current runner version"));
    assert!(logs.contains("line3"));
}

#[tokio::test]
async fn rerun_and_cancel_endpoints() {
    let server = MockServer::start_async().await;
    let rerun = server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/o/r/actions/runs/100/rerun");
            then.status(201).json_body(json!({}));
        })
        .await;
    let rerun_failed = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/repos/o/r/actions/runs/200/rerun-failed-jobs");
            then.status(201);
        })
        .await;
    let cancel = server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/o/r/actions/runs/300/cancel");
            then.status(202).json_body(json!({}));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/repos/o/r/actions/runs/400");
            then.status(204);
        })
        .await;

    let c = client(&server);
    let actions = c.actions();
    assert_eq!(actions.rerun_workflow_by_id("o", "r", 100).await.unwrap().status, 201);
    actions.rerun_failed_jobs_by_id("o", "r", 200).await.unwrap();
    assert_eq!(actions.cancel_workflow_run_by_id("o", "r", 300).await.unwrap().status, 202);
    actions.delete_workflow_run("o", "r", 400).await.unwrap();

    rerun.assert_async().await;
    rerun_failed.assert_async().await;
    cancel.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn cancel_completed_run_is_conflict() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/o/r/actions/runs/5/cancel");
            then.status(409)
                .json_body(json!({"message": "Cannot cancel a workflow run that is completed."}));
        })
        .await;

    let err = client(&server)
        .actions()
        .cancel_workflow_run_by_id("o", "r", 5)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "conflict");
}

#[tokio::test]
async fn dispatch_by_file_name() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/repos/o/r/actions/workflows/deploy.yml/dispatches")
                .json_body(json!({"ref": "main", "inputs": {"environment": "staging"}}));
            then.status(204);
        })
        .await;

    let mut inputs = BTreeMap::new();
    inputs.insert("environment".to_string(), json!("staging"));
    client(&server)
        .actions()
        .create_workflow_dispatch_event_by_file_name(
            "o",
            "r",
            "deploy.yml",
            &CreateWorkflowDispatchEventRequest {
                git_ref: "main".into(),
                inputs,
            },
        )
        .await
        .unwrap();
    m.assert_async().await;
}

#[tokio::test]
async fn workflows_runs_and_jobs() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/actions/workflows");
            then.status(200).json_body(json!({
                "total_count": 1,
                "workflows": [{"id": 161335, "name": "CI", "path": ".github/workflows/ci.yml", "state": "active"}]
            }));
        })
        .await;
    let runs = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/o/r/actions/workflows/161335/runs")
                .query_param("branch", "main")
                .query_param("status", "failure")
                .query_param("per_page", "5");
            then.status(200).json_body(json!({
                "total_count": 1,
                "workflow_runs": [{"id": 30433642, "head_sha": "acb5", "run_number": 562, "event": "push",
                                   "status": "completed", "conclusion": "failure", "workflow_id": 161335}]
            }));
        })
        .await;
    let jobs = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/o/r/actions/runs/30433642/jobs")
                .query_param("filter", "all");
            then.status(200).json_body(json!({
                "total_count": 1,
                "jobs": [{"id": 399444496, "run_id": 30433642, "name": "test", "status": "completed",
                          "conclusion": "failure",
                          "steps": [{"name": "Run tests", "status": "completed", "conclusion": "failure", "number": 2}]}]
            }));
        })
        .await;

    let c = client(&server);
    let actions = c.actions();
    let wf = actions
        .list_workflows("o", "r", &ListOptions::default())
        .await
        .unwrap()
        .into_inner();
    let id = wf.workflows[0].id;

    let failed = actions
        .list_workflow_runs_by_id(
            "o",
            "r",
            id,
            &ListWorkflowRunsOptions {
                branch: Some("main".into()),
                status: Some("failure".into()),
                list: ListOptions::per_page(5),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_inner();
    let run = &failed.workflow_runs[0];
    assert_eq!(run.conclusion.as_deref(), Some("failure"));

    let job_list = actions
        .list_workflow_jobs(
            "o",
            "r",
            run.id,
            &ListWorkflowJobsOptions {
                filter: Some("all".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_inner();
    assert_eq!(job_list.jobs[0].steps[0].name, "Run tests");
    runs.assert_async().await;
    jobs.assert_async().await;
}
