use assert_cmd::Command;
use httpmock::{Method::GET, MockServer};
use predicates::prelude::*;
use serde_json::json;

fn cmd(server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("github-rest").unwrap();
    cmd.env("GITHUB_TOKEN", "t")
        .env("GITHUB_API_URL", server.base_url())
        .env("GITHUB_MAX_RETRIES", "0")
        .env_remove("RUST_LOG")
        .arg("--log-level")
        .arg("warn");
    cmd
}

#[test]
fn version_flag() {
    Command::cargo_bin("github-rest")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("github-rest "));
}

#[test]
fn rules_for_branch_prints_json() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/rules/branches/main");
        then.status(200).json_body(json!([
            {"type": "required_linear_history", "ruleset_source_type": "Repository", "ruleset_source": "o/r", "ruleset_id": 1},
            {"type": "required_deployments", "parameters": {"required_deployment_environments": ["prod"]}, "ruleset_id": 1}
        ]));
    });

    cmd(&server)
        .args(["rules-for-branch", "o", "r", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"required_linear_history\""))
        .stdout(predicate::str::contains("\"required_deployment_environments\""));
    m.assert();
}

#[test]
fn rulesets_include_parents_flag() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/o/r/rulesets")
            .query_param("includes_parents", "true");
        then.status(200)
            .json_body(json!([{"id": 4, "name": "inherited", "enforcement": "active"}]));
    });

    cmd(&server)
        .args(["rulesets", "o", "r", "--include-parents"])
        .assert()
        .success()
        .stdout(predicate::str::contains("inherited"));
    m.assert();
}

#[test]
fn dependabot_secrets_flag() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/dependabot/secrets");
        then.status(200).json_body(json!({
            "total_count": 1,
            "secrets": [{"name": "NPM_TOKEN", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"}]
        }));
    });

    cmd(&server)
        .args(["secrets", "o", "r", "--dependabot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NPM_TOKEN"));
    m.assert();
}

#[test]
fn api_errors_exit_non_zero() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls/3/reviews");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });

    cmd(&server)
        .args(["reviews", "o", "r", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_found"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn events_are_typed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/events");
        then.status(200).json_body(json!([
            {"id": "1", "type": "WatchEvent", "public": true, "payload": {"action": "started"}}
        ]));
    });

    cmd(&server)
        .args(["events", "o", "r"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"WatchEvent\""))
        .stdout(predicate::str::contains("\"started\""));
}
