use github_rest::{Client, Config, Error};
use httpmock::{Method::GET, Method::POST, MockServer};
use serde_json::json;

fn client(server: &MockServer, retries: u32) -> Client {
    let cfg = Config::new(Some("t".into()))
        .with_api_url(&server.base_url())
        .unwrap()
        .with_max_retries(retries);
    Client::new(cfg).unwrap()
}

#[tokio::test]
async fn get_retries_server_errors() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r");
            then.status(502).body("bad gateway");
        })
        .await;

    let err = client(&server, 2).repos().get("o", "r").await.unwrap_err();
    assert_eq!(m.hits_async().await, 3);
    assert_eq!(err.code(), "upstream_error");
    assert!(err.is_retriable());
}

#[tokio::test]
async fn post_is_not_retried_on_server_errors() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/o/r/issues");
            then.status(500).json_body(json!({"message": "boom"}));
        })
        .await;

    let req = github_rest::issues::IssueRequest {
        title: Some("t".into()),
        ..Default::default()
    };
    let err = client(&server, 3)
        .issues()
        .create("o", "r", &req)
        .await
        .unwrap_err();
    assert_eq!(m.hits_async().await, 1);
    assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn drained_limit_refuses_next_call() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r");
            then.status(200)
                .header("x-ratelimit-limit", "5000")
                .header("x-ratelimit-remaining", "0")
                .header("x-ratelimit-used", "5000")
                .header("x-ratelimit-reset", "4102444800")
                .header("x-ratelimit-resource", "core")
                .json_body(json!({"id": 1, "name": "r"}));
        })
        .await;

    let c = client(&server, 0);
    let first = c.repos().get("o", "r").await.unwrap();
    let rate = first.rate.unwrap();
    assert_eq!(rate.remaining, 0);
    assert_eq!(rate.resource.as_deref(), Some("core"));
    assert_eq!(c.last_rate("core").unwrap().limit, 5000);

    let err = c.repos().get("o", "r").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }), "{err:?}");
    assert_eq!(m.hits_async().await, 1);

    // rate_limit itself is always allowed
    let rl = server
        .mock_async(|when, then| {
            when.method(GET).path("/rate_limit");
            then.status(200).json_body(json!({
                "resources": {
                    "core": {"limit": 5000, "remaining": 0, "reset": 4102444800u64, "used": 5000},
                    "search": {"limit": 30, "remaining": 30, "reset": 4102444800u64, "used": 0}
                },
                "rate": {"limit": 5000, "remaining": 0, "reset": 4102444800u64, "used": 5000}
            }));
        })
        .await;
    let limits = c.rate_limit().get().await.unwrap().into_inner();
    assert_eq!(limits.search.unwrap().remaining, 30);
    rl.assert_async().await;
}

#[tokio::test]
async fn primary_limit_response_is_rate_limited() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/branches");
            then.status(403)
                .header("x-ratelimit-limit", "60")
                .header("x-ratelimit-remaining", "0")
                .header("x-ratelimit-reset", "4102444800")
                .json_body(json!({"message": "API rate limit exceeded for 1.2.3.4."}));
        })
        .await;

    let err = client(&server, 3)
        .repos()
        .list_branches("o", "r", &Default::default())
        .await
        .unwrap_err();
    assert_eq!(m.hits_async().await, 1);
    match err {
        Error::RateLimited { rate, .. } => assert_eq!(rate.limit, 60),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn secondary_limit_with_long_wait_is_not_retried() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/pulls");
            then.status(429)
                .header("retry-after", "120")
                .json_body(json!({
                    "message": "You have exceeded a secondary rate limit. Please wait a few minutes before you try again.",
                    "documentation_url": "https://docs.github.com/rest/overview/rate-limits-for-the-rest-api#about-secondary-rate-limits"
                }));
        })
        .await;

    let err = client(&server, 3)
        .pulls()
        .list("o", "r", &Default::default())
        .await
        .unwrap_err();
    assert_eq!(m.hits_async().await, 1);
    match err {
        Error::SecondaryRateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(std::time::Duration::from_secs(120)));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn validation_errors_carry_details() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/o/r/pulls");
            then.status(422).json_body(json!({
                "message": "Validation Failed",
                "errors": [{"resource": "PullRequest", "code": "custom", "message": "No commits between main and main"}],
                "documentation_url": "https://docs.github.com/rest/pulls/pulls#create-a-pull-request"
            }));
        })
        .await;

    let pr = github_rest::pulls::NewPullRequest {
        title: "t".into(),
        head: "main".into(),
        base: "main".into(),
        ..Default::default()
    };
    let err = client(&server, 0)
        .pulls()
        .create("o", "r", &pr)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "validation_failed");
    match &err {
        Error::Api { response, .. } => assert_eq!(response.errors.len(), 1),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(err.to_string().contains("No commits between main and main"));
}

#[tokio::test]
async fn base_url_with_path_prefix() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/repos/o/r/contents/docs/read%20me.md")
                .query_param("ref", "v2");
            then.status(200).json_body(json!({
                "type": "file", "encoding": "base64", "size": 5, "name": "read me.md",
                "path": "docs/read me.md", "content": "aGVsbG8=\n", "sha": "3d21ec53"
            }));
        })
        .await;

    let cfg = Config::new(None)
        .with_api_url(&format!("{}/api/v3", server.base_url()))
        .unwrap()
        .with_max_retries(0);
    let c = Client::new(cfg).unwrap();
    let content = c
        .repos()
        .get_contents("o", "r", "docs/read me.md", Some("v2"))
        .await
        .unwrap()
        .into_inner()
        .into_file()
        .unwrap();
    m.assert_async().await;
    assert_eq!(content.decoded_content().unwrap().unwrap(), b"hello");
}

#[tokio::test]
async fn anonymous_requests_send_no_authorization() {
    let server = MockServer::start_async().await;
    let with_auth = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r").header_exists("authorization");
            then.status(500);
        })
        .await;
    let without = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/o/r")
                .header("accept", "application/vnd.github+json")
                .header_exists("user-agent");
            then.status(200).json_body(json!({"id": 1, "name": "r"}));
        })
        .await;

    let cfg = Config::new(None)
        .with_api_url(&server.base_url())
        .unwrap()
        .with_max_retries(0);
    let repo = Client::new(cfg)
        .unwrap()
        .repos()
        .get("o", "r")
        .await
        .unwrap()
        .into_inner();
    assert_eq!(repo.name, "r");
    assert_eq!(with_auth.hits_async().await, 0);
    without.assert_async().await;
}

#[tokio::test]
async fn directory_contents_are_listed() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/contents/docs");
            then.status(200).json_body(json!([
                {"type": "file", "size": 12, "name": "guide.md", "path": "docs/guide.md", "sha": "a1"},
                {"type": "dir", "size": 0, "name": "img", "path": "docs/img", "sha": "b2"}
            ]));
        })
        .await;

    let contents = client(&server, 0)
        .repos()
        .get_contents("o", "r", "docs/", None)
        .await
        .unwrap()
        .into_inner();
    m.assert_async().await;
    match contents {
        github_rest::repos::Contents::Dir(entries) => {
            let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names, ["guide.md", "img"]);
        }
        other => panic!("unexpected: {other:?}"),
    }
}
