//! HTTP server for the bot.
//!
//! # Endpoints
//!
//! - `POST /webhook` - accepts GitHub webhook deliveries, verifies the
//!   signature, and dispatches the event inline
//! - `GET /health` - liveness probe, no auth

use std::sync::Arc;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

use crate::dispatch::Dispatcher;

/// Shared application state, passed to handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Webhook secret for HMAC-SHA256 signature verification. Empty means
    /// verification is skipped (local development only).
    webhook_secret: Vec<u8>,

    /// The routing core.
    dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(webhook_secret: impl Into<Vec<u8>>, dispatcher: Dispatcher) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                dispatcher,
            }),
        }
    }

    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Limits;
    use crate::github::{ChangedFile, IssueDetails, PrDetails};
    use crate::prompts::PromptConfig;
    use crate::test_support::{FakeGitHub, FakeLlm, init_git_fixture};
    use crate::types::{IssueNumber, PrNumber};
    use crate::webhooks::{compute_signature, format_signature_header};

    const SECRET: &[u8] = b"test-secret";

    fn app(
        github: Arc<FakeGitHub>,
        llm: Arc<FakeLlm>,
        prompts: PromptConfig,
        clone_base: &str,
    ) -> axum::Router {
        let dispatcher = Dispatcher::new(github, llm, prompts, Limits::default(), clone_base);
        build_router(AppState::new(SECRET.to_vec(), dispatcher))
    }

    fn webhook_request(event_type: &str, body: &serde_json::Value, secret: &[u8]) -> Request<Body> {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let signature = format_signature_header(&compute_signature(&body_bytes, secret));

        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-github-event", event_type)
            .header("x-github-delivery", "550e8400-e29b-41d4-a716-446655440000")
            .header("x-hub-signature-256", signature)
            .body(Body::from(body_bytes))
            .unwrap()
    }

    fn issue_comment_payload(body: &str, on_pr: bool) -> serde_json::Value {
        let mut issue = serde_json::json!({ "number": 42 });
        if on_pr {
            issue["pull_request"] = serde_json::json!({ "url": "https://api.github.com/x" });
        }
        serde_json::json!({
            "action": "created",
            "comment": { "id": 7001, "body": body, "user": { "login": "dev" } },
            "issue": issue,
            "repository": { "owner": { "login": "octocat" }, "name": "hello-world" }
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ─── Health ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_reports_service_name() {
        let app = app(
            Arc::new(FakeGitHub::new()),
            Arc::new(FakeLlm::with_responses(vec![])),
            PromptConfig::built_in_default(),
            "/x",
        );

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "ansieyes");
    }

    // ─── Scenario F: tampered body ────────────────────────────────────────────

    #[tokio::test]
    async fn tampered_body_is_unauthorized_and_nothing_runs() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let app = app(github.clone(), llm.clone(), PromptConfig::built_in_default(), "/x");

        let payload = issue_comment_payload("\\ansieyes_triage", false);
        let mut body_bytes = serde_json::to_vec(&payload).unwrap();
        let signature = format_signature_header(&compute_signature(&body_bytes, SECRET));
        // Flip one byte after signing
        body_bytes[10] ^= 0x01;

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-github-event", "issue_comment")
            .header("x-hub-signature-256", signature)
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(github.comments().is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn missing_signature_is_unauthorized() {
        let app = app(
            Arc::new(FakeGitHub::new()),
            Arc::new(FakeLlm::with_responses(vec![])),
            PromptConfig::built_in_default(),
            "/x",
        );

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-github-event", "issue_comment")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ─── Scenario A: triage with defaults ─────────────────────────────────────

    #[tokio::test]
    async fn triage_command_runs_pipeline_with_defaults() {
        // Local fixture repo with no triage.config.json
        let base = tempfile::tempdir().unwrap();
        init_git_fixture(
            base.path().join("octocat").join("hello-world").as_path(),
            &[("src/parser.rs", "pub fn parse() {}\n")],
        );

        let github = Arc::new(FakeGitHub::new().with_issue(IssueDetails {
            number: IssueNumber(42),
            title: "Parser crashes".to_string(),
            body: "It crashes on empty input.".to_string(),
        }));
        let llm = Arc::new(FakeLlm::with_responses(vec![
            // duplicate window is empty, so first call is the librarian
            r#"{"relevant_files": ["src/parser.rs"]}"#.to_string(),
            r#"{
                "issue_type": "bug",
                "severity": "medium",
                "confidence_score": 0.7,
                "analysis_summary": "Missing guard.",
                "root_cause_analysis": {"primary_cause": "No empty check."},
                "proposed_solutions": [{"description": "Add a check."}]
            }"#
            .to_string(),
        ]));
        let app = app(
            github.clone(),
            llm.clone(),
            PromptConfig::built_in_default(),
            base.path().to_str().unwrap(),
        );

        let request = webhook_request(
            "issue_comment",
            &issue_comment_payload("\\ansieyes_triage", false),
            SECRET,
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "processed");

        // One consolidated comment, ai-triaged at minimum
        let comments = github.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].2.contains("AI Two-Pass Issue Triage"));
        let labels: Vec<String> = github.labels_added().into_iter().map(|(_, l)| l).collect();
        assert!(labels.contains(&"ai-triaged".to_string()));
    }

    // ─── Scenario B: near-miss command ────────────────────────────────────────

    #[tokio::test]
    async fn near_miss_command_gets_no_response_at_all() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let app = app(github.clone(), llm.clone(), PromptConfig::built_in_default(), "/x");

        let request = webhook_request(
            "issue_comment",
            &issue_comment_payload("\\ansieyes_triage please", false),
            SECRET,
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ignored");
        assert!(github.comments().is_empty());
        assert_eq!(llm.calls(), 0);
    }

    // ─── Scenario C: wrong entity ─────────────────────────────────────────────

    #[tokio::test]
    async fn triage_on_pr_gets_validation_error_comment() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let app = app(github.clone(), llm.clone(), PromptConfig::built_in_default(), "/x");

        let request = webhook_request(
            "issue_comment",
            &issue_comment_payload("\\ansieyes_triage", true),
            SECRET,
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "processed");

        let comments = github.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].2.contains("\\ansieyes_prreview"));
        assert_eq!(llm.calls(), 0);
    }

    // ─── Scenario D: PR opened review ─────────────────────────────────────────

    #[tokio::test]
    async fn pr_opened_reviews_three_files() {
        let files: Vec<ChangedFile> = ["src/a.rs", "src/b.rs", "src/c.rs"]
            .iter()
            .map(|name| ChangedFile {
                filename: name.to_string(),
                status: "modified".to_string(),
                additions: 5,
                deletions: 1,
                patch: Some("+x".to_string()),
            })
            .collect();

        let github = Arc::new(
            FakeGitHub::new()
                .with_pr(
                    PrNumber(7),
                    PrDetails {
                        number: PrNumber(7),
                        title: "Improve parsing".to_string(),
                        body: String::new(),
                    },
                )
                .with_changed_files(files),
        );
        let llm = Arc::new(FakeLlm::with_responses(vec![
            "## Overall Assessment\nSolid.\n## Issues\n## Suggestions".to_string(),
        ]));
        let app = app(github.clone(), llm.clone(), PromptConfig::built_in_default(), "/x");

        let payload = serde_json::json!({
            "action": "opened",
            "pull_request": { "number": 7, "title": "Improve parsing", "body": null },
            "repository": { "owner": { "login": "octocat" }, "name": "hello-world" }
        });
        let response = app
            .oneshot(webhook_request("pull_request", &payload, SECRET))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "processed");

        let comments = github.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].2.contains("Overall Assessment") || comments[0].2.contains("Solid."));
        assert!(comments[0].2.contains("Reviewed 3 file(s)"));
    }

    // ─── Scenario E: profile selection ────────────────────────────────────────

    #[tokio::test]
    async fn ansible_repo_review_uses_network_profile() {
        let prompts = PromptConfig::from_json(
            r#"{
                "repo_mappings": { "network": ["github.com/.*/ansible.*"] },
                "prompts": {
                    "default": {
                        "system_role": "default reviewer",
                        "review_structure": "s",
                        "workflow_analysis_template": "w"
                    },
                    "network": {
                        "system_role": "You review network automation code.",
                        "review_structure": "s",
                        "workflow_analysis_template": "w"
                    }
                }
            }"#,
        )
        .unwrap();

        let github = Arc::new(
            FakeGitHub::new()
                .with_pr(
                    PrNumber(1),
                    PrDetails {
                        number: PrNumber(1),
                        title: "t".to_string(),
                        body: String::new(),
                    },
                )
                .with_changed_files(vec![]),
        );
        let llm = Arc::new(FakeLlm::with_responses(vec!["ok".to_string()]));
        let app = app(github.clone(), llm.clone(), prompts, "/x");

        let payload = serde_json::json!({
            "action": "opened",
            "pull_request": { "number": 1, "title": "t", "body": "" },
            "repository": { "owner": { "login": "org" }, "name": "ansible-playbooks" }
        });
        let response = app
            .oneshot(webhook_request("pull_request", &payload, SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The network profile's system role flowed into the prompt
        let prompts_seen = llm.prompts();
        assert_eq!(prompts_seen.len(), 1);
        assert!(prompts_seen[0].contains("You review network automation code."));
    }

    // ─── Irrelevant events ────────────────────────────────────────────────────

    #[tokio::test]
    async fn unknown_event_kind_is_acknowledged() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let app = app(github.clone(), llm.clone(), PromptConfig::built_in_default(), "/x");

        let response = app
            .oneshot(webhook_request("star", &serde_json::json!({}), SECRET))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ignored");
    }

    #[tokio::test]
    async fn malformed_payload_is_bad_request() {
        let app = app(
            Arc::new(FakeGitHub::new()),
            Arc::new(FakeLlm::with_responses(vec![])),
            PromptConfig::built_in_default(),
            "/x",
        );

        let body_bytes = b"not json".to_vec();
        let signature = format_signature_header(&compute_signature(&body_bytes, SECRET));
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-github-event", "issue_comment")
            .header("x-hub-signature-256", signature)
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_secret_skips_verification() {
        let github = Arc::new(FakeGitHub::new());
        let llm = Arc::new(FakeLlm::with_responses(vec![]));
        let dispatcher = Dispatcher::new(
            github.clone(),
            llm,
            PromptConfig::built_in_default(),
            Limits::default(),
            "/x",
        );
        let app = build_router(AppState::new(Vec::new(), dispatcher));

        // No signature header at all
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-github-event", "star")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
